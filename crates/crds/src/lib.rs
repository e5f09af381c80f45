//! Devfile Registry CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the devfile registry operator,
//! plus a typed view of the OpenShift `Route` resource the operator manages
//! on clusters that serve it.

pub mod devfile_registry;
pub mod registries_list;
pub mod route;

pub use devfile_registry::*;
pub use registries_list::*;
pub use route::*;
