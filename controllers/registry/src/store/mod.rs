//! Cluster store abstraction
//!
//! The convergence engine and both reconcilers talk to the cluster through the
//! [`ClusterStore`] trait: get/create/update/delete for the managed child kinds,
//! keyed by (namespace, name), plus status writes for the top-level kinds.
//! [`KubeStore`] implements it against the API server; tests use the in-memory
//! `MockClusterStore`.

mod kube_store;
#[cfg(test)]
pub mod mock;

pub use kube_store::KubeStore;

use crds::{DevfileRegistryStatus, Route};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::fmt;
use thiserror::Error;

/// Child resource kinds managed for each DevfileRegistry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// core/v1 Service
    Service,
    /// core/v1 PersistentVolumeClaim
    PersistentVolumeClaim,
    /// core/v1 ConfigMap
    ConfigMap,
    /// apps/v1 Deployment
    Deployment,
    /// networking.k8s.io/v1 Ingress
    Ingress,
    /// route.openshift.io/v1 Route
    Route,
}

impl ResourceKind {
    /// Kind name as the API server spells it
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Service => "Service",
            ResourceKind::PersistentVolumeClaim => "PersistentVolumeClaim",
            ResourceKind::ConfigMap => "ConfigMap",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Ingress => "Ingress",
            ResourceKind::Route => "Route",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live or desired child resource
#[derive(Debug, Clone, PartialEq)]
pub enum ManagedObject {
    /// Service
    Service(Service),
    /// PersistentVolumeClaim
    PersistentVolumeClaim(PersistentVolumeClaim),
    /// ConfigMap
    ConfigMap(ConfigMap),
    /// Deployment
    Deployment(Deployment),
    /// Ingress
    Ingress(Ingress),
    /// Route
    Route(Route),
}

impl ManagedObject {
    /// Kind of the wrapped resource
    pub fn kind(&self) -> ResourceKind {
        match self {
            ManagedObject::Service(_) => ResourceKind::Service,
            ManagedObject::PersistentVolumeClaim(_) => ResourceKind::PersistentVolumeClaim,
            ManagedObject::ConfigMap(_) => ResourceKind::ConfigMap,
            ManagedObject::Deployment(_) => ResourceKind::Deployment,
            ManagedObject::Ingress(_) => ResourceKind::Ingress,
            ManagedObject::Route(_) => ResourceKind::Route,
        }
    }

    /// Object metadata
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            ManagedObject::Service(o) => &o.metadata,
            ManagedObject::PersistentVolumeClaim(o) => &o.metadata,
            ManagedObject::ConfigMap(o) => &o.metadata,
            ManagedObject::Deployment(o) => &o.metadata,
            ManagedObject::Ingress(o) => &o.metadata,
            ManagedObject::Route(o) => &o.metadata,
        }
    }

    /// Mutable object metadata
    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            ManagedObject::Service(o) => &mut o.metadata,
            ManagedObject::PersistentVolumeClaim(o) => &mut o.metadata,
            ManagedObject::ConfigMap(o) => &mut o.metadata,
            ManagedObject::Deployment(o) => &mut o.metadata,
            ManagedObject::Ingress(o) => &mut o.metadata,
            ManagedObject::Route(o) => &mut o.metadata,
        }
    }

    /// Object name, empty if unset
    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }
}

/// Identifies which registries-list object a status write targets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListTarget {
    /// A namespaced DevfileRegistriesList
    Namespaced {
        /// Namespace of the list
        namespace: String,
        /// Name of the list
        name: String,
    },
    /// A cluster-scoped ClusterDevfileRegistriesList
    Cluster {
        /// Name of the list
        name: String,
    },
}

impl fmt::Display for ListTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListTarget::Namespaced { namespace, name } => {
                write!(f, "DevfileRegistriesList {namespace}/{name}")
            }
            ListTarget::Cluster { name } => write!(f, "ClusterDevfileRegistriesList {name}"),
        }
    }
}

/// Errors returned by a cluster store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Object does not exist (expected: drives the create path)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency collision or already-exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// API server unavailable or request failed in transit
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Any other Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[source] kube::Error),
}

impl StoreError {
    /// Whether this is the expected "object does not exist" case
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<kube::Error> for StoreError {
    fn from(err: kube::Error) -> Self {
        let code = match &err {
            kube::Error::Api(response) => Some(response.code),
            _ => None,
        };
        match code {
            Some(404) => StoreError::NotFound(err.to_string()),
            Some(409) => StoreError::Conflict(err.to_string()),
            Some(_) => StoreError::Kube(err),
            None => StoreError::Unavailable(err.to_string()),
        }
    }
}

/// Cluster operations used by the reconcilers
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ClusterStore: Send + Sync {
    /// Fetch a child resource
    async fn get(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<ManagedObject, StoreError>;

    /// Create a child resource
    async fn create(&self, namespace: &str, object: &ManagedObject) -> Result<ManagedObject, StoreError>;

    /// Replace a child resource (the object's resourceVersion guards against lost updates)
    async fn update(&self, namespace: &str, object: &ManagedObject) -> Result<ManagedObject, StoreError>;

    /// Delete a child resource
    async fn delete(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<(), StoreError>;

    /// Write the status of a DevfileRegistry
    async fn patch_registry_status(
        &self,
        namespace: &str,
        name: &str,
        status: &DevfileRegistryStatus,
    ) -> Result<(), StoreError>;

    /// Write the status message of a registries list
    async fn patch_list_status(&self, target: &ListTarget, status: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControllerError;
    use kube::error::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("request failed with {code}"),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn test_missing_object_drives_create_path() {
        let err = StoreError::from(api_error(404, "NotFound"));
        assert!(matches!(err, StoreError::NotFound(_)));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_conflict_is_retried() {
        let err = StoreError::from(api_error(409, "Conflict"));
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(!err.is_not_found());
        assert!(ControllerError::from(err).is_transient());
    }

    #[test]
    fn test_other_api_codes_keep_the_kube_error() {
        for code in [400, 403, 422, 500] {
            let err = StoreError::from(api_error(code, "Failure"));
            assert!(
                matches!(&err, StoreError::Kube(kube::Error::Api(response)) if response.code == code),
                "{code} mapped to {err:?}"
            );
            assert!(!err.is_not_found());
        }
    }

    #[test]
    fn test_transport_failures_are_unavailable() {
        let err = StoreError::from(kube::Error::Service("connection reset by peer".into()));
        assert!(matches!(err, StoreError::Unavailable(ref reason) if reason.contains("connection reset")));
        assert!(!err.is_not_found());
    }
}
