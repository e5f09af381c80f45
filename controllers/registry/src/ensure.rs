//! Resource convergence
//!
//! `ensure` makes one child of a DevfileRegistry match its desired body:
//! missing objects are created, drifted objects are updated and matching
//! objects are left alone, so repeated calls with an unchanged registry write
//! nothing after the first convergent one.
//!
//! A successful create may end the reconcile pass. The watch cache backing
//! the controller lags behind the API server, and later steps (the Deployment
//! mounting the fresh PVC, the route host read-back) would observe the stale
//! cache. [`READ_AFTER_WRITE_REQUEUE`] names that eventual-consistency window.

use crate::error::ControllerError;
use crate::resources;
use crate::store::{ClusterStore, ManagedObject, ResourceKind};
use crds::DevfileRegistry;
use kube_runtime::controller::Action;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, info};

/// Delay before re-entering a pass that just created a child
pub const READ_AFTER_WRITE_REQUEUE: Duration = Duration::from_secs(1);

/// Whether creating a child of `kind` ends the current pass
///
/// Ingress and Route creation lets the pass continue: the pass reads the
/// route back itself and tolerates the miss.
pub fn requeue_after_create(kind: ResourceKind) -> bool {
    match kind {
        ResourceKind::Service
        | ResourceKind::PersistentVolumeClaim
        | ResourceKind::ConfigMap
        | ResourceKind::Deployment => true,
        ResourceKind::Ingress | ResourceKind::Route => false,
    }
}

/// What `converge` did to the live object
#[derive(Debug, Clone, PartialEq)]
pub enum Convergence {
    /// Object did not exist and was created
    Created(ManagedObject),
    /// Object existed with drifted fields and was updated
    Updated(ManagedObject),
    /// Object already matched
    Unchanged(ManagedObject),
}

impl Convergence {
    /// The object as last seen by the store
    pub fn object(&self) -> &ManagedObject {
        match self {
            Convergence::Created(o) | Convergence::Updated(o) | Convergence::Unchanged(o) => o,
        }
    }
}

/// Create, update or leave `desired` in `namespace`
///
/// NotFound on the read drives the create path. Every other store failure is
/// returned unchanged for the caller's error policy; nothing is retried here.
pub async fn converge(
    store: &dyn ClusterStore,
    namespace: &str,
    desired: &ManagedObject,
) -> Result<Convergence, ControllerError> {
    let kind = desired.kind();
    let name = desired.name();

    match store.get(kind, namespace, name).await {
        Ok(mut live) => {
            if !resources::merge_into(&mut live, desired)? {
                debug!("{} {}/{} already up-to-date", kind, namespace, name);
                return Ok(Convergence::Unchanged(live));
            }
            info!("{} {}/{} drifted from desired state, updating", kind, namespace, name);
            match store.update(namespace, &live).await {
                Ok(updated) => Ok(Convergence::Updated(updated)),
                Err(e) => {
                    error!("Failed to update {} {}/{}: {}", kind, namespace, name, e);
                    Err(e.into())
                }
            }
        }
        Err(e) if e.is_not_found() => {
            info!("Creating {} {}/{}", kind, namespace, name);
            match store.create(namespace, desired).await {
                Ok(created) => Ok(Convergence::Created(created)),
                Err(e) => {
                    error!("Failed to create {} {}/{}: {}", kind, namespace, name, e);
                    Err(e.into())
                }
            }
        }
        Err(e) => {
            error!("Failed to get {} {}/{}: {}", kind, namespace, name, e);
            Err(e.into())
        }
    }
}

/// Converge the `kind` child of `registry`
///
/// Returns `Some(action)` when the pass has to stop here and be re-entered,
/// `None` when the caller may go on to the next kind.
pub async fn ensure(
    store: &dyn ClusterStore,
    registry: &DevfileRegistry,
    kind: ResourceKind,
    labels: &BTreeMap<String, String>,
    hostname: &str,
) -> Result<Option<Action>, ControllerError> {
    let (_, namespace) = resources::registry_key(registry)?;
    let desired = resources::build(kind, registry, labels, hostname)?;

    let convergence = converge(store, namespace, &desired).await?;
    match &convergence {
        Convergence::Created(_) if requeue_after_create(kind) => {
            debug!(
                "{} {}/{} created (resourceVersion {:?}), requeueing in {:?}",
                kind,
                namespace,
                convergence.object().name(),
                convergence.object().metadata().resource_version,
                READ_AFTER_WRITE_REQUEUE
            );
            Ok(Some(Action::requeue(READ_AFTER_WRITE_REQUEUE)))
        }
        _ => Ok(None),
    }
}
