//! Registries list reconciliation
//!
//! DevfileRegistriesList and ClusterDevfileRegistriesList share one pass:
//! probe each entry in order and reduce the results to a single status
//! string. An unreachable entry is reported in the status, never as a
//! reconcile error. Only the first unreachable entry is named.

use super::{Reconciler, track_result};
use crate::error::ControllerError;
use crate::store::ListTarget;
use crds::{ClusterDevfileRegistriesList, DevfileRegistriesList, DevfileRegistryService, RegistriesList};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use registry_probe::Prober;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Status of a list without entries
pub const NO_REGISTRIES: &str = "no registries configured";
/// Status of a list whose entries all answered
pub const ALL_REACHABLE: &str = "all registries reachable";

/// Status naming an unreachable registry
pub fn unreachable_message(url: &str) -> String {
    format!("registry at {url} is unreachable")
}

/// Probe `registries` in order and summarise the outcome
///
/// Malformed URLs count as unreachable: the status is the only place the
/// owner of the list will see them.
pub async fn summarize(prober: &dyn Prober, registries: &[DevfileRegistryService], timeout: Duration) -> String {
    if registries.is_empty() {
        return NO_REGISTRIES.to_string();
    }

    let mut first_failure = None;
    for registry in registries {
        match prober.probe(&registry.url, timeout, !registry.skip_tls_verify).await {
            Ok(()) => debug!("Registry {} at {} is reachable", registry.name, registry.url),
            Err(e) => {
                warn!("Registry {} at {} is unreachable: {}", registry.name, registry.url, e);
                if first_failure.is_none() {
                    first_failure = Some(registry.url.as_str());
                }
            }
        }
    }

    match first_failure {
        Some(url) => unreachable_message(url),
        None => ALL_REACHABLE.to_string(),
    }
}

impl Reconciler {
    /// Run one reconcile pass over a registries list
    pub async fn reconcile_registries_list<L>(&self, target: &ListTarget, list: &L) -> Result<Action, ControllerError>
    where
        L: RegistriesList + Sync,
    {
        let status = summarize(self.prober.as_ref(), list.registries(), self.config.list_probe_timeout).await;

        if list.status_message() == Some(status.as_str()) {
            debug!("{} status unchanged: {}", target, status);
            return Ok(Action::await_change());
        }

        match self.store.patch_list_status(target, &status).await {
            Ok(()) => info!("{} status: {}", target, status),
            Err(e) if e.is_not_found() => {
                info!("{} no longer exists, skipping status update", target);
            }
            Err(e) => return Err(e.into()),
        }
        Ok(Action::await_change())
    }
}

/// Controller entry point for DevfileRegistriesList
#[instrument(skip(list, ctx), fields(list = %list.name_any(), namespace = ?list.namespace()))]
pub async fn reconcile_namespaced(
    list: Arc<DevfileRegistriesList>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ControllerError> {
    let namespace = list
        .namespace()
        .ok_or(ControllerError::MissingObjectKey("namespace"))?;
    let target = ListTarget::Namespaced {
        namespace,
        name: list.name_any(),
    };
    let result = ctx.reconcile_registries_list(&target, list.as_ref()).await;
    track_result(&ctx, list.as_ref(), result)
}

/// Controller entry point for ClusterDevfileRegistriesList
#[instrument(skip(list, ctx), fields(list = %list.name_any()))]
pub async fn reconcile_cluster(
    list: Arc<ClusterDevfileRegistriesList>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ControllerError> {
    let target = ListTarget::Cluster { name: list.name_any() };
    let result = ctx.reconcile_registries_list(&target, list.as_ref()).await;
    track_result(&ctx, list.as_ref(), result)
}
