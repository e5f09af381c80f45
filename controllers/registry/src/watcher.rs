//! Kubernetes resource watchers.
//!
//! Each watched kind gets its own `kube_runtime::Controller`, which handles
//! reconnection, per-object queueing and requeue scheduling. A DevfileRegistry
//! is also re-queued whenever one of the children it owns changes.

use crate::error::ControllerError;
use crate::reconciler::{Reconciler, devfile_registry, error_policy, registries_list};
use crds::{ClusterDevfileRegistriesList, DevfileRegistriesList, DevfileRegistry, Route};
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Service};
use k8s_openapi::api::networking::v1::Ingress;
use kube::{Api, Client, Resource};
use kube_runtime::controller::Action;
use kube_runtime::reflector::ObjectRef;
use kube_runtime::watcher::Config as WatcherConfig;
use kube_runtime::{Controller, controller};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::future::Ready;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Watch timeout (seconds), kept below the client's 30s read timeout so idle
/// watches are closed by the API server first
const WATCH_TIMEOUT_SECS: u32 = 25;

fn watcher_config() -> WatcherConfig {
    WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS)
}

/// Log the outcome of every reconcile the controller runs
fn log_result<K>(
    kind: &'static str,
) -> impl Fn(Result<(ObjectRef<K>, Action), controller::Error<ControllerError, kube_runtime::watcher::Error>>) -> Ready<()>
where
    K: Resource,
{
    move |result| {
        match result {
            Ok((object, action)) => debug!("{} {} reconciled: {:?}", kind, object, action),
            Err(e) => error!("{} controller error: {}", kind, e),
        }
        std::future::ready(())
    }
}

/// Starts one controller per watched kind
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    client: Client,
    /// Namespace the namespaced kinds are watched in, `None` for all
    namespace: Option<String>,
}

impl Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("namespace", &self.namespace)
            .field("route_support", &self.reconciler.route_support)
            .finish_non_exhaustive()
    }
}

impl Watcher {
    /// Creates a new watcher instance.
    pub fn new(reconciler: Arc<Reconciler>, client: Client, namespace: Option<String>) -> Self {
        Self {
            reconciler,
            client,
            namespace,
        }
    }

    /// Api for a namespaced kind, scoped to the watched namespace if any
    fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()> + Clone + DeserializeOwned + Debug,
    {
        match &self.namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        }
    }

    /// Watch DevfileRegistries and the children they own
    pub async fn watch_devfile_registries(&self) -> Result<(), ControllerError> {
        info!("Starting DevfileRegistry watcher");

        let mut controller = Controller::new(self.api::<DevfileRegistry>(), watcher_config())
            .owns(self.api::<Service>(), watcher_config())
            .owns(self.api::<PersistentVolumeClaim>(), watcher_config())
            .owns(self.api::<ConfigMap>(), watcher_config())
            .owns(self.api::<Deployment>(), watcher_config())
            .owns(self.api::<Ingress>(), watcher_config());
        if self.reconciler.route_support {
            controller = controller.owns(self.api::<Route>(), watcher_config());
        }

        controller
            .shutdown_on_signal()
            .run(
                devfile_registry::reconcile,
                error_policy::<DevfileRegistry>,
                self.reconciler.clone(),
            )
            .for_each(log_result("DevfileRegistry"))
            .await;

        info!("DevfileRegistry watcher stopped");
        Ok(())
    }

    /// Watch DevfileRegistriesLists
    pub async fn watch_registries_lists(&self) -> Result<(), ControllerError> {
        info!("Starting DevfileRegistriesList watcher");

        Controller::new(self.api::<DevfileRegistriesList>(), watcher_config())
            .shutdown_on_signal()
            .run(
                registries_list::reconcile_namespaced,
                error_policy::<DevfileRegistriesList>,
                self.reconciler.clone(),
            )
            .for_each(log_result("DevfileRegistriesList"))
            .await;

        info!("DevfileRegistriesList watcher stopped");
        Ok(())
    }

    /// Watch ClusterDevfileRegistriesLists, which are cluster scoped
    pub async fn watch_cluster_registries_lists(&self) -> Result<(), ControllerError> {
        info!("Starting ClusterDevfileRegistriesList watcher");

        let api: Api<ClusterDevfileRegistriesList> = Api::all(self.client.clone());
        Controller::new(api, watcher_config())
            .shutdown_on_signal()
            .run(
                registries_list::reconcile_cluster,
                error_policy::<ClusterDevfileRegistriesList>,
                self.reconciler.clone(),
            )
            .for_each(log_result("ClusterDevfileRegistriesList"))
            .await;

        info!("ClusterDevfileRegistriesList watcher stopped");
        Ok(())
    }
}
