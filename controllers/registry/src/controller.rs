//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the cluster store,
//! the prober and the reconciler together and runs one watcher per CRD:
//! - DevfileRegistry: deploys a registry and publishes its URL
//! - DevfileRegistriesList: reports reachability of a namespace's registries
//! - ClusterDevfileRegistriesList: same, cluster wide

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::health::{self, Readiness};
use crate::platform;
use crate::reconciler::Reconciler;
use crate::store::KubeStore;
use crate::watcher::Watcher;
use kube::Client;
use registry_probe::HttpProber;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// Main controller for devfile registry management.
#[derive(Debug)]
pub struct Controller {
    devfile_registry_watcher: JoinHandle<Result<(), ControllerError>>,
    registries_list_watcher: JoinHandle<Result<(), ControllerError>>,
    cluster_registries_list_watcher: JoinHandle<Result<(), ControllerError>>,
    health_server: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller instance and starts its watchers.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing Devfile Registry Controller");

        let readiness = Readiness::default();
        let health_server = tokio::spawn(health::serve(config.health_addr, readiness.clone()));

        let kube_client = Client::try_default().await?;
        let route_support = platform::detect_route_support(&kube_client, config.route_support).await?;
        let prober = HttpProber::new()?;

        let namespace = config.namespace.clone();
        let reconciler = Arc::new(Reconciler::new(
            KubeStore::new(kube_client.clone()),
            prober,
            route_support,
            config,
        ));
        let watcher_instance = Arc::new(Watcher::new(reconciler, kube_client, namespace));

        let devfile_registry_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_devfile_registries().await })
        };

        let registries_list_watcher = {
            let watcher = watcher_instance.clone();
            tokio::spawn(async move { watcher.watch_registries_lists().await })
        };

        let cluster_registries_list_watcher = {
            let watcher = watcher_instance;
            tokio::spawn(async move { watcher.watch_cluster_registries_lists().await })
        };

        readiness.set_ready();

        Ok(Self {
            devfile_registry_watcher,
            registries_list_watcher,
            cluster_registries_list_watcher,
            health_server,
        })
    }

    /// Runs the controller until shutdown.
    ///
    /// Watchers stop on SIGINT/SIGTERM; the first one to exit ends the run.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("Devfile Registry Controller running");

        let result = tokio::select! {
            result = &mut self.devfile_registry_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("DevfileRegistry watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("DevfileRegistry watcher error: {}", e)))
            }
            result = &mut self.registries_list_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("DevfileRegistriesList watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("DevfileRegistriesList watcher error: {}", e)))
            }
            result = &mut self.cluster_registries_list_watcher => {
                result.map_err(|e| ControllerError::Watch(format!("ClusterDevfileRegistriesList watcher panicked: {}", e)))?
                    .map_err(|e| ControllerError::Watch(format!("ClusterDevfileRegistriesList watcher error: {}", e)))
            }
        };

        self.health_server.abort();
        info!("Devfile Registry Controller stopped");
        result
    }
}
