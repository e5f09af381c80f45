//! Devfile Registry Controller
//!
//! Unified controller for the devfile registry CRDs:
//! - DevfileRegistry: deploys a registry (Service, storage, config,
//!   Deployment and an Ingress or Route) and publishes its URL once it answers
//! - DevfileRegistriesList / ClusterDevfileRegistriesList: probe the listed
//!   registries and report their reachability in the status

mod backoff;
mod config;
mod controller;
mod ensure;
mod error;
mod health;
mod platform;
mod reconciler;
mod resources;
mod store;
mod watcher;

#[cfg(test)]
mod test_utils;

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use controller::Controller;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| ControllerError::InvalidConfig("failed to install the rustls crypto provider".to_string()))?;

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting Devfile Registry Controller");

    let config = ControllerConfig::from_env()?;
    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!(
        "  Route support: {}",
        config.route_support.map_or("detect".to_string(), |forced| forced.to_string())
    );
    info!("  List probe timeout: {:?}", config.list_probe_timeout);
    info!("  Server probe timeout: {:?}", config.server_probe_timeout);
    info!(
        "  Default ingress domain: {}",
        config.default_ingress_domain.as_deref().unwrap_or("none")
    );
    info!("  Health probes: {}", config.health_addr);

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
