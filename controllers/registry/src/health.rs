//! Health probe endpoints
//!
//! `/healthz` answers as soon as the process serves HTTP. `/readyz` answers
//! once every controller has been started.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

/// Readiness flag shared between the controller and the probe server
#[derive(Debug, Clone, Default)]
pub struct Readiness(Arc<AtomicBool>);

impl Readiness {
    /// Mark the controller ready
    pub fn set_ready(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether the controller is ready
    pub fn is_ready(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Build the probe router
pub fn health_routes(readiness: Readiness) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(readyz))
        .with_state(readiness)
}

async fn readyz(State(readiness): State<Readiness>) -> (StatusCode, &'static str) {
    if readiness.is_ready() {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "starting")
    }
}

/// Serve the probe endpoints on `addr` until the process exits
pub async fn serve(addr: SocketAddr, readiness: Readiness) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            info!("Health probes listening on {}", addr);
            listener
        }
        Err(e) => {
            error!("Failed to bind health probe address {}: {}", addr, e);
            return;
        }
    };
    if let Err(e) = axum::serve(listener, health_routes(readiness)).await {
        error!("Health probe server error: {}", e);
    }
}
