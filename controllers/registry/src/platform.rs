//! Cluster platform detection
//!
//! Route support is decided once at start-up: either forced through
//! `ROUTE_SUPPORT` or detected from the API groups the server advertises.

use crate::error::ControllerError;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIGroupList;
use kube::Client;
use tracing::info;

/// API group serving OpenShift routes
pub const ROUTE_API_GROUP: &str = "route.openshift.io";

/// Whether `groups` advertises the route API group
pub fn serves_routes(groups: &APIGroupList) -> bool {
    groups.groups.iter().any(|group| group.name == ROUTE_API_GROUP)
}

/// Decide whether registries are exposed through routes
///
/// An explicit override skips discovery entirely.
pub async fn detect_route_support(client: &Client, override_value: Option<bool>) -> Result<bool, ControllerError> {
    if let Some(forced) = override_value {
        info!("Route support forced to {} by ROUTE_SUPPORT", forced);
        return Ok(forced);
    }

    let groups = client.list_api_groups().await?;
    let supported = serves_routes(&groups);
    info!(
        "Route support {} ({} API group {})",
        if supported { "enabled" } else { "disabled" },
        ROUTE_API_GROUP,
        if supported { "found" } else { "not found" }
    );
    Ok(supported)
}
