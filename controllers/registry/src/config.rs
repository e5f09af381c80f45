//! Controller configuration
//!
//! Loaded once at start-up from environment variables.

use crate::error::ControllerError;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Default timeout for probing registries-list entries
pub const DEFAULT_LIST_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Default timeout for probing a freshly deployed registry server
pub const DEFAULT_SERVER_PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bind address for the health endpoints
pub const DEFAULT_HEALTH_ADDR: &str = "0.0.0.0:8081";

/// Runtime configuration of the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Namespace to watch for namespaced kinds, `None` for all namespaces
    pub namespace: Option<String>,
    /// Explicit route-support override; `None` means detect from the API server
    pub route_support: Option<bool>,
    /// Timeout for each registries-list entry probe
    pub list_probe_timeout: Duration,
    /// Timeout for the registry server probe before adopting a new URL
    pub server_probe_timeout: Duration,
    /// Ingress domain used when a registry does not set one
    pub default_ingress_domain: Option<String>,
    /// Bind address for `/healthz` and `/readyz`
    pub health_addr: SocketAddr,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            route_support: None,
            list_probe_timeout: DEFAULT_LIST_PROBE_TIMEOUT,
            server_probe_timeout: DEFAULT_SERVER_PROBE_TIMEOUT,
            default_ingress_domain: None,
            health_addr: SocketAddr::from(([0, 0, 0, 0], 8081)),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let route_support = non_empty("ROUTE_SUPPORT")
            .map(|value| parse_bool("ROUTE_SUPPORT", &value))
            .transpose()?;

        let list_probe_timeout = non_empty("REGISTRY_PROBE_TIMEOUT_SECS")
            .map(|value| parse_secs("REGISTRY_PROBE_TIMEOUT_SECS", &value))
            .transpose()?
            .unwrap_or(DEFAULT_LIST_PROBE_TIMEOUT);

        let server_probe_timeout = non_empty("REGISTRY_SERVER_PROBE_TIMEOUT_SECS")
            .map(|value| parse_secs("REGISTRY_SERVER_PROBE_TIMEOUT_SECS", &value))
            .transpose()?
            .unwrap_or(DEFAULT_SERVER_PROBE_TIMEOUT);

        let health_addr = non_empty("HEALTH_PROBE_ADDR")
            .unwrap_or_else(|| DEFAULT_HEALTH_ADDR.to_string());
        let health_addr = health_addr.parse::<SocketAddr>().map_err(|e| {
            ControllerError::InvalidConfig(format!("HEALTH_PROBE_ADDR {health_addr:?}: {e}"))
        })?;

        Ok(Self {
            namespace: non_empty("WATCH_NAMESPACE"),
            route_support,
            list_probe_timeout,
            server_probe_timeout,
            default_ingress_domain: non_empty("DEFAULT_INGRESS_DOMAIN"),
            health_addr,
        })
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ControllerError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ControllerError::InvalidConfig(format!(
            "{key} must be true or false, got {other:?}"
        ))),
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration, ControllerError> {
    let secs = value.trim().parse::<u64>().map_err(|e| {
        ControllerError::InvalidConfig(format!("{key} must be a number of seconds, got {value:?}: {e}"))
    })?;
    if secs == 0 {
        return Err(ControllerError::InvalidConfig(format!(
            "{key} must be greater than zero"
        )));
    }
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = ControllerConfig::from_lookup(lookup(&[])).expect("defaults are valid");
        assert_eq!(config, ControllerConfig::default());
    }

    #[test]
    fn test_reads_every_variable() {
        let config = ControllerConfig::from_lookup(lookup(&[
            ("WATCH_NAMESPACE", "registries"),
            ("ROUTE_SUPPORT", "TRUE"),
            ("REGISTRY_PROBE_TIMEOUT_SECS", "3"),
            ("REGISTRY_SERVER_PROBE_TIMEOUT_SECS", "45"),
            ("DEFAULT_INGRESS_DOMAIN", "apps.example.com"),
            ("HEALTH_PROBE_ADDR", "127.0.0.1:9000"),
        ]))
        .expect("config is valid");

        assert_eq!(config.namespace.as_deref(), Some("registries"));
        assert_eq!(config.route_support, Some(true));
        assert_eq!(config.list_probe_timeout, Duration::from_secs(3));
        assert_eq!(config.server_probe_timeout, Duration::from_secs(45));
        assert_eq!(config.default_ingress_domain.as_deref(), Some("apps.example.com"));
        assert_eq!(config.health_addr, "127.0.0.1:9000".parse().expect("addr"));
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() {
        let config = ControllerConfig::from_lookup(lookup(&[
            ("WATCH_NAMESPACE", ""),
            ("ROUTE_SUPPORT", "  "),
        ]))
        .expect("config is valid");
        assert_eq!(config.namespace, None);
        assert_eq!(config.route_support, None);
    }

    #[test]
    fn test_rejects_malformed_values() {
        for pairs in [
            [("ROUTE_SUPPORT", "maybe")],
            [("REGISTRY_PROBE_TIMEOUT_SECS", "ten")],
            [("REGISTRY_SERVER_PROBE_TIMEOUT_SECS", "0")],
            [("HEALTH_PROBE_ADDR", "localhost")],
        ] {
            let result = ControllerConfig::from_lookup(lookup(&pairs));
            assert!(
                matches!(result, Err(ControllerError::InvalidConfig(_))),
                "{pairs:?} should be rejected"
            );
        }
    }
}
