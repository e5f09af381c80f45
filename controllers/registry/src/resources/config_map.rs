//! Registry ConfigMap
//!
//! Holds the OCI registry configuration and the URL the registry was last
//! reached at, so in-cluster consumers can discover it.

use super::OCI_PORT;
use crate::error::ControllerError;
use crds::DevfileRegistry;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::Serialize;
use std::collections::BTreeMap;

/// Key of the OCI registry configuration file
pub const REGISTRY_CONFIG_KEY: &str = "registry-config.yml";
/// Key holding the registry's external URL
pub const REGISTRY_URL_KEY: &str = "registry-url";

/// OCI registry (distribution) configuration document
#[derive(Debug, Serialize)]
struct OciRegistryConfig {
    version: &'static str,
    log: LogConfig,
    storage: StorageConfig,
    http: HttpConfig,
    health: HealthConfig,
}

#[derive(Debug, Serialize)]
struct LogConfig {
    fields: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Serialize)]
struct StorageConfig {
    cache: BTreeMap<&'static str, &'static str>,
    filesystem: BTreeMap<&'static str, &'static str>,
}

#[derive(Debug, Serialize)]
struct HttpConfig {
    addr: String,
    headers: BTreeMap<&'static str, Vec<&'static str>>,
}

#[derive(Debug, Serialize)]
struct HealthConfig {
    storagedriver: StorageDriverHealth,
}

#[derive(Debug, Serialize)]
struct StorageDriverHealth {
    enabled: bool,
    interval: &'static str,
    threshold: u32,
}

impl Default for OciRegistryConfig {
    fn default() -> Self {
        Self {
            version: "0.1",
            log: LogConfig {
                fields: BTreeMap::from([("service", "registry")]),
            },
            storage: StorageConfig {
                cache: BTreeMap::from([("blobdescriptor", "inmemory")]),
                filesystem: BTreeMap::from([("rootdirectory", "/var/lib/registry")]),
            },
            http: HttpConfig {
                addr: format!(":{OCI_PORT}"),
                headers: BTreeMap::from([("X-Content-Type-Options", vec!["nosniff"])]),
            },
            health: HealthConfig {
                storagedriver: StorageDriverHealth {
                    enabled: true,
                    interval: "10s",
                    threshold: 3,
                },
            },
        }
    }
}

pub(super) fn build(meta: ObjectMeta, registry: &DevfileRegistry) -> Result<ConfigMap, ControllerError> {
    let registry_config = serde_yaml::to_string(&OciRegistryConfig::default())?;
    Ok(ConfigMap {
        metadata: meta,
        data: Some(BTreeMap::from([
            (REGISTRY_CONFIG_KEY.to_string(), registry_config),
            (REGISTRY_URL_KEY.to_string(), registry.status_url().to_string()),
        ])),
        ..Default::default()
    })
}

pub(super) fn merge(live: &mut ConfigMap, desired: &ConfigMap) -> bool {
    if live.data == desired.data {
        return false;
    }
    live.data = desired.data.clone();
    true
}
