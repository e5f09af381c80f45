//! DevfileRegistry CRD
//!
//! Declares a single in-cluster devfile registry: the index server, its OCI
//! registry sidecar, optional persistent storage and how it is exposed.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default image for the devfile index server container
pub const DEFAULT_INDEX_IMAGE: &str = "quay.io/devfile/devfile-index:next";

/// Default image for the OCI registry sidecar container
pub const DEFAULT_OCI_REGISTRY_IMAGE: &str = "quay.io/devfile/oci-registry:next";

/// Default memory limit applied to both registry containers
pub const DEFAULT_MEMORY_LIMIT: &str = "256Mi";

/// Default size of the registry volume when storage is enabled
pub const DEFAULT_VOLUME_SIZE: &str = "1Gi";

/// Default image pull policy for both registry containers
pub const DEFAULT_PULL_POLICY: &str = "Always";

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "registry.devfile.io",
    version = "v1alpha1",
    kind = "DevfileRegistry",
    namespaced,
    status = "DevfileRegistryStatus",
    shortname = "devreg",
    printcolumn = r#"{"name":"URL","type":"string","jsonPath":".status.url"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DevfileRegistrySpec {
    /// Devfile index server container overrides
    #[serde(default)]
    pub devfile_index: ContainerOverrides,

    /// OCI registry sidecar container overrides
    #[serde(default)]
    pub oci_registry: ContainerOverrides,

    /// Persistent storage for the OCI registry
    #[serde(default)]
    pub storage: StorageConfig,

    /// TLS settings for the exposed endpoint
    #[serde(default)]
    pub tls: TlsConfig,

    /// Kubernetes (non-route) exposure settings
    #[serde(default)]
    pub k8s: KubernetesConfig,

    /// Telemetry settings forwarded to the index server
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerOverrides {
    /// Container image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Image pull policy (Always, IfNotPresent, Never)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_policy: Option<String>,

    /// Memory limit (e.g. "256Mi")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /// Whether the OCI registry is backed by a PersistentVolumeClaim (default false)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Requested volume size (default 1Gi)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_volume_size: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    /// Whether the registry is served over https (default true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,

    /// Secret holding the certificate used by the Ingress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesConfig {
    /// Ingress domain. When set, an Ingress is used even on clusters serving routes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_domain: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryConfig {
    /// Name reported by the registry in telemetry events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_name: Option<String>,

    /// Telemetry write key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DevfileRegistryStatus {
    /// Externally reachable URL of the registry, once it has answered a probe
    #[serde(default)]
    pub url: String,
}

impl DevfileRegistry {
    /// Whether persistent storage is requested
    pub fn storage_enabled(&self) -> bool {
        self.spec.storage.enabled.unwrap_or(false)
    }

    /// Whether the registry is exposed over https
    pub fn tls_enabled(&self) -> bool {
        self.spec.tls.enabled.unwrap_or(true)
    }

    /// Ingress domain override, ignoring empty strings
    pub fn ingress_domain(&self) -> Option<&str> {
        self.spec
            .k8s
            .ingress_domain
            .as_deref()
            .filter(|domain| !domain.is_empty())
    }

    /// Requested registry volume size
    pub fn volume_size(&self) -> &str {
        self.spec
            .storage
            .registry_volume_size
            .as_deref()
            .unwrap_or(DEFAULT_VOLUME_SIZE)
    }

    /// Last persisted registry URL, empty when none was recorded yet
    pub fn status_url(&self) -> &str {
        self.status.as_ref().map_or("", |status| status.url.as_str())
    }
}

impl ContainerOverrides {
    /// Image, falling back to `default`
    pub fn image_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.image.as_deref().unwrap_or(default)
    }

    /// Pull policy, falling back to [`DEFAULT_PULL_POLICY`]
    pub fn pull_policy(&self) -> &str {
        self.image_pull_policy.as_deref().unwrap_or(DEFAULT_PULL_POLICY)
    }

    /// Memory limit, falling back to [`DEFAULT_MEMORY_LIMIT`]
    pub fn memory_limit(&self) -> &str {
        self.memory_limit.as_deref().unwrap_or(DEFAULT_MEMORY_LIMIT)
    }
}
