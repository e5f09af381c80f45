//! DevfileRegistriesList and ClusterDevfileRegistriesList CRDs
//!
//! Both kinds carry an ordered list of external devfile registries. The
//! namespaced kind scopes the list to one namespace, the cluster kind applies
//! cluster-wide. Their status is a single human-readable reachability summary.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One named registry endpoint in a registries list
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DevfileRegistryService {
    /// Unique-ish display name of the registry
    pub name: String,

    /// Registry URL (http or https)
    pub url: String,

    /// Skip TLS certificate verification when probing the registry
    #[serde(default, rename = "skipTLSVerify")]
    pub skip_tls_verify: bool,
}

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "registry.devfile.io",
    version = "v1alpha1",
    kind = "DevfileRegistriesList",
    namespaced,
    status = "DevfileRegistriesListStatus",
    shortname = "dtrl",
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DevfileRegistriesListSpec {
    /// Registries, in priority order
    #[serde(default)]
    pub devfile_registries: Vec<DevfileRegistryService>,
}

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "registry.devfile.io",
    version = "v1alpha1",
    kind = "ClusterDevfileRegistriesList",
    status = "DevfileRegistriesListStatus",
    shortname = "cdtrl",
    printcolumn = r#"{"name":"Status","type":"string","jsonPath":".status.status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDevfileRegistriesListSpec {
    /// Registries, in priority order
    #[serde(default)]
    pub devfile_registries: Vec<DevfileRegistryService>,
}

/// Status shared by both list kinds
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DevfileRegistriesListStatus {
    /// Aggregate reachability message
    #[serde(default)]
    pub status: String,
}

/// Read access shared by the namespaced and cluster-scoped list kinds
pub trait RegistriesList {
    /// Configured registries, in list order
    fn registries(&self) -> &[DevfileRegistryService];

    /// Currently persisted status message, if any
    fn status_message(&self) -> Option<&str>;
}

impl RegistriesList for DevfileRegistriesList {
    fn registries(&self) -> &[DevfileRegistryService] {
        &self.spec.devfile_registries
    }

    fn status_message(&self) -> Option<&str> {
        self.status.as_ref().map(|status| status.status.as_str())
    }
}

impl RegistriesList for ClusterDevfileRegistriesList {
    fn registries(&self) -> &[DevfileRegistryService] {
        &self.spec.devfile_registries
    }

    fn status_message(&self) -> Option<&str> {
        self.status.as_ref().map(|status| status.status.as_str())
    }
}
