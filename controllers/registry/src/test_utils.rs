//! Test utilities for unit testing reconcilers
//!
//! This module provides helpers for creating test CRDs and a reconciler wired
//! to the in-memory store and prober.

use crate::config::ControllerConfig;
use crate::reconciler::Reconciler;
use crate::store::mock::MockClusterStore;
use crds::*;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use registry_probe::MockProber;

/// Helper to create a test DevfileRegistry with a uid, so children can be owned
pub fn create_test_registry(name: &str, namespace: &str) -> DevfileRegistry {
    DevfileRegistry {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some(format!("uid-{namespace}-{name}")),
            ..Default::default()
        },
        spec: DevfileRegistrySpec::default(),
        status: None,
    }
}

/// Helper to create a registries list entry
pub fn create_test_entry(name: &str, url: &str) -> DevfileRegistryService {
    DevfileRegistryService {
        name: name.to_string(),
        url: url.to_string(),
        skip_tls_verify: false,
    }
}

/// Helper to create a test DevfileRegistriesList
pub fn create_test_registries_list(
    name: &str,
    namespace: &str,
    entries: Vec<DevfileRegistryService>,
) -> DevfileRegistriesList {
    DevfileRegistriesList {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: DevfileRegistriesListSpec {
            devfile_registries: entries,
        },
        status: None,
    }
}

/// Helper to create a test ClusterDevfileRegistriesList
pub fn create_test_cluster_registries_list(
    name: &str,
    entries: Vec<DevfileRegistryService>,
) -> ClusterDevfileRegistriesList {
    ClusterDevfileRegistriesList::new(
        name,
        ClusterDevfileRegistriesListSpec {
            devfile_registries: entries,
        },
    )
}

/// Reconciler on a vanilla Kubernetes cluster (no routes)
///
/// Returns handles to the mock store and prober, which share state with the
/// reconciler's copies.
pub fn create_test_reconciler() -> (Reconciler, MockClusterStore, MockProber) {
    create_test_reconciler_with(MockClusterStore::new(), false)
}

/// Reconciler using `store`, optionally on a cluster that serves routes
pub fn create_test_reconciler_with(
    store: MockClusterStore,
    route_support: bool,
) -> (Reconciler, MockClusterStore, MockProber) {
    let prober = MockProber::new();
    let reconciler = Reconciler::new(
        store.clone(),
        prober.clone(),
        route_support,
        ControllerConfig {
            default_ingress_domain: Some("apps.example.com".to_string()),
            ..ControllerConfig::default()
        },
    );
    (reconciler, store, prober)
}
