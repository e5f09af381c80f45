//! Registry Deployment
//!
//! One pod with two containers: the devfile index server and the OCI
//! registry that stores the stack artifacts. The OCI registry's storage is
//! either the registry's PersistentVolumeClaim or an emptyDir.

use super::config_map::REGISTRY_CONFIG_KEY;
use super::quantity::resource_lists_equal;
use super::{INDEX_PORT, OCI_PORT, child_name};
use crate::store::ResourceKind;
use crds::{DEFAULT_INDEX_IMAGE, DEFAULT_OCI_REGISTRY_IMAGE, DevfileRegistry};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, ContainerPort, EmptyDirVolumeSource, EnvVar, KeyToPath,
    PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec, ResourceRequirements, Volume,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;

const STORAGE_VOLUME: &str = "devfile-registry-storage";
const CONFIG_VOLUME: &str = "registry-config";

fn container_port(port: i32) -> ContainerPort {
    ContainerPort {
        container_port: port,
        ..Default::default()
    }
}

fn memory_limit(limit: &str) -> ResourceRequirements {
    ResourceRequirements {
        limits: Some(BTreeMap::from([("memory".to_string(), Quantity(limit.to_string()))])),
        ..Default::default()
    }
}

fn env_var(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

fn index_container(registry: &DevfileRegistry) -> Container {
    let overrides = &registry.spec.devfile_index;
    let telemetry = &registry.spec.telemetry;
    let env: Vec<EnvVar> = [
        ("TELEMETRY_KEY", telemetry.key.as_deref()),
        ("REGISTRY_NAME", telemetry.registry_name.as_deref()),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.filter(|v| !v.is_empty()).map(|v| env_var(name, v)))
    .collect();

    Container {
        name: "devfile-registry".to_string(),
        image: Some(overrides.image_or(DEFAULT_INDEX_IMAGE).to_string()),
        image_pull_policy: Some(overrides.pull_policy().to_string()),
        ports: Some(vec![container_port(INDEX_PORT)]),
        env: (!env.is_empty()).then_some(env),
        resources: Some(memory_limit(overrides.memory_limit())),
        ..Default::default()
    }
}

fn oci_container(registry: &DevfileRegistry) -> Container {
    let overrides = &registry.spec.oci_registry;
    Container {
        name: "oci-registry".to_string(),
        image: Some(overrides.image_or(DEFAULT_OCI_REGISTRY_IMAGE).to_string()),
        image_pull_policy: Some(overrides.pull_policy().to_string()),
        args: Some(vec!["/etc/docker/registry/config.yml".to_string()]),
        ports: Some(vec![container_port(OCI_PORT)]),
        resources: Some(memory_limit(overrides.memory_limit())),
        volume_mounts: Some(vec![
            VolumeMount {
                name: STORAGE_VOLUME.to_string(),
                mount_path: "/var/lib/registry".to_string(),
                ..Default::default()
            },
            VolumeMount {
                name: CONFIG_VOLUME.to_string(),
                mount_path: "/etc/docker/registry".to_string(),
                read_only: Some(true),
                ..Default::default()
            },
        ]),
        ..Default::default()
    }
}

fn volumes(registry: &DevfileRegistry, registry_name: &str) -> Vec<Volume> {
    let storage = if registry.storage_enabled() {
        Volume {
            name: STORAGE_VOLUME.to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: child_name(ResourceKind::PersistentVolumeClaim, registry_name),
                ..Default::default()
            }),
            ..Default::default()
        }
    } else {
        Volume {
            name: STORAGE_VOLUME.to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        }
    };

    let config = Volume {
        name: CONFIG_VOLUME.to_string(),
        config_map: Some(ConfigMapVolumeSource {
            name: child_name(ResourceKind::ConfigMap, registry_name),
            items: Some(vec![KeyToPath {
                key: REGISTRY_CONFIG_KEY.to_string(),
                path: "config.yml".to_string(),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    };

    vec![storage, config]
}

pub(super) fn build(
    meta: ObjectMeta,
    registry: &DevfileRegistry,
    labels: &BTreeMap<String, String>,
) -> Deployment {
    let registry_name = registry.metadata.name.as_deref().unwrap_or_default();
    Deployment {
        metadata: meta,
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels.clone()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![index_container(registry), oci_container(registry)],
                    volumes: Some(volumes(registry, registry_name)),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Compares only the container fields the operator sets
fn container_drifted(live: &Container, desired: &Container) -> bool {
    let ports = |c: &Container| c.ports.iter().flatten().map(|p| p.container_port).collect::<Vec<_>>();
    fn limits(c: &Container) -> Option<&BTreeMap<String, Quantity>> {
        c.resources.as_ref().and_then(|r| r.limits.as_ref())
    }

    live.name != desired.name
        || live.image != desired.image
        || live.image_pull_policy != desired.image_pull_policy
        || live.env != desired.env
        || ports(live) != ports(desired)
        || !resource_lists_equal(limits(live), limits(desired))
}

fn pod_spec_drifted(live: &PodSpec, desired: &PodSpec) -> bool {
    if live.containers.len() != desired.containers.len() {
        return true;
    }
    let containers_drifted = live
        .containers
        .iter()
        .zip(&desired.containers)
        .any(|(l, d)| container_drifted(l, d));

    let volume_sources = |spec: &PodSpec| {
        spec.volumes
            .iter()
            .flatten()
            .map(|v| {
                (
                    v.name.clone(),
                    v.persistent_volume_claim.as_ref().map(|pvc| pvc.claim_name.clone()),
                    v.empty_dir.is_some(),
                    v.config_map.as_ref().map(|cm| cm.name.clone()),
                )
            })
            .collect::<Vec<_>>()
    };

    containers_drifted || volume_sources(live) != volume_sources(desired)
}

pub(super) fn merge(live: &mut Deployment, desired: &Deployment) -> bool {
    let Some(desired_spec) = desired.spec.as_ref() else {
        return false;
    };
    let Some(desired_pod) = desired_spec.template.spec.as_ref() else {
        return false;
    };

    let Some(spec) = live.spec.as_mut() else {
        live.spec = Some(desired_spec.clone());
        return true;
    };
    let drifted = match spec.template.spec.as_ref() {
        Some(live_pod) => pod_spec_drifted(live_pod, desired_pod),
        None => true,
    };
    if !drifted {
        return false;
    }

    match spec.template.spec.as_mut() {
        Some(live_pod) => {
            live_pod.containers = desired_pod.containers.clone();
            live_pod.volumes = desired_pod.volumes.clone();
        }
        None => spec.template.spec = Some(desired_pod.clone()),
    }
    true
}
