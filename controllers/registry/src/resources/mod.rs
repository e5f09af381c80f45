//! Desired-state builders for the children of a DevfileRegistry
//!
//! [`build`] turns a registry into the body of one child resource. It is pure:
//! the same registry, labels and hostname always produce the same object.
//! [`merge_into`] copies the controller-owned fields of a desired body into a
//! live object and reports whether anything changed, which is how the
//! convergence engine decides between "update" and "leave alone".

mod config_map;
mod deployment;
mod ingress;
mod pvc;
mod quantity;
mod route;
mod service;

use crate::error::ControllerError;
use crate::store::{ManagedObject, ResourceKind};
use crds::DevfileRegistry;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::Resource;
use std::collections::BTreeMap;

/// Label shared by every object the operator creates
pub const APP_LABEL: &str = "app";
/// Value of [`APP_LABEL`]
pub const APP_LABEL_VALUE: &str = "devfileregistry";
/// Label naming the owning DevfileRegistry
pub const CR_LABEL: &str = "devfileregistry_cr";

/// Port the devfile index server listens on
pub const INDEX_PORT: i32 = 8080;
/// Port the OCI registry sidecar listens on
pub const OCI_PORT: i32 = 5000;

/// Ownership labels for the children of registry `name`
pub fn labels_for(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (APP_LABEL.to_string(), APP_LABEL_VALUE.to_string()),
        (CR_LABEL.to_string(), name.to_string()),
    ])
}

/// Deterministic name of the child of `kind` for registry `registry_name`
pub fn child_name(kind: ResourceKind, registry_name: &str) -> String {
    match kind {
        ResourceKind::ConfigMap => format!("{registry_name}-registry-config"),
        ResourceKind::PersistentVolumeClaim => format!("{registry_name}-devfile-registry"),
        ResourceKind::Service
        | ResourceKind::Deployment
        | ResourceKind::Ingress
        | ResourceKind::Route => registry_name.to_string(),
    }
}

/// Ingress host for a registry: `<name>-<namespace>.<domain>`
///
/// The registry's own ingress domain wins over `default_domain`. Without any
/// domain the host is just `<name>-<namespace>`.
pub fn ingress_hostname(
    registry: &DevfileRegistry,
    default_domain: Option<&str>,
) -> Result<String, ControllerError> {
    let (name, namespace) = registry_key(registry)?;
    let domain = registry
        .ingress_domain()
        .or(default_domain.filter(|domain| !domain.is_empty()));
    Ok(match domain {
        Some(domain) => format!("{name}-{namespace}.{domain}"),
        None => format!("{name}-{namespace}"),
    })
}

/// Externally visible URL for `hostname`
pub fn registry_url(tls_enabled: bool, hostname: &str) -> String {
    let scheme = if tls_enabled { "https" } else { "http" };
    format!("{scheme}://{hostname}")
}

/// Name and namespace of a registry
pub fn registry_key(registry: &DevfileRegistry) -> Result<(&str, &str), ControllerError> {
    let name = registry
        .metadata
        .name
        .as_deref()
        .ok_or(ControllerError::MissingObjectKey("name"))?;
    let namespace = registry
        .metadata
        .namespace
        .as_deref()
        .ok_or(ControllerError::MissingObjectKey("namespace"))?;
    Ok((name, namespace))
}

/// Controller owner reference pointing at `registry`
pub fn owner_reference(registry: &DevfileRegistry) -> Result<OwnerReference, ControllerError> {
    registry
        .controller_owner_ref(&())
        .ok_or(ControllerError::MissingObjectKey("uid"))
}

/// Whether `meta` is controlled by `registry`
pub fn is_owned_by(meta: &ObjectMeta, registry: &DevfileRegistry) -> bool {
    let Some(uid) = registry.metadata.uid.as_deref() else {
        return false;
    };
    meta.owner_references
        .iter()
        .flatten()
        .any(|owner| owner.uid == uid && owner.controller == Some(true))
}

fn child_metadata(
    kind: ResourceKind,
    registry: &DevfileRegistry,
    labels: &BTreeMap<String, String>,
) -> Result<ObjectMeta, ControllerError> {
    let (name, namespace) = registry_key(registry)?;
    Ok(ObjectMeta {
        name: Some(child_name(kind, name)),
        namespace: Some(namespace.to_string()),
        labels: Some(labels.clone()),
        owner_references: Some(vec![owner_reference(registry)?]),
        ..Default::default()
    })
}

/// Build the desired body of the `kind` child of `registry`
///
/// `hostname` is only read by the Ingress builder.
pub fn build(
    kind: ResourceKind,
    registry: &DevfileRegistry,
    labels: &BTreeMap<String, String>,
    hostname: &str,
) -> Result<ManagedObject, ControllerError> {
    let meta = child_metadata(kind, registry, labels)?;
    let (name, _) = registry_key(registry)?;
    let object = match kind {
        ResourceKind::Service => ManagedObject::Service(service::build(meta, labels)),
        ResourceKind::PersistentVolumeClaim => {
            ManagedObject::PersistentVolumeClaim(pvc::build(meta, registry))
        }
        ResourceKind::ConfigMap => ManagedObject::ConfigMap(config_map::build(meta, registry)?),
        ResourceKind::Deployment => {
            ManagedObject::Deployment(deployment::build(meta, registry, labels))
        }
        ResourceKind::Ingress => ManagedObject::Ingress(ingress::build(meta, registry, name, hostname)),
        ResourceKind::Route => ManagedObject::Route(route::build(meta, registry, name)),
    };
    Ok(object)
}

/// Copy the controller-owned fields of `desired` into `live`
///
/// Returns `true` when `live` changed and has to be written back. Fields the
/// API server defaults or assigns (cluster IP, route host, resourceVersion)
/// are left as they are.
pub fn merge_into(live: &mut ManagedObject, desired: &ManagedObject) -> Result<bool, ControllerError> {
    let mut changed = merge_metadata(live.metadata_mut(), desired.metadata());
    let spec_changed = match (live, desired) {
        (ManagedObject::Service(live), ManagedObject::Service(desired)) => service::merge(live, desired),
        (ManagedObject::PersistentVolumeClaim(live), ManagedObject::PersistentVolumeClaim(desired)) => {
            pvc::merge(live, desired)
        }
        (ManagedObject::ConfigMap(live), ManagedObject::ConfigMap(desired)) => {
            config_map::merge(live, desired)
        }
        (ManagedObject::Deployment(live), ManagedObject::Deployment(desired)) => {
            deployment::merge(live, desired)
        }
        (ManagedObject::Ingress(live), ManagedObject::Ingress(desired)) => ingress::merge(live, desired),
        (ManagedObject::Route(live), ManagedObject::Route(desired)) => route::merge(live, desired),
        (live, desired) => {
            return Err(ControllerError::KindMismatch {
                expected: desired.kind().as_str(),
                found: live.kind().as_str(),
            });
        }
    };
    changed |= spec_changed;
    Ok(changed)
}

/// Ensure the desired labels and owner references are present on `live`
///
/// Labels and owners added by other actors are kept.
fn merge_metadata(live: &mut ObjectMeta, desired: &ObjectMeta) -> bool {
    let mut changed = false;

    if let Some(desired_labels) = &desired.labels {
        let labels = live.labels.get_or_insert_with(BTreeMap::new);
        for (key, value) in desired_labels {
            if labels.get(key) != Some(value) {
                labels.insert(key.clone(), value.clone());
                changed = true;
            }
        }
    }

    if let Some(desired_owners) = &desired.owner_references {
        let owners = live.owner_references.get_or_insert_with(Vec::new);
        for owner in desired_owners {
            if !owners.iter().any(|existing| existing.uid == owner.uid) {
                owners.push(owner.clone());
                changed = true;
            }
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_registry;

    #[test]
    fn test_child_names_are_derived_from_registry_name() {
        assert_eq!(child_name(ResourceKind::Service, "reg"), "reg");
        assert_eq!(child_name(ResourceKind::Deployment, "reg"), "reg");
        assert_eq!(child_name(ResourceKind::Ingress, "reg"), "reg");
        assert_eq!(child_name(ResourceKind::Route, "reg"), "reg");
        assert_eq!(child_name(ResourceKind::ConfigMap, "reg"), "reg-registry-config");
        assert_eq!(child_name(ResourceKind::PersistentVolumeClaim, "reg"), "reg-devfile-registry");
    }

    #[test]
    fn test_ingress_hostname_prefers_registry_domain() {
        let mut registry = create_test_registry("reg", "team");
        assert_eq!(ingress_hostname(&registry, None).unwrap(), "reg-team");
        assert_eq!(
            ingress_hostname(&registry, Some("apps.default.test")).unwrap(),
            "reg-team.apps.default.test"
        );

        registry.spec.k8s.ingress_domain = Some("apps.example.com".to_string());
        assert_eq!(
            ingress_hostname(&registry, Some("apps.default.test")).unwrap(),
            "reg-team.apps.example.com"
        );
    }

    #[test]
    fn test_registry_url_scheme_follows_tls() {
        assert_eq!(registry_url(true, "reg.example.com"), "https://reg.example.com");
        assert_eq!(registry_url(false, "reg.example.com"), "http://reg.example.com");
    }

    #[test]
    fn test_every_child_is_owned_and_labelled() {
        let registry = create_test_registry("reg", "team");
        let labels = labels_for("reg");
        for kind in [
            ResourceKind::Service,
            ResourceKind::PersistentVolumeClaim,
            ResourceKind::ConfigMap,
            ResourceKind::Deployment,
            ResourceKind::Ingress,
            ResourceKind::Route,
        ] {
            let object = build(kind, &registry, &labels, "reg-team").unwrap();
            assert_eq!(object.kind(), kind);
            assert_eq!(object.metadata().namespace.as_deref(), Some("team"));
            assert_eq!(object.metadata().labels.as_ref(), Some(&labels));
            assert!(is_owned_by(object.metadata(), &registry), "{kind} must be owned");
        }
    }

    #[test]
    fn test_build_requires_uid_for_owner_reference() {
        let mut registry = create_test_registry("reg", "team");
        registry.metadata.uid = None;
        let result = build(ResourceKind::Service, &registry, &labels_for("reg"), "");
        assert!(matches!(result, Err(ControllerError::MissingObjectKey("uid"))));
    }

    #[test]
    fn test_merge_is_a_no_op_for_matching_objects() {
        let registry = create_test_registry("reg", "team");
        let labels = labels_for("reg");
        for kind in [
            ResourceKind::Service,
            ResourceKind::PersistentVolumeClaim,
            ResourceKind::ConfigMap,
            ResourceKind::Deployment,
            ResourceKind::Ingress,
            ResourceKind::Route,
        ] {
            let desired = build(kind, &registry, &labels, "reg-team").unwrap();
            let mut live = desired.clone();
            assert!(!merge_into(&mut live, &desired).unwrap(), "{kind} should not drift");
            assert_eq!(live, desired);
        }
    }

    #[test]
    fn test_merge_restores_missing_labels_and_keeps_foreign_ones() {
        let registry = create_test_registry("reg", "team");
        let desired = build(ResourceKind::ConfigMap, &registry, &labels_for("reg"), "").unwrap();
        let mut live = desired.clone();
        live.metadata_mut().labels = Some(BTreeMap::from([("team".to_string(), "a".to_string())]));

        assert!(merge_into(&mut live, &desired).unwrap());
        let labels = live.metadata().labels.clone().unwrap();
        assert_eq!(labels.get("team").map(String::as_str), Some("a"));
        assert_eq!(labels.get(CR_LABEL).map(String::as_str), Some("reg"));
    }

    #[test]
    fn test_merge_rejects_mismatched_kinds() {
        let registry = create_test_registry("reg", "team");
        let labels = labels_for("reg");
        let desired = build(ResourceKind::Service, &registry, &labels, "").unwrap();
        let mut live = build(ResourceKind::ConfigMap, &registry, &labels, "").unwrap();
        assert!(matches!(
            merge_into(&mut live, &desired),
            Err(ControllerError::KindMismatch { expected: "Service", found: "ConfigMap" })
        ));
    }
}
