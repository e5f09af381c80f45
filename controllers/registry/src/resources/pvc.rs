use super::quantity::quantities_equal;
use crds::DevfileRegistry;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;
use tracing::warn;

pub(super) fn build(meta: ObjectMeta, registry: &DevfileRegistry) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: meta,
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(registry.volume_size().to_string()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn requested_storage(pvc: &PersistentVolumeClaim) -> Option<&Quantity> {
    pvc.spec
        .as_ref()?
        .resources
        .as_ref()?
        .requests
        .as_ref()?
        .get("storage")
}

/// Claims are immutable once bound, so a changed size is reported and left alone.
pub(super) fn merge(live: &mut PersistentVolumeClaim, desired: &PersistentVolumeClaim) -> bool {
    let live_size = requested_storage(live);
    let desired_size = requested_storage(desired);
    let same_size = match (live_size, desired_size) {
        (Some(live_size), Some(desired_size)) => quantities_equal(live_size, desired_size),
        (live_size, desired_size) => live_size == desired_size,
    };
    if !same_size {
        warn!(
            "PersistentVolumeClaim {} requests {:?} but {:?} is configured; claims cannot be resized in place",
            live.metadata.name.as_deref().unwrap_or_default(),
            live_size.map(|q| q.0.as_str()),
            desired_size.map(|q| q.0.as_str()),
        );
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_registry;

    #[test]
    fn test_claim_requests_configured_size() {
        let mut registry = create_test_registry("reg", "team");
        registry.spec.storage.registry_volume_size = Some("5Gi".to_string());
        let pvc = build(ObjectMeta::default(), &registry);
        assert_eq!(requested_storage(&pvc), Some(&Quantity("5Gi".to_string())));
        assert_eq!(
            pvc.spec.unwrap().access_modes,
            Some(vec!["ReadWriteOnce".to_string()])
        );
    }

    #[test]
    fn test_size_change_is_not_written() {
        let registry = create_test_registry("reg", "team");
        let mut live = build(ObjectMeta::default(), &registry);
        let mut resized = registry.clone();
        resized.spec.storage.registry_volume_size = Some("10Gi".to_string());
        let desired = build(ObjectMeta::default(), &resized);

        assert!(!merge(&mut live, &desired));
        assert_eq!(requested_storage(&live), Some(&Quantity("1Gi".to_string())));
    }
}
