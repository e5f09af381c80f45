use super::{INDEX_PORT, OCI_PORT};
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use std::collections::BTreeMap;

fn port(name: &str, port: i32) -> ServicePort {
    ServicePort {
        name: Some(name.to_string()),
        port,
        target_port: Some(IntOrString::Int(port)),
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }
}

pub(super) fn build(meta: ObjectMeta, labels: &BTreeMap<String, String>) -> Service {
    Service {
        metadata: meta,
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            ports: Some(vec![
                port("devfile-registry-metadata", INDEX_PORT),
                port("oci-metadata", OCI_PORT),
            ]),
            selector: Some(labels.clone()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Ports and selector are ours; cluster IPs and the rest belong to the API server.
pub(super) fn merge(live: &mut Service, desired: &Service) -> bool {
    let Some(desired_spec) = desired.spec.as_ref() else {
        return false;
    };
    let spec = live.spec.get_or_insert_with(ServiceSpec::default);
    let mut changed = false;

    let live_ports: Vec<_> = spec
        .ports
        .iter()
        .flatten()
        .map(|p| (p.name.clone(), p.port, p.target_port.clone()))
        .collect();
    let desired_ports: Vec<_> = desired_spec
        .ports
        .iter()
        .flatten()
        .map(|p| (p.name.clone(), p.port, p.target_port.clone()))
        .collect();
    if live_ports != desired_ports {
        spec.ports = desired_spec.ports.clone();
        changed = true;
    }

    if spec.selector != desired_spec.selector {
        spec.selector = desired_spec.selector.clone();
        changed = true;
    }

    changed
}
