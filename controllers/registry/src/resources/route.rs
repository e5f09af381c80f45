use super::INDEX_PORT;
use crds::{DevfileRegistry, Route, RoutePort, RouteSpec, RouteTargetReference, RouteTls};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

pub(super) fn build(meta: ObjectMeta, registry: &DevfileRegistry, service_name: &str) -> Route {
    let tls = registry.tls_enabled().then(|| RouteTls {
        termination: "edge".to_string(),
        insecure_edge_termination_policy: Some("Redirect".to_string()),
    });

    Route {
        metadata: meta,
        spec: RouteSpec {
            host: None,
            to: RouteTargetReference {
                kind: "Service".to_string(),
                name: service_name.to_string(),
                weight: Some(100),
            },
            port: Some(RoutePort {
                target_port: IntOrString::Int(INDEX_PORT),
            }),
            tls,
        },
    }
}

/// The host is assigned by the router and never overwritten.
pub(super) fn merge(live: &mut Route, desired: &Route) -> bool {
    let spec = &mut live.spec;
    if spec.to == desired.spec.to && spec.port == desired.spec.port && spec.tls == desired.spec.tls {
        return false;
    }
    spec.to = desired.spec.to.clone();
    spec.port = desired.spec.port.clone();
    spec.tls = desired.spec.tls.clone();
    true
}
