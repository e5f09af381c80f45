use super::INDEX_PORT;
use crds::DevfileRegistry;
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule, IngressServiceBackend,
    IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

pub(super) fn build(meta: ObjectMeta, registry: &DevfileRegistry, service_name: &str, hostname: &str) -> Ingress {
    let backend = IngressBackend {
        service: Some(IngressServiceBackend {
            name: service_name.to_string(),
            port: Some(ServiceBackendPort {
                number: Some(INDEX_PORT),
                ..Default::default()
            }),
        }),
        ..Default::default()
    };

    let tls = registry
        .spec
        .tls
        .secret_name
        .as_deref()
        .filter(|secret| registry.tls_enabled() && !secret.is_empty())
        .map(|secret| {
            vec![IngressTLS {
                hosts: Some(vec![hostname.to_string()]),
                secret_name: Some(secret.to_string()),
            }]
        });

    Ingress {
        metadata: meta,
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                host: Some(hostname.to_string()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "ImplementationSpecific".to_string(),
                        backend,
                    }],
                }),
            }]),
            tls,
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Rules and TLS are ours; the ingress class may be set by an admission webhook.
pub(super) fn merge(live: &mut Ingress, desired: &Ingress) -> bool {
    let Some(desired_spec) = desired.spec.as_ref() else {
        return false;
    };
    let spec = live.spec.get_or_insert_with(IngressSpec::default);
    if spec.rules == desired_spec.rules && spec.tls == desired_spec.tls {
        return false;
    }
    spec.rules = desired_spec.rules.clone();
    spec.tls = desired_spec.tls.clone();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_registry;

    fn host(ingress: &Ingress) -> Option<&str> {
        ingress.spec.as_ref()?.rules.as_ref()?.first()?.host.as_deref()
    }

    #[test]
    fn test_ingress_routes_host_to_index_port() {
        let registry = create_test_registry("reg", "team");
        let ingress = build(ObjectMeta::default(), &registry, "reg", "reg-team.apps.example.com");
        assert_eq!(host(&ingress), Some("reg-team.apps.example.com"));

        let path = &ingress.spec.as_ref().unwrap().rules.as_ref().unwrap()[0]
            .http
            .as_ref()
            .unwrap()
            .paths[0];
        assert_eq!(path.path.as_deref(), Some("/"));
        let service = path.backend.service.as_ref().unwrap();
        assert_eq!(service.name, "reg");
        assert_eq!(service.port.as_ref().unwrap().number, Some(8080));
    }

    #[test]
    fn test_tls_section_needs_tls_and_secret() {
        let mut registry = create_test_registry("reg", "team");
        let plain = build(ObjectMeta::default(), &registry, "reg", "reg-team");
        assert_eq!(plain.spec.unwrap().tls, None, "no secret, no TLS section");

        registry.spec.tls.secret_name = Some("reg-cert".to_string());
        let secured = build(ObjectMeta::default(), &registry, "reg", "reg-team");
        let tls = secured.spec.unwrap().tls.unwrap();
        assert_eq!(tls[0].secret_name.as_deref(), Some("reg-cert"));
        assert_eq!(tls[0].hosts, Some(vec!["reg-team".to_string()]));

        registry.spec.tls.enabled = Some(false);
        let disabled = build(ObjectMeta::default(), &registry, "reg", "reg-team");
        assert_eq!(disabled.spec.unwrap().tls, None);
    }

    #[test]
    fn test_host_change_is_drift() {
        let registry = create_test_registry("reg", "team");
        let mut live = build(ObjectMeta::default(), &registry, "reg", "reg-team.old.example.com");
        let desired = build(ObjectMeta::default(), &registry, "reg", "reg-team.new.example.com");
        assert!(merge(&mut live, &desired));
        assert_eq!(host(&live), Some("reg-team.new.example.com"));
    }
}
