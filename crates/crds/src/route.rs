//! OpenShift Route
//!
//! Typed view of `route.openshift.io/v1` Route, limited to the fields the
//! operator sets or reads. Routes are not CRDs owned by this project, so
//! `crdgen` never emits this type.

use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(group = "route.openshift.io", version = "v1", kind = "Route", namespaced, derive = "PartialEq")]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    /// Host assigned by the router when left empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Backend the route points at
    pub to: RouteTargetReference,

    /// Target port on the backend service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<RoutePort>,

    /// TLS termination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<RouteTls>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteTargetReference {
    /// Kind of the backend, always "Service" here
    pub kind: String,

    /// Name of the backend
    pub name: String,

    /// Relative weight of the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutePort {
    /// Service port name or number
    #[schemars(with = "serde_json::Value")]
    pub target_port: IntOrString,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteTls {
    /// edge, passthrough or reencrypt
    pub termination: String,

    /// What to do with plain http traffic (Allow, Redirect, None)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure_edge_termination_policy: Option<String>,
}

impl Route {
    /// Host assigned to the route, ignoring empty strings
    pub fn assigned_host(&self) -> Option<&str> {
        self.spec.host.as_deref().filter(|host| !host.is_empty())
    }
}
