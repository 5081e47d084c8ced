//! Legacy `authentication.istio.io/v1alpha1` policies.
//!
//! Both the namespaced `Policy` and the cluster-scoped `MeshPolicy` share a spec. These types
//! describe the spec as it appears on the wire; validation happens when it is decoded into the
//! core policy model.

use kube::api::{ApiResource, GroupVersionKind};
use serde::{Deserialize, Serialize};

pub const GROUP: &str = "authentication.istio.io";
pub const VERSION: &str = "v1alpha1";

/// Describes namespaced `Policy` resources.
pub fn policies() -> ApiResource {
    ApiResource::from_gvk_with_plural(&GroupVersionKind::gvk(GROUP, VERSION, "Policy"), "policies")
}

/// Describes cluster-scoped `MeshPolicy` resources.
pub fn mesh_policies() -> ApiResource {
    ApiResource::from_gvk_with_plural(
        &GroupVersionKind::gvk(GROUP, VERSION, "MeshPolicy"),
        "meshpolicies",
    )
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySpec {
    #[serde(default)]
    pub targets: Vec<TargetSelector>,

    #[serde(default)]
    pub peers: Vec<PeerAuthenticationMethod>,

    #[serde(default)]
    pub peer_is_optional: bool,

    #[serde(default)]
    pub origins: Vec<OriginAuthenticationMethod>,

    #[serde(default)]
    pub origin_is_optional: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal_binding: Option<PrincipalBinding>,
}

/// Selects a service, and optionally some of its ports.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TargetSelector {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortSelector>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PortSelector {
    Number(u32),
    Name(String),
}

/// A peer authentication method.
///
/// Legacy policies commonly enable mTLS with an empty or null body (`- mtls:`), so the settings
/// are optional.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum PeerAuthenticationMethod {
    #[serde(rename = "mtls")]
    Mtls(Option<MutualTls>),

    #[serde(rename = "jwt")]
    Jwt(Jwt),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutualTls {
    #[serde(default)]
    pub allow_tls: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<MutualTlsMode>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum MutualTlsMode {
    #[serde(rename = "STRICT")]
    Strict,
    #[serde(rename = "PERMISSIVE")]
    Permissive,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct OriginAuthenticationMethod {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt: Option<Jwt>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Jwt {
    #[serde(default)]
    pub issuer: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub audiences: Vec<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub jwks_uri: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub jwt_headers: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub jwt_params: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trigger_rules: Vec<TriggerRule>,
}

/// Limits JWT validation to requests whose path matches.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerRule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_paths: Vec<StringMatch>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_paths: Vec<StringMatch>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StringMatch {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Regex(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum PrincipalBinding {
    #[serde(rename = "USE_PEER")]
    UsePeer,
    #[serde(rename = "USE_ORIGIN")]
    UseOrigin,
}
