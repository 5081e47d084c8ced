//! Resources produced by converting a legacy policy.

use crate::Selector;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedResource {
    pub name: String,
    pub namespace: String,

    /// Absent when the resource applies to every workload in its namespace.
    pub selector: Option<Selector>,

    /// Describes the legacy policy and target this resource was converted from.
    pub provenance: String,

    pub kind: ResourceKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    PeerAuthentication { mode: MtlsMode },
    RequestAuthentication { jwt_rules: Vec<JwtRule> },
    AuthorizationPolicy { action: Action, rules: Vec<AuthorizationRule> },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MtlsMode {
    Strict,
    Permissive,
    Disable,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JwtRule {
    pub issuer: String,
    pub jwks_uri: String,
    pub audiences: Vec<String>,
    pub from_headers: Vec<String>,
    pub from_params: Vec<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Deny,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthorizationRule {
    /// Matches requests that do not carry a verified request principal.
    pub requires_request_principal: bool,
}

// === impl ResourceKind ===

impl ResourceKind {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PeerAuthentication { .. } => "PeerAuthentication",
            Self::RequestAuthentication { .. } => "RequestAuthentication",
            Self::AuthorizationPolicy { .. } => "AuthorizationPolicy",
        }
    }
}
