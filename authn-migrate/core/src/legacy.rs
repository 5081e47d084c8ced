//! The legacy (`authentication.istio.io/v1alpha1`) policy model.

use std::{fmt, num::NonZeroU16};

/// Used when a policy does not set a principal binding.
///
/// An unspecified binding is enforced exactly like [`PrincipalBinding::UsePeer`].
pub const DEFAULT_PRINCIPAL_BINDING: PrincipalBinding = PrincipalBinding::Unspecified;

/// A single legacy authentication policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegacyPolicy {
    pub name: String,
    pub scope: Scope,

    /// When set, clients may connect without mTLS even if a peer method is configured.
    pub peer_is_optional: bool,
    pub peers: Vec<PeerMethod>,

    /// When set, requests without a valid JWT are still admitted.
    pub origin_is_optional: bool,
    pub origins: Vec<Jwt>,

    pub principal_binding: PrincipalBinding,

    /// Services this policy applies to. Empty means the whole scope.
    pub targets: Vec<Target>,
}

/// Where a policy applies when it has no targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Scope {
    /// A `MeshPolicy`, which applies to the whole mesh.
    Mesh,
    /// A `Policy`, which applies within a single namespace.
    Namespace(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PeerMethod {
    MutualTls {
        /// Set when the legacy method was configured with `mode: PERMISSIVE`.
        permissive: bool,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Jwt {
    pub issuer: String,
    pub jwks_uri: String,
    pub audiences: Vec<String>,
    pub jwt_headers: Vec<String>,
    pub jwt_params: Vec<String>,
    pub trigger_rules: Vec<TriggerRule>,
}

/// Restricts JWT validation to a set of request paths.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TriggerRule {
    pub included_paths: Vec<StringMatch>,
    pub excluded_paths: Vec<StringMatch>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StringMatch {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Regex(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PrincipalBinding {
    UsePeer,
    UseOrigin,
    Unspecified,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub service: String,
    pub ports: Vec<TargetPort>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TargetPort {
    Number(NonZeroU16),
    Name(String),
}

// === impl LegacyPolicy ===

impl LegacyPolicy {
    /// Returns the namespace in which this policy's targets are resolved and its resources are
    /// created.
    pub fn effective_namespace<'p>(&'p self, root_namespace: &'p str) -> &'p str {
        match self.scope {
            Scope::Mesh => root_namespace,
            Scope::Namespace(ref ns) => ns.as_str(),
        }
    }
}

impl fmt::Display for LegacyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Scope::Mesh => write!(f, "MeshPolicy {}", self.name),
            Scope::Namespace(ref ns) => write!(f, "Policy {}/{}", ns, self.name),
        }
    }
}

// === impl PrincipalBinding ===

impl Default for PrincipalBinding {
    fn default() -> Self {
        DEFAULT_PRINCIPAL_BINDING
    }
}

// === impl TargetPort ===

impl fmt::Display for TargetPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetPort::Number(n) => fmt::Display::fmt(n, f),
            TargetPort::Name(n) => fmt::Display::fmt(n, f),
        }
    }
}
