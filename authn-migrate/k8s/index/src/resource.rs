use istio_authn_migrate_core::generated::{
    Action, GeneratedResource, JwtRule, MtlsMode, ResourceKind,
};
use istio_authn_migrate_k8s_api::{security, ObjectMeta};
use std::collections::BTreeMap;

/// Records the legacy policy (and target) that a generated resource was converted from.
pub const PROVENANCE_ANNOTATION: &str = "authn-migrate.istio.io/converted-from";

/// A `security.istio.io` resource ready to be serialized.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum SecurityResource {
    PeerAuthentication(security::PeerAuthentication),
    RequestAuthentication(security::RequestAuthentication),
    AuthorizationPolicy(security::AuthorizationPolicy),
}

// === impl SecurityResource ===

impl SecurityResource {
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::PeerAuthentication(r) => &r.metadata,
            Self::RequestAuthentication(r) => &r.metadata,
            Self::AuthorizationPolicy(r) => &r.metadata,
        }
    }
}

impl From<GeneratedResource> for SecurityResource {
    fn from(resource: GeneratedResource) -> Self {
        let GeneratedResource {
            name,
            namespace,
            selector,
            provenance,
            kind,
        } = resource;

        let metadata = ObjectMeta {
            name: Some(name),
            namespace: Some(namespace),
            annotations: Some(BTreeMap::from([(
                PROVENANCE_ANNOTATION.to_string(),
                provenance,
            )])),
            ..Default::default()
        };
        let selector = selector.map(|match_labels| security::WorkloadSelector { match_labels });

        match kind {
            ResourceKind::PeerAuthentication { mode } => {
                Self::PeerAuthentication(security::PeerAuthentication {
                    metadata,
                    spec: security::PeerAuthenticationSpec {
                        selector,
                        mtls: Some(security::PeerMtls {
                            mode: mtls_mode(mode),
                        }),
                    },
                })
            }

            ResourceKind::RequestAuthentication { jwt_rules } => {
                Self::RequestAuthentication(security::RequestAuthentication {
                    metadata,
                    spec: security::RequestAuthenticationSpec {
                        selector,
                        jwt_rules: jwt_rules.into_iter().map(jwt_rule).collect(),
                    },
                })
            }

            ResourceKind::AuthorizationPolicy { action, rules } => {
                let rules = rules
                    .into_iter()
                    .map(|rule| {
                        let mut from = Vec::new();
                        if rule.requires_request_principal {
                            from.push(security::RuleFrom {
                                source: security::Source::without_request_principal(),
                            });
                        }
                        security::Rule { from }
                    })
                    .collect();

                Self::AuthorizationPolicy(security::AuthorizationPolicy {
                    metadata,
                    spec: security::AuthorizationPolicySpec {
                        selector,
                        action: Some(match action {
                            Action::Deny => security::Action::Deny,
                        }),
                        rules,
                    },
                })
            }
        }
    }
}

fn mtls_mode(mode: MtlsMode) -> security::MtlsMode {
    match mode {
        MtlsMode::Strict => security::MtlsMode::Strict,
        MtlsMode::Permissive => security::MtlsMode::Permissive,
        MtlsMode::Disable => security::MtlsMode::Disable,
    }
}

fn jwt_rule(rule: JwtRule) -> security::JwtRule {
    security::JwtRule {
        issuer: rule.issuer,
        jwks_uri: rule.jwks_uri,
        audiences: rule.audiences,
        from_headers: rule
            .from_headers
            .into_iter()
            .map(|name| security::JwtHeader {
                name,
                ..Default::default()
            })
            .collect(),
        from_params: rule.from_params,
    }
}
