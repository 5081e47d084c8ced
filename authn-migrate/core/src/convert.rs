use crate::{
    generated::{Action, AuthorizationRule, GeneratedResource, JwtRule, MtlsMode, ResourceKind},
    legacy::{Jwt, LegacyPolicy, PeerMethod, PrincipalBinding},
    ResolveError, ResolveSelector, Selector,
};
use std::collections::HashSet;
use tracing::debug;


/// Converts legacy policies into peer authentication, request authentication, and
/// authorization resources.
#[derive(Clone, Debug)]
pub struct Converter {
    root_namespace: String,
    trigger_rules: TriggerRules,
}

/// Controls how JWT trigger rules, which have no equivalent in the target model, are handled.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum TriggerRules {
    /// Apply the JWT rule to all paths and record a warning.
    #[default]
    Approximate,
    /// Fail the policy's conversion.
    Reject,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid trigger rule handling {0:?}: expected `approximate` or `reject`")]
pub struct InvalidTriggerRules(String);

/// The result of converting a single legacy policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conversion {
    pub resources: Vec<GeneratedResource>,
    pub summary: Summary,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Each error prevents the policy's resources from being emitted.
    pub errors: Vec<ConversionError>,
    pub warnings: Vec<Warning>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedConstruct),
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum UnsupportedConstruct {
    #[error("found {0} peer methods, at most one is supported")]
    MultiplePeerMethods(usize),

    #[error("target {service} selects ports [{ports}], port-level policies are not supported")]
    TargetPorts { service: String, ports: String },

    #[error("JWT issuer {issuer} has trigger rules, path-scoped JWT validation is not supported")]
    TriggerRules { issuer: String },

    #[error("target {service} is listed more than once")]
    DuplicateTarget { service: String },
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Warning {
    #[error("JWT issuer {issuer} has trigger rules, the JWT rule applies to all paths instead")]
    TriggerRuleApproximated { issuer: String },

    #[error(
        "origin authentication is required but the principal binding is not USE_ORIGIN, \
         requests without a JWT will be admitted"
    )]
    OriginNotEnforced,
}

/// The aspects of a policy shared by all of its targets.
struct Aspects {
    mtls: Option<MtlsMode>,
    jwt_rules: Vec<JwtRule>,
    require_principal: bool,
}

// === impl Converter ===

impl Converter {
    pub fn new(root_namespace: impl Into<String>, trigger_rules: TriggerRules) -> Self {
        Self {
            root_namespace: root_namespace.into(),
            trigger_rules,
        }
    }

    pub fn root_namespace(&self) -> &str {
        &self.root_namespace
    }

    /// Converts a policy, collecting every error rather than stopping at the first.
    ///
    /// Resources are returned for each target that converted cleanly, even when other targets
    /// failed; callers must check [`Conversion::is_ok`] before using them.
    pub fn convert<S: ResolveSelector>(&self, policy: &LegacyPolicy, selectors: &S) -> Conversion {
        let namespace = policy.effective_namespace(&self.root_namespace);
        let mut summary = Summary::default();

        if policy.peers.len() > 1 {
            summary
                .errors
                .push(UnsupportedConstruct::MultiplePeerMethods(policy.peers.len()).into());
        }

        for jwt in policy.origins.iter().filter(|j| !j.trigger_rules.is_empty()) {
            let issuer = jwt.issuer.clone();
            match self.trigger_rules {
                TriggerRules::Approximate => summary
                    .warnings
                    .push(Warning::TriggerRuleApproximated { issuer }),
                TriggerRules::Reject => summary
                    .errors
                    .push(UnsupportedConstruct::TriggerRules { issuer }.into()),
            }
        }

        if !policy.origins.is_empty()
            && !policy.origin_is_optional
            && policy.principal_binding != PrincipalBinding::UseOrigin
        {
            summary.warnings.push(Warning::OriginNotEnforced);
        }

        // Errors that apply to the policy as a whole suppress every target's resources, but
        // targets are still checked so that all errors are reported together.
        let emit = summary.errors.is_empty();
        let aspects = Aspects::new(policy);
        let mut resources = Vec::new();

        if policy.targets.is_empty() {
            debug!(%policy, %namespace, "Converting policy for the whole scope");
            if emit {
                aspects.build(
                    &mut resources,
                    &policy.name,
                    namespace,
                    None,
                    policy.to_string(),
                );
            }
        }

        let mut seen = HashSet::new();
        for target in &policy.targets {
            debug!(%policy, %namespace, service = %target.service, "Converting target");
            if !seen.insert(target.service.as_str()) {
                summary.errors.push(
                    UnsupportedConstruct::DuplicateTarget {
                        service: target.service.clone(),
                    }
                    .into(),
                );
                continue;
            }
            let mut target_ok = true;

            if !target.ports.is_empty() {
                let ports = target
                    .ports
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                summary.errors.push(
                    UnsupportedConstruct::TargetPorts {
                        service: target.service.clone(),
                        ports,
                    }
                    .into(),
                );
                target_ok = false;
            }

            let selector = match selectors.resolve(namespace, &target.service) {
                Ok(selector) => selector,
                Err(error) => {
                    summary.errors.push(error.into());
                    continue;
                }
            };

            if emit && target_ok {
                aspects.build(
                    &mut resources,
                    &format!("{}-{}", policy.name, target.service),
                    namespace,
                    Some(selector),
                    format!("{}, target {}", policy, target.service),
                );
            }
        }

        Conversion { resources, summary }
    }
}

// === impl Aspects ===

impl Aspects {
    fn new(policy: &LegacyPolicy) -> Self {
        let mtls = match policy.peers.as_slice() {
            [PeerMethod::MutualTls { permissive }] if policy.peer_is_optional || *permissive => {
                Some(MtlsMode::Permissive)
            }
            [PeerMethod::MutualTls { .. }] => Some(MtlsMode::Strict),
            _ => None,
        };

        let jwt_rules = policy.origins.iter().map(jwt_rule).collect::<Vec<_>>();

        // Peer-derived principals are enforced by the mTLS mode itself. Origin-derived principals
        // need an explicit deny for requests that lack one.
        let require_principal =
            policy.principal_binding == PrincipalBinding::UseOrigin && !jwt_rules.is_empty();

        Self {
            mtls,
            jwt_rules,
            require_principal,
        }
    }

    fn build(
        &self,
        resources: &mut Vec<GeneratedResource>,
        name: &str,
        namespace: &str,
        selector: Option<Selector>,
        provenance: String,
    ) {
        let mut push = |kind| {
            resources.push(GeneratedResource {
                name: name.to_string(),
                namespace: namespace.to_string(),
                selector: selector.clone(),
                provenance: provenance.clone(),
                kind,
            })
        };

        if let Some(mode) = self.mtls {
            push(ResourceKind::PeerAuthentication { mode });
        }

        if !self.jwt_rules.is_empty() {
            push(ResourceKind::RequestAuthentication {
                jwt_rules: self.jwt_rules.clone(),
            });
        }

        if self.require_principal {
            push(ResourceKind::AuthorizationPolicy {
                action: Action::Deny,
                rules: vec![AuthorizationRule {
                    requires_request_principal: true,
                }],
            });
        }
    }
}

fn jwt_rule(jwt: &Jwt) -> JwtRule {
    JwtRule {
        issuer: jwt.issuer.clone(),
        jwks_uri: jwt.jwks_uri.clone(),
        audiences: jwt.audiences.clone(),
        from_headers: jwt.jwt_headers.clone(),
        from_params: jwt.jwt_params.clone(),
    }
}

// === impl Conversion ===

impl Conversion {
    /// Indicates whether the policy converted without errors.
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.summary.errors.is_empty()
    }
}

// === impl TriggerRules ===

impl std::str::FromStr for TriggerRules {
    type Err = InvalidTriggerRules;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approximate" => Ok(Self::Approximate),
            "reject" => Ok(Self::Reject),
            s => Err(InvalidTriggerRules(s.to_string())),
        }
    }
}

impl std::fmt::Display for TriggerRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approximate => "approximate".fmt(f),
            Self::Reject => "reject".fmt(f),
        }
    }
}
