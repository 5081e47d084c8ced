use istio_authn_migrate_core::legacy::{
    Jwt, LegacyPolicy, PeerMethod, PrincipalBinding, Scope, StringMatch, Target, TargetPort,
    TriggerRule, DEFAULT_PRINCIPAL_BINDING,
};
use istio_authn_migrate_k8s_api::{authentication as authn, DynamicObject};
use std::num::NonZeroU16;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("missing required field {0}")]
    MissingField(String),

    #[error("field {0} must not be empty")]
    EmptyField(String),

    #[error("malformed field {field}: {source}")]
    Malformed {
        field: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("field {field} has invalid port {port}")]
    InvalidPort { field: String, port: u32 },

    #[error("field {0} uses a JWT peer method, only mTLS peer methods are supported")]
    UnsupportedPeerMethod(String),
}

/// Decodes a legacy `Policy` or `MeshPolicy` object.
///
/// Objects without a namespace are mesh-scoped.
pub fn decode(obj: &DynamicObject) -> Result<LegacyPolicy, DecodeError> {
    let name = match obj.metadata.name.as_deref() {
        None => return Err(DecodeError::MissingField("metadata.name".to_string())),
        Some("") => return Err(DecodeError::EmptyField("metadata.name".to_string())),
        Some(name) => name.to_string(),
    };

    let scope = match obj.metadata.namespace.as_deref() {
        None | Some("") => Scope::Mesh,
        Some(ns) => Scope::Namespace(ns.to_string()),
    };

    let spec = match obj.data.get("spec") {
        None | Some(serde_json::Value::Null) => {
            return Err(DecodeError::MissingField("spec".to_string()))
        }
        Some(spec) => serde_json::from_value::<authn::PolicySpec>(spec.clone()).map_err(
            |source| DecodeError::Malformed {
                field: "spec".to_string(),
                source,
            },
        )?,
    };

    let peers = spec
        .peers
        .into_iter()
        .enumerate()
        .map(|(i, peer)| peer_method(i, peer))
        .collect::<Result<Vec<_>, _>>()?;

    let origins = spec
        .origins
        .into_iter()
        .enumerate()
        .map(|(i, origin)| {
            let field = format!("spec.origins[{i}].jwt");
            let jwt = origin.jwt.ok_or_else(|| DecodeError::MissingField(field.clone()))?;
            self::jwt(&field, jwt)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let targets = spec
        .targets
        .into_iter()
        .enumerate()
        .map(|(i, target)| self::target(i, target))
        .collect::<Result<Vec<_>, _>>()?;

    let principal_binding = match spec.principal_binding {
        Some(authn::PrincipalBinding::UsePeer) => PrincipalBinding::UsePeer,
        Some(authn::PrincipalBinding::UseOrigin) => PrincipalBinding::UseOrigin,
        None => DEFAULT_PRINCIPAL_BINDING,
    };

    Ok(LegacyPolicy {
        name,
        scope,
        peer_is_optional: spec.peer_is_optional,
        peers,
        origin_is_optional: spec.origin_is_optional,
        origins,
        principal_binding,
        targets,
    })
}

fn peer_method(
    i: usize,
    peer: authn::PeerAuthenticationMethod,
) -> Result<PeerMethod, DecodeError> {
    match peer {
        authn::PeerAuthenticationMethod::Mtls(mtls) => {
            let mtls = mtls.unwrap_or_default();
            Ok(PeerMethod::MutualTls {
                permissive: mtls.allow_tls || mtls.mode == Some(authn::MutualTlsMode::Permissive),
            })
        }
        authn::PeerAuthenticationMethod::Jwt(_) => {
            Err(DecodeError::UnsupportedPeerMethod(format!("spec.peers[{i}]")))
        }
    }
}

fn jwt(field: &str, jwt: authn::Jwt) -> Result<Jwt, DecodeError> {
    if jwt.issuer.is_empty() {
        return Err(DecodeError::EmptyField(format!("{field}.issuer")));
    }

    let trigger_rules = jwt
        .trigger_rules
        .into_iter()
        .map(|rule| TriggerRule {
            included_paths: rule.included_paths.into_iter().map(string_match).collect(),
            excluded_paths: rule.excluded_paths.into_iter().map(string_match).collect(),
        })
        .collect();

    Ok(Jwt {
        issuer: jwt.issuer,
        jwks_uri: jwt.jwks_uri,
        audiences: jwt.audiences,
        jwt_headers: jwt.jwt_headers,
        jwt_params: jwt.jwt_params,
        trigger_rules,
    })
}

fn target(i: usize, target: authn::TargetSelector) -> Result<Target, DecodeError> {
    if target.name.is_empty() {
        return Err(DecodeError::EmptyField(format!("spec.targets[{i}].name")));
    }

    let ports = target
        .ports
        .into_iter()
        .enumerate()
        .map(|(j, port)| match port {
            authn::PortSelector::Name(name) => Ok(TargetPort::Name(name)),
            authn::PortSelector::Number(port) => u16::try_from(port)
                .ok()
                .and_then(NonZeroU16::new)
                .map(TargetPort::Number)
                .ok_or_else(|| DecodeError::InvalidPort {
                    field: format!("spec.targets[{i}].ports[{j}]"),
                    port,
                }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Target {
        service: target.name,
        ports,
    })
}

fn string_match(m: authn::StringMatch) -> StringMatch {
    match m {
        authn::StringMatch::Exact(s) => StringMatch::Exact(s),
        authn::StringMatch::Prefix(s) => StringMatch::Prefix(s),
        authn::StringMatch::Suffix(s) => StringMatch::Suffix(s),
        authn::StringMatch::Regex(s) => StringMatch::Regex(s),
    }
}
