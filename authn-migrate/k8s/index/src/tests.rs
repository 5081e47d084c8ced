use super::*;
use istio_authn_migrate_core::{
    legacy::{PeerMethod, PrincipalBinding, Scope, StringMatch, TargetPort},
    Converter, ResolveError, ResolveSelector, TriggerRules,
};
use istio_authn_migrate_k8s_api::{DynamicObject, ObjectMeta, Service, ServiceSpec};
use maplit::btreemap;
use serde::Deserialize;
use std::num::NonZeroU16;

fn mk_object(ns: Option<&str>, name: &str, spec: serde_json::Value) -> DynamicObject {
    let kind = if ns.is_some() { "Policy" } else { "MeshPolicy" };
    let mut metadata = serde_json::json!({ "name": name });
    if let Some(ns) = ns {
        metadata["namespace"] = ns.into();
    }
    serde_json::from_value(serde_json::json!({
        "apiVersion": "authentication.istio.io/v1alpha1",
        "kind": kind,
        "metadata": metadata,
        "spec": spec,
    }))
    .expect("object must be valid")
}

fn mk_service(ns: &str, name: &str, selector: Option<Vec<(&str, &str)>>) -> Service {
    Service {
        metadata: ObjectMeta {
            namespace: Some(ns.to_string()),
            name: Some(name.to_string()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: selector.map(|labels| {
                labels
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[test]
fn decode_defaults() {
    let policy = decode(&mk_object(Some("foo"), "default", serde_json::json!({}))).unwrap();
    assert_eq!(policy.name, "default");
    assert_eq!(policy.scope, Scope::Namespace("foo".to_string()));
    assert!(!policy.peer_is_optional);
    assert!(!policy.origin_is_optional);
    assert!(policy.peers.is_empty());
    assert!(policy.origins.is_empty());
    assert!(policy.targets.is_empty());
    assert_eq!(policy.principal_binding, PrincipalBinding::Unspecified);
}

#[test]
fn decode_mesh_policy() {
    let policy = decode(&mk_object(
        None,
        "default",
        serde_json::json!({ "peers": [{ "mtls": null }] }),
    ))
    .unwrap();
    assert_eq!(policy.scope, Scope::Mesh);
    assert_eq!(policy.peers, vec![PeerMethod::MutualTls { permissive: false }]);
}

#[test]
fn decode_permissive_mtls() {
    for (mtls, permissive) in [
        (serde_json::json!({}), false),
        (serde_json::json!({ "mode": "STRICT" }), false),
        (serde_json::json!({ "mode": "PERMISSIVE" }), true),
        (serde_json::json!({ "allowTls": true }), true),
    ] {
        let policy = decode(&mk_object(
            Some("foo"),
            "mtls",
            serde_json::json!({ "peers": [{ "mtls": mtls }] }),
        ))
        .unwrap();
        assert_eq!(
            policy.peers,
            vec![PeerMethod::MutualTls { permissive }],
            "{mtls}"
        );
    }
}

#[test]
fn decode_full_policy() {
    let policy = decode(&mk_object(
        Some("foo"),
        "full",
        serde_json::json!({
            "targets": [
                { "name": "httpbin" },
                { "name": "productpage", "ports": [{ "number": 9080 }, { "name": "http" }] },
            ],
            "peers": [{ "mtls": {} }],
            "peerIsOptional": true,
            "origins": [{
                "jwt": {
                    "issuer": "testing@secure.istio.io",
                    "jwksUri": "https://example.com/jwks.json",
                    "audiences": ["bookstore"],
                    "jwtHeaders": ["x-goog-iap-jwt-assertion"],
                    "jwtParams": ["token"],
                    "triggerRules": [{
                        "includedPaths": [{ "prefix": "/api" }],
                        "excludedPaths": [{ "exact": "/api/health" }, { "regex": "/api/v[0-9]/ping" }],
                    }],
                },
            }],
            "originIsOptional": true,
            "principalBinding": "USE_ORIGIN",
        }),
    ))
    .unwrap();

    assert!(policy.peer_is_optional);
    assert!(policy.origin_is_optional);
    assert_eq!(policy.principal_binding, PrincipalBinding::UseOrigin);

    assert_eq!(policy.targets.len(), 2);
    assert_eq!(policy.targets[0].service, "httpbin");
    assert!(policy.targets[0].ports.is_empty());
    assert_eq!(
        policy.targets[1].ports,
        vec![
            TargetPort::Number(NonZeroU16::new(9080).unwrap()),
            TargetPort::Name("http".to_string()),
        ]
    );

    let jwt = &policy.origins[0];
    assert_eq!(jwt.issuer, "testing@secure.istio.io");
    assert_eq!(jwt.jwks_uri, "https://example.com/jwks.json");
    assert_eq!(jwt.audiences, vec!["bookstore".to_string()]);
    assert_eq!(jwt.jwt_headers, vec!["x-goog-iap-jwt-assertion".to_string()]);
    assert_eq!(jwt.jwt_params, vec!["token".to_string()]);
    assert_eq!(
        jwt.trigger_rules[0].included_paths,
        vec![StringMatch::Prefix("/api".to_string())]
    );
    assert_eq!(
        jwt.trigger_rules[0].excluded_paths,
        vec![
            StringMatch::Exact("/api/health".to_string()),
            StringMatch::Regex("/api/v[0-9]/ping".to_string()),
        ]
    );
}

#[test]
fn decode_errors() {
    for (spec, expected) in [
        (
            serde_json::json!({ "targets": [{ "ports": [{ "number": 80 }] }] }),
            "field spec.targets[0].name must not be empty",
        ),
        (
            serde_json::json!({ "origins": [{}] }),
            "missing required field spec.origins[0].jwt",
        ),
        (
            serde_json::json!({ "origins": [{ "jwt": { "jwksUri": "https://example.com" } }] }),
            "field spec.origins[0].jwt.issuer must not be empty",
        ),
        (
            serde_json::json!({ "peers": [{ "mtls": {} }, { "jwt": { "issuer": "example.com" } }] }),
            "field spec.peers[1] uses a JWT peer method, only mTLS peer methods are supported",
        ),
        (
            serde_json::json!({ "targets": [{ "name": "httpbin", "ports": [{ "number": 0 }] }] }),
            "field spec.targets[0].ports[0] has invalid port 0",
        ),
        (
            serde_json::json!({ "targets": [{ "name": "httpbin", "ports": [{ "number": 70000 }] }] }),
            "field spec.targets[0].ports[0] has invalid port 70000",
        ),
    ] {
        let error = decode(&mk_object(Some("foo"), "invalid", spec)).unwrap_err();
        assert_eq!(error.to_string(), expected);
    }

    let error = decode(&mk_object(
        Some("foo"),
        "invalid",
        serde_json::json!({ "principalBinding": "USE_NOBODY" }),
    ))
    .unwrap_err();
    assert!(matches!(error, DecodeError::Malformed { .. }), "{error}");

    let error = decode(&mk_object(Some("foo"), "invalid", serde_json::Value::Null)).unwrap_err();
    assert!(matches!(error, DecodeError::MissingField(ref f) if f == "spec"), "{error}");
}

#[test]
fn selector_index() {
    let index = vec![
        mk_service("foo", "httpbin", Some(vec![("app", "httpbin")])),
        mk_service("foo", "external", None),
        mk_service("foo", "empty", Some(vec![])),
        mk_service("bar", "httpbin", Some(vec![("app", "httpbin"), ("version", "v2")])),
    ]
    .into_iter()
    .collect::<SelectorIndex>();
    assert_eq!(index.len(), 4);

    assert_eq!(
        index.resolve("foo", "httpbin"),
        Ok(btreemap! { "app".to_string() => "httpbin".to_string() })
    );
    assert_eq!(
        index.resolve("bar", "httpbin"),
        Ok(btreemap! {
            "app".to_string() => "httpbin".to_string(),
            "version".to_string() => "v2".to_string(),
        })
    );
    for name in ["external", "empty"] {
        assert_eq!(
            index.resolve("foo", name),
            Err(ResolveError::AmbiguousSelector {
                namespace: "foo".to_string(),
                name: name.to_string(),
            })
        );
    }
    assert_eq!(
        index.resolve("baz", "httpbin"),
        Err(ResolveError::TargetNotFound {
            namespace: "baz".to_string(),
            name: "httpbin".to_string(),
        })
    );
    assert_eq!(
        index.resolve("foo", "http"),
        Err(ResolveError::TargetNotFound {
            namespace: "foo".to_string(),
            name: "http".to_string(),
        })
    );
}

#[test]
fn resource_without_selector_omits_it() {
    let policy = decode(&mk_object(
        None,
        "default",
        serde_json::json!({ "peers": [{ "mtls": null }] }),
    ))
    .unwrap();
    let conversion = Converter::new("istio-system", TriggerRules::Approximate)
        .convert(&policy, &SelectorIndex::default());
    let resources = conversion
        .resources
        .into_iter()
        .map(SecurityResource::from)
        .collect::<Vec<_>>();

    assert_eq!(
        serde_json::to_value(&resources).unwrap(),
        serde_json::json!([{
            "apiVersion": "security.istio.io/v1beta1",
            "kind": "PeerAuthentication",
            "metadata": {
                "name": "default",
                "namespace": "istio-system",
                "annotations": { "authn-migrate.istio.io/converted-from": "MeshPolicy default" },
            },
            "spec": { "mtls": { "mode": "STRICT" } },
        }])
    );
}

#[test]
fn jwt_basic_matches_fixture() {
    let policy = decode(&mk_object(
        Some("foo"),
        "jwt-basic",
        serde_json::json!({
            "targets": [{ "name": "httpbin" }],
            "peers": [{ "mtls": {} }],
            "peerIsOptional": true,
            "origins": [{
                "jwt": {
                    "issuer": "testing@secure.istio.io",
                    "jwksUri": "https://raw.githubusercontent.com/istio/istio/release-1.5/security/tools/jwt/samples/jwks.json",
                },
            }],
            "principalBinding": "USE_ORIGIN",
        }),
    ))
    .unwrap();
    let index = Some(mk_service("foo", "httpbin", Some(vec![("app", "httpbin")])))
        .into_iter()
        .collect::<SelectorIndex>();

    let conversion =
        Converter::new("istio-system", TriggerRules::Approximate).convert(&policy, &index);
    assert!(conversion.is_ok(), "{:?}", conversion.summary);
    let resources = conversion
        .resources
        .into_iter()
        .map(|r| serde_json::to_value(SecurityResource::from(r)).unwrap())
        .collect::<Vec<_>>();

    let expected = serde_yaml::Deserializer::from_str(include_str!("../testdata/jwt-basic.yaml"))
        .map(|doc| serde_json::Value::deserialize(doc).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(resources, expected);
}
