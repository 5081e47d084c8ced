use crate::{core::GeneratedResource, index::SecurityResource};
use anyhow::{Context, Result};

/// Renders generated resources as a stream of YAML documents.
pub fn to_yaml(resources: impl IntoIterator<Item = GeneratedResource>) -> Result<String> {
    let mut out = String::new();
    for resource in resources.into_iter().map(SecurityResource::from) {
        let doc = serde_yaml::to_string(&resource).with_context(|| {
            format!(
                "failed to render {}",
                resource.metadata().name.as_deref().unwrap_or_default()
            )
        })?;
        out.push_str("---\n");
        out.push_str(&doc);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        legacy::{Jwt, PeerMethod, PrincipalBinding, Scope, Target},
        Converter, LegacyPolicy, ResolveError, ResolveSelector, Selector, TriggerRules,
    };
    use maplit::btreemap;
    use serde::Deserialize;

    struct Httpbin;

    impl ResolveSelector for Httpbin {
        fn resolve(&self, _: &str, _: &str) -> std::result::Result<Selector, ResolveError> {
            Ok(btreemap! { "app".to_string() => "httpbin".to_string() })
        }
    }

    #[test]
    fn renders_one_document_per_resource() {
        let policy = LegacyPolicy {
            name: "jwt-basic".to_string(),
            scope: Scope::Namespace("foo".to_string()),
            peer_is_optional: false,
            peers: vec![PeerMethod::MutualTls { permissive: false }],
            origin_is_optional: false,
            origins: vec![Jwt {
                issuer: "testing@secure.istio.io".to_string(),
                ..Default::default()
            }],
            principal_binding: PrincipalBinding::UseOrigin,
            targets: vec![Target {
                service: "httpbin".to_string(),
                ports: vec![],
            }],
        };
        let conversion =
            Converter::new("istio-system", TriggerRules::Approximate).convert(&policy, &Httpbin);
        assert!(conversion.is_ok());

        let yaml = to_yaml(conversion.resources).unwrap();
        assert!(yaml.starts_with("---\n"));
        let docs = serde_yaml::Deserializer::from_str(&yaml)
            .map(|doc| serde_json::Value::deserialize(doc).unwrap())
            .collect::<Vec<_>>();
        let kinds = docs
            .iter()
            .map(|doc| doc["kind"].as_str().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec!["PeerAuthentication", "RequestAuthentication", "AuthorizationPolicy"]
        );
        for doc in &docs {
            assert_eq!(doc["apiVersion"], "security.istio.io/v1beta1");
            assert_eq!(doc["metadata"]["name"], "jwt-basic-httpbin");
            assert_eq!(doc["metadata"]["namespace"], "foo");
            assert_eq!(doc["spec"]["selector"]["matchLabels"]["app"], "httpbin");
        }
        assert_eq!(docs[1]["spec"]["jwtRules"][0]["issuer"], "testing@secure.istio.io");
        assert_eq!(docs[2]["spec"]["action"], "DENY");
    }

    #[test]
    fn renders_nothing_without_resources() {
        assert_eq!(to_yaml(Vec::new()).unwrap(), "");
    }
}
