use super::*;

#[test]
fn root_namespace_from_mesh_config() {
    let mesh = "\
accessLogFile: /dev/stdout
rootNamespace: istio-config
defaultConfig:
  discoveryAddress: istiod.istio-system.svc:15012
";
    assert_eq!(
        parse_root_namespace(mesh).unwrap(),
        Some("istio-config".to_string())
    );
}

#[test]
fn root_namespace_unset() {
    for mesh in ["", "  \n", "enableTracing: true\n", "rootNamespace: \"\"\n", "null"] {
        assert_eq!(parse_root_namespace(mesh).unwrap(), None, "{mesh:?}");
    }
}

#[test]
fn root_namespace_invalid_mesh_config() {
    assert!(parse_root_namespace("rootNamespace: [").is_err());
    assert!(parse_root_namespace("- istio-config").is_err());
}
