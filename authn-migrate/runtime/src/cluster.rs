use crate::{
    core::DEFAULT_ROOT_NAMESPACE,
    k8s::{
        ApiResource, Client, ConfigMap, DynamicObject, Namespace, ResourceExt, Service, TypeMeta,
    },
};
use anyhow::{bail, Context, Result};
use kube::api::{Api, ListParams};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::{debug, info};

/// The key of the mesh config map that holds the mesh configuration.
const MESH_CONFIG_KEY: &str = "mesh";

const PAGE_SIZE: u32 = 500;

#[cfg(test)]
mod tests;

/// Fails if the Istio control plane namespace does not exist.
pub async fn ensure_namespace(client: Client, name: &str) -> Result<()> {
    let namespaces = Api::<Namespace>::all(client);
    match namespaces
        .get_opt(name)
        .await
        .with_context(|| format!("failed to get namespace {name}"))?
    {
        Some(_) => Ok(()),
        None => bail!("namespace {name} not found; is Istio installed?"),
    }
}

/// Reads the root namespace from the mesh config map, falling back to the default.
pub async fn root_namespace(client: Client, namespace: &str, name: &str) -> Result<String> {
    let config_maps = Api::<ConfigMap>::namespaced(client, namespace);
    let cm = match config_maps
        .get_opt(name)
        .await
        .with_context(|| format!("failed to get mesh config {namespace}/{name}"))?
    {
        Some(cm) => cm,
        None => {
            info!(
                config = %format_args!("{namespace}/{name}"),
                root_namespace = DEFAULT_ROOT_NAMESPACE,
                "Mesh config not found; using default root namespace"
            );
            return Ok(DEFAULT_ROOT_NAMESPACE.to_string());
        }
    };

    let Some(mesh) = cm.data.as_ref().and_then(|data| data.get(MESH_CONFIG_KEY)) else {
        bail!("mesh config {namespace}/{name} has no {MESH_CONFIG_KEY} key");
    };
    let root = parse_root_namespace(mesh)
        .with_context(|| format!("failed to parse mesh config {namespace}/{name}"))?;
    Ok(match root {
        Some(root) => root,
        None => {
            info!(
                root_namespace = DEFAULT_ROOT_NAMESPACE,
                "Mesh config does not set a root namespace; using default"
            );
            DEFAULT_ROOT_NAMESPACE.to_string()
        }
    })
}

/// Extracts `rootNamespace` from a YAML mesh configuration, if it is set.
pub(crate) fn parse_root_namespace(mesh: &str) -> Result<Option<String>> {
    if mesh.trim().is_empty() {
        return Ok(None);
    }
    let mesh = serde_yaml::from_str::<serde_yaml::Value>(mesh)?;
    if !mesh.is_mapping() && !mesh.is_null() {
        bail!("mesh config must be a mapping");
    }
    Ok(mesh
        .get("rootNamespace")
        .and_then(serde_yaml::Value::as_str)
        .filter(|ns| !ns.is_empty())
        .map(str::to_string))
}

pub async fn list_services(client: Client) -> Result<Vec<Service>> {
    list_all(Api::<Service>::all(client))
        .await
        .context("failed to list services")
}

/// Lists every object of a dynamically described kind, ordered by namespace and name.
///
/// A kind that is not installed in the cluster lists as empty.
pub async fn list_dynamic(client: Client, resource: &ApiResource) -> Result<Vec<DynamicObject>> {
    let api = Api::<DynamicObject>::all_with(client, resource);
    let mut objects = match list_all(api).await {
        Ok(objects) => objects,
        Err(kube::Error::Api(e)) if e.code == 404 => {
            info!(
                kind = %resource.kind,
                api_version = %resource.api_version,
                "Resource kind is not installed; skipping"
            );
            return Ok(Vec::new());
        }
        Err(error) => {
            return Err(error).with_context(|| format!("failed to list {}", resource.plural));
        }
    };

    for obj in &mut objects {
        if obj.types.is_none() {
            obj.types = Some(TypeMeta {
                api_version: resource.api_version.clone(),
                kind: resource.kind.clone(),
            });
        }
    }
    objects.sort_by(|a, b| (a.namespace(), a.name_any()).cmp(&(b.namespace(), b.name_any())));
    debug!(kind = %resource.kind, items = objects.len(), "Listed");
    Ok(objects)
}

async fn list_all<K>(api: Api<K>) -> kube::Result<Vec<K>>
where
    K: Clone + Debug + DeserializeOwned,
{
    let mut items = Vec::new();
    let mut params = ListParams::default().limit(PAGE_SIZE);
    loop {
        let page = api.list(&params).await?;
        items.extend(page.items);
        match page.metadata.continue_ {
            Some(token) if !token.is_empty() => params = params.continue_token(&token),
            _ => return Ok(items),
        }
    }
}
