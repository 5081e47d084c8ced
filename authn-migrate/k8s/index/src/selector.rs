use ahash::AHashMap as HashMap;
use istio_authn_migrate_core::{ResolveError, ResolveSelector, Selector};
use istio_authn_migrate_k8s_api::{ResourceExt, Service};

/// Indexes the pod selectors of services by namespace and name.
///
/// Built once per run and read-only thereafter.
#[derive(Clone, Debug, Default)]
pub struct SelectorIndex {
    namespaces: HashMap<String, HashMap<String, Option<Selector>>>,
}

// === impl SelectorIndex ===

impl SelectorIndex {
    pub fn insert(&mut self, svc: Service) {
        let Some(namespace) = svc.namespace() else {
            tracing::debug!(service = %svc.name_any(), "Ignoring service without a namespace");
            return;
        };
        let name = svc.name_any();

        // Services without a selector (headless or external services) are indexed so that they
        // can be distinguished from services that don't exist.
        let selector = svc
            .spec
            .and_then(|spec| spec.selector)
            .filter(|selector| !selector.is_empty());

        self.namespaces
            .entry(namespace)
            .or_default()
            .insert(name, selector);
    }

    pub fn len(&self) -> usize {
        self.namespaces.values().map(|ns| ns.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<Service> for SelectorIndex {
    fn from_iter<T: IntoIterator<Item = Service>>(iter: T) -> Self {
        let mut index = Self::default();
        for svc in iter {
            index.insert(svc);
        }
        index
    }
}

impl ResolveSelector for SelectorIndex {
    fn resolve(&self, namespace: &str, service: &str) -> Result<Selector, ResolveError> {
        match self.namespaces.get(namespace).and_then(|ns| ns.get(service)) {
            Some(Some(selector)) => Ok(selector.clone()),
            Some(None) => Err(ResolveError::AmbiguousSelector {
                namespace: namespace.to_string(),
                name: service.to_string(),
            }),
            None => Err(ResolveError::TargetNotFound {
                namespace: namespace.to_string(),
                name: service.to_string(),
            }),
        }
    }
}
