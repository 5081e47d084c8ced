use std::collections::BTreeMap;

/// Pod labels that select the workloads behind a service.
pub type Selector = BTreeMap<String, String>;

/// Resolves a named service to the pod selector of its workloads.
///
/// Resolution is an exact match on namespace and name.
pub trait ResolveSelector {
    fn resolve(&self, namespace: &str, service: &str) -> Result<Selector, ResolveError>;
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("target service {namespace}/{name} not found")]
    TargetNotFound { namespace: String, name: String },

    #[error("target service {namespace}/{name} does not select any pods")]
    AmbiguousSelector { namespace: String, name: String },
}

impl<R: ResolveSelector + ?Sized> ResolveSelector for &R {
    #[inline]
    fn resolve(&self, namespace: &str, service: &str) -> Result<Selector, ResolveError> {
        (**self).resolve(namespace, service)
    }
}
