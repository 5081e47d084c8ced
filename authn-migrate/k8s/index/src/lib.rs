//! Links Kubernetes resources to the conversion core.
//!
//! - Legacy `Policy` and `MeshPolicy` objects are listed as dynamic objects and decoded into the
//!   typed [`LegacyPolicy`](istio_authn_migrate_core::LegacyPolicy) model; the converter never
//!   sees untyped data.
//! - `Service` objects are indexed by namespace and name so that policy targets can be resolved
//!   to pod selectors.
//! - Generated resources are mapped onto `security.istio.io` objects for output.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod decode;
mod resource;
mod selector;

#[cfg(test)]
mod tests;

pub use self::{
    decode::{decode, DecodeError},
    resource::{SecurityResource, PROVENANCE_ANNOTATION},
    selector::SelectorIndex,
};
