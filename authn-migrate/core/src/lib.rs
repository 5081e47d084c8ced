//! Conversion of legacy Istio authentication policies.
//!
//! A legacy policy combines a peer (mTLS) posture, a set of origin (JWT) authentication methods,
//! and a principal binding into a single object that selects workloads by service name. The
//! converter splits each policy into up to three resources per target:
//!
//! ```text
//! [ Policy ] -> [ PeerAuthentication ]    (peers, peerIsOptional)
//!            -> [ RequestAuthentication ] (origins)
//!            -> [ AuthorizationPolicy ]   (principalBinding: USE_ORIGIN)
//! ```
//!
//! Services are resolved to pod selectors through [`ResolveSelector`], so that the converter
//! itself never performs I/O.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod convert;
pub mod generated;
pub mod legacy;
mod selector;

pub use self::{
    convert::{
        Conversion, ConversionError, Converter, Summary, TriggerRules, UnsupportedConstruct,
        Warning,
    },
    generated::{GeneratedResource, ResourceKind},
    legacy::LegacyPolicy,
    selector::{ResolveError, ResolveSelector, Selector},
};

/// The namespace that holds mesh-wide configuration when the mesh config does not name one.
pub const DEFAULT_ROOT_NAMESPACE: &str = "istio-system";
