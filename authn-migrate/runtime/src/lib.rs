//! Runs a single conversion pass against a cluster.
//!
//! The pass indexes services, lists legacy authentication policies, converts each of them, and
//! lists legacy RBAC resources for reporting. Output is released only when every policy converts
//! cleanly, unless errors are explicitly ignored.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use istio_authn_migrate_core as core;
pub use istio_authn_migrate_k8s_api as k8s;
pub use istio_authn_migrate_k8s_index as index;

mod args;
mod cluster;
mod orchestrator;
mod output;

pub use self::{
    args::Args,
    orchestrator::{Failure, ObjectRef, Orchestrator, Report, Run},
    output::to_yaml,
};
