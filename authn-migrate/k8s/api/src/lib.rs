#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod authentication;
pub mod rbac;
pub mod security;

pub use k8s_openapi::api::core::v1::{ConfigMap, Namespace, Service, ServiceSpec};
pub use kube::{
    api::{ApiResource, DynamicObject, GroupVersionKind, ObjectList, ObjectMeta, ResourceExt},
    core::TypeMeta,
    Client, Resource,
};
