//! Legacy `rbac.istio.io/v1alpha1` resources.
//!
//! These resources are never converted. They are only listed so that they can be reported as
//! requiring manual migration.

use kube::api::{ApiResource, GroupVersionKind};

pub const GROUP: &str = "rbac.istio.io";
pub const VERSION: &str = "v1alpha1";

const KINDS: [(&str, &str); 4] = [
    ("RbacConfig", "rbacconfigs"),
    ("ClusterRbacConfig", "clusterrbacconfigs"),
    ("ServiceRoleBinding", "servicerolebindings"),
    ("ServiceRole", "serviceroles"),
];

/// Returns descriptors for every legacy RBAC kind.
pub fn resources() -> impl Iterator<Item = ApiResource> {
    KINDS.into_iter().map(|(kind, plural)| {
        ApiResource::from_gvk_with_plural(&GroupVersionKind::gvk(GROUP, VERSION, kind), plural)
    })
}
