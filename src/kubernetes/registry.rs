// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Static registry of the types this tool exports.
//!
//! Built once at startup from k8s-openapi compile-time metadata and passed
//! around by reference. It answers two questions: which API endpoint serves
//! a kind, and which apiVersion/kind to stamp on an exported document.

use kube::api::ApiResource;
use kube::core::GroupVersionKind;
use kube::discovery::Scope;
use std::collections::HashMap;

use super::ResourceKind;

/// Version string reserved for unversioned in-process types. Never written.
pub const INTERNAL_VERSION: &str = "__internal";

/// A registered API type
#[derive(Debug, Clone)]
pub struct ResourceInfo {
    pub api_resource: ApiResource,
    pub scope: Scope,
}

impl ResourceInfo {
    pub fn is_namespaced(&self) -> bool {
        self.scope == Scope::Namespaced
    }

    /// Usable for annotation: kind and version set, and not the internal version
    pub fn is_fully_qualified(&self) -> bool {
        let ar = &self.api_resource;
        !ar.kind.is_empty() && !ar.version.is_empty() && ar.version != INTERNAL_VERSION
    }

    pub fn gvk(&self) -> GroupVersionKind {
        let ar = &self.api_resource;
        GroupVersionKind::gvk(&ar.group, &ar.version, &ar.kind)
    }
}

/// Kind string -> registered types, in registration order
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    by_kind: HashMap<String, Vec<ResourceInfo>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a type. A kind may be registered more than once (e.g. under
    /// several versions); earlier registrations win on lookup.
    pub fn add(&mut self, info: ResourceInfo) {
        self.by_kind
            .entry(info.api_resource.kind.clone())
            .or_default()
            .push(info);
    }

    /// All registrations for a kind string
    pub fn candidates(&self, kind: &str) -> &[ResourceInfo] {
        self.by_kind.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First fully-qualified registration for a kind
    pub fn resolve(&self, kind: &str) -> Option<&ResourceInfo> {
        self.candidates(kind)
            .iter()
            .find(|info| info.is_fully_qualified())
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<_> = self.by_kind.keys().map(String::as_str).collect();
        kinds.sort();
        kinds
    }
}

/// Build a registry covering every `ResourceKind`, using k8s-openapi types
/// (no discovery round-trip)
pub fn build_core_registry() -> TypeRegistry {
    use k8s_openapi::api::{
        apps::v1::Deployment,
        core::v1::{Pod, Secret},
        rbac::v1::{ClusterRole, ClusterRoleBinding, Role, RoleBinding},
    };
    use kube::Resource;

    let mut registry = TypeRegistry::new();

    // The Resource trait's Scope is an associated type, so scope is spelled out
    macro_rules! add_resource {
        ($type:ty, namespaced) => {{
            add_resource!(@inner $type, Scope::Namespaced)
        }};
        ($type:ty, cluster) => {{
            add_resource!(@inner $type, Scope::Cluster)
        }};
        (@inner $type:ty, $scope:expr) => {{
            let ar = ApiResource {
                group: <$type>::group(&()).to_string(),
                version: <$type>::version(&()).to_string(),
                api_version: <$type>::api_version(&()).to_string(),
                kind: <$type>::kind(&()).to_string(),
                plural: <$type>::plural(&()).to_string(),
            };
            registry.add(ResourceInfo {
                api_resource: ar,
                scope: $scope,
            });
        }};
    }

    // Core API (v1)
    add_resource!(Pod, namespaced);
    add_resource!(Secret, namespaced);

    // Apps API (apps/v1)
    add_resource!(Deployment, namespaced);

    // RBAC API (rbac.authorization.k8s.io/v1)
    add_resource!(Role, namespaced);
    add_resource!(RoleBinding, namespaced);
    add_resource!(ClusterRole, cluster);
    add_resource!(ClusterRoleBinding, cluster);

    registry
}

/// Look up the API endpoint for a kind
pub fn resource_info(registry: &TypeRegistry, kind: ResourceKind) -> Option<&ResourceInfo> {
    registry.resolve(kind.as_str())
}
