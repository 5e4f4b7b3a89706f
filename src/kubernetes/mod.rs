// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod client;
pub mod registry;

pub use client::KubeSource;
pub use registry::{TypeRegistry, build_core_registry};

use anyhow::Result;
use async_trait::async_trait;
use kube::api::DynamicObject;
use std::fmt;

/// The closed set of resource kinds this tool knows how to export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    Pod,
    Secret,
    Deployment,
    Role,
    RoleBinding,
    ClusterRole,
    ClusterRoleBinding,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Pod,
        ResourceKind::Secret,
        ResourceKind::Deployment,
        ResourceKind::Role,
        ResourceKind::RoleBinding,
        ResourceKind::ClusterRole,
        ResourceKind::ClusterRoleBinding,
    ];

    /// Kind string as it appears in `kind:` of a manifest
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "Pod",
            ResourceKind::Secret => "Secret",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::Role => "Role",
            ResourceKind::RoleBinding => "RoleBinding",
            ResourceKind::ClusterRole => "ClusterRole",
            ResourceKind::ClusterRoleBinding => "ClusterRoleBinding",
        }
    }

    /// Parse a kind string. Unknown kinds return None.
    pub fn from_kind(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == kind)
    }

    /// Directory label used in the output tree
    pub fn type_label(&self) -> &'static str {
        match self {
            ResourceKind::Pod => "pod",
            ResourceKind::Secret => "secret",
            ResourceKind::Deployment => "deployment",
            ResourceKind::Role => "role",
            ResourceKind::RoleBinding => "binding",
            ResourceKind::ClusterRole => "clusterrole",
            ResourceKind::ClusterRoleBinding => "clusterbinding",
        }
    }

    pub fn is_namespaced(&self) -> bool {
        !matches!(
            self,
            ResourceKind::ClusterRole | ResourceKind::ClusterRoleBinding
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only access to cluster objects.
///
/// Objects come back as the list/get API returns them: decoded, but without
/// per-item `apiVersion`/`kind`.
#[async_trait]
pub trait ResourceSource: Send + Sync {
    /// List every object of `kind`. `None` means all namespaces for
    /// namespaced kinds, and the whole cluster for cluster-scoped ones.
    async fn list_all(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
    ) -> Result<Vec<DynamicObject>>;

    /// List objects of `kind` in `namespace` whose name equals `name`
    async fn list_named(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Vec<DynamicObject>> {
        let items = self.list_all(kind, namespace).await?;
        Ok(items
            .into_iter()
            .filter(|obj| obj.metadata.name.as_deref() == Some(name))
            .collect())
    }

    /// Fetch one object by name. Ok(None) when it does not exist.
    async fn get_one(
        &self,
        kind: ResourceKind,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<DynamicObject>>;
}
