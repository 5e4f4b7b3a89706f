// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Canonical, minimal form of exported objects.
//!
//! A canonical object keeps only identity (name, namespace, labels) and the
//! payload fields that carry meaning for its kind. Status, resource
//! versions, uids, annotations, managed fields and every other piece of
//! server bookkeeping are dropped.

use k8s_openapi::ByteString;
use k8s_openapi::api::apps::v1::DeploymentSpec;
use k8s_openapi::api::core::v1::PodSpec;
use k8s_openapi::api::rbac::v1::{PolicyRule, RoleRef, Subject};
use kube::api::{DynamicObject, ObjectMeta};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

use crate::error::{ExportError, Result};
use crate::kubernetes::ResourceKind;

/// Kind-specific payload. One variant per exportable kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Pod {
        #[serde(skip_serializing_if = "Option::is_none")]
        spec: Option<PodSpec>,
    },
    Secret {
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        type_: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<BTreeMap<String, ByteString>>,
    },
    Deployment {
        #[serde(skip_serializing_if = "Option::is_none")]
        spec: Option<DeploymentSpec>,
    },
    Role {
        #[serde(skip_serializing_if = "Option::is_none")]
        rules: Option<Vec<PolicyRule>>,
    },
    RoleBinding {
        #[serde(rename = "roleRef")]
        role_ref: RoleRef,
        #[serde(skip_serializing_if = "Option::is_none")]
        subjects: Option<Vec<Subject>>,
    },
    ClusterRole {
        #[serde(skip_serializing_if = "Option::is_none")]
        rules: Option<Vec<PolicyRule>>,
    },
    ClusterRoleBinding {
        #[serde(rename = "roleRef")]
        role_ref: RoleRef,
        #[serde(skip_serializing_if = "Option::is_none")]
        subjects: Option<Vec<Subject>>,
    },
}

impl Payload {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Payload::Pod { .. } => ResourceKind::Pod,
            Payload::Secret { .. } => ResourceKind::Secret,
            Payload::Deployment { .. } => ResourceKind::Deployment,
            Payload::Role { .. } => ResourceKind::Role,
            Payload::RoleBinding { .. } => ResourceKind::RoleBinding,
            Payload::ClusterRole { .. } => ResourceKind::ClusterRole,
            Payload::ClusterRoleBinding { .. } => ResourceKind::ClusterRoleBinding,
        }
    }
}

/// A canonicalized object, ready for annotation and encoding
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceObject {
    pub name: String,
    /// Empty for cluster-scoped kinds
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub payload: Payload,
}

impl ResourceObject {
    pub fn kind(&self) -> ResourceKind {
        self.payload.kind()
    }

    /// Render as an untyped object. `types` is left unset; the annotator
    /// fills it in.
    pub fn into_dynamic(self) -> Result<DynamicObject> {
        let data = serde_json::to_value(&self.payload).map_err(|e| ExportError::Encode {
            name: self.name.clone(),
            source: Box::new(e),
        })?;

        let metadata = ObjectMeta {
            name: Some(self.name),
            namespace: (!self.namespace.is_empty()).then_some(self.namespace),
            labels: (!self.labels.is_empty()).then_some(self.labels),
            ..Default::default()
        };

        Ok(DynamicObject {
            types: None,
            metadata,
            data,
        })
    }
}

/// Typed access to top-level fields of a raw object body
struct FieldReader<'a> {
    kind: ResourceKind,
    name: &'a str,
    data: &'a serde_json::Value,
}

impl FieldReader<'_> {
    fn optional<T: DeserializeOwned>(&self, field: &'static str) -> Result<Option<T>> {
        match self.data.get(field) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|source| ExportError::Decode {
                    kind: self.kind,
                    name: self.name.to_string(),
                    field,
                    source,
                }),
        }
    }

    fn required<T: DeserializeOwned>(&self, field: &'static str) -> Result<T> {
        self.optional(field)?.ok_or_else(|| ExportError::MissingField {
            kind: self.kind,
            name: self.name.to_string(),
            field,
        })
    }
}

/// Reduce a source object to its canonical form.
///
/// Returns `Ok(None)` for kinds outside the exportable set; callers skip
/// those. The source is not modified.
pub fn canonicalize(kind: &str, source: &DynamicObject) -> Result<Option<ResourceObject>> {
    let Some(kind) = ResourceKind::from_kind(kind) else {
        return Ok(None);
    };

    let name = source.metadata.name.clone().unwrap_or_default();
    let namespace = if kind.is_namespaced() {
        source.metadata.namespace.clone().unwrap_or_default()
    } else {
        String::new()
    };
    let labels = source.metadata.labels.clone().unwrap_or_default();

    let fields = FieldReader {
        kind,
        name: &name,
        data: &source.data,
    };

    let payload = match kind {
        ResourceKind::Pod => Payload::Pod {
            spec: fields.optional("spec")?,
        },
        ResourceKind::Secret => Payload::Secret {
            type_: fields.optional("type")?,
            data: fields.optional("data")?,
        },
        ResourceKind::Deployment => Payload::Deployment {
            spec: fields.optional("spec")?,
        },
        ResourceKind::Role => Payload::Role {
            rules: fields.optional("rules")?,
        },
        ResourceKind::RoleBinding => Payload::RoleBinding {
            role_ref: fields.required("roleRef")?,
            subjects: fields.optional("subjects")?,
        },
        ResourceKind::ClusterRole => Payload::ClusterRole {
            rules: fields.optional("rules")?,
        },
        ResourceKind::ClusterRoleBinding => Payload::ClusterRoleBinding {
            role_ref: fields.required("roleRef")?,
            subjects: fields.optional("subjects")?,
        },
    };

    Ok(Some(ResourceObject {
        name,
        namespace,
        labels,
        payload,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(value: serde_json::Value) -> DynamicObject {
        serde_json::from_value(value).unwrap()
    }

    fn noisy_metadata(name: &str, namespace: Option<&str>) -> serde_json::Value {
        let mut meta = json!({
            "name": name,
            "uid": "7f0c1d2e-0000-4000-8000-000000000001",
            "resourceVersion": "123456",
            "generation": 3,
            "creationTimestamp": "2024-01-01T00:00:00Z",
            "labels": {"app": "web"},
            "annotations": {"kubectl.kubernetes.io/last-applied-configuration": "{}"},
            "managedFields": [{"manager": "kubectl", "operation": "Apply"}],
        });
        if let Some(ns) = namespace {
            meta["namespace"] = json!(ns);
        }
        meta
    }

    fn all_sources() -> Vec<(&'static str, DynamicObject)> {
        vec![
            (
                "Pod",
                source(json!({
                    "metadata": noisy_metadata("web-0", Some("shop")),
                    "spec": {"containers": [{"name": "web", "image": "nginx:1.27"}]},
                    "status": {"phase": "Running", "podIP": "10.0.0.7"},
                })),
            ),
            (
                "Secret",
                source(json!({
                    "metadata": noisy_metadata("db-creds", Some("shop")),
                    "type": "Opaque",
                    "data": {"password": "aHVudGVyMg=="},
                })),
            ),
            (
                "Deployment",
                source(json!({
                    "metadata": noisy_metadata("web", Some("shop")),
                    "spec": {
                        "replicas": 2,
                        "selector": {"matchLabels": {"app": "web"}},
                        "template": {
                            "metadata": {"labels": {"app": "web"}},
                            "spec": {"containers": [{"name": "web", "image": "nginx:1.27"}]}
                        }
                    },
                    "status": {"readyReplicas": 2},
                })),
            ),
            (
                "Role",
                source(json!({
                    "metadata": noisy_metadata("reader", Some("shop")),
                    "rules": [{"apiGroups": [""], "resources": ["pods"], "verbs": ["get", "list"]}],
                })),
            ),
            (
                "RoleBinding",
                source(json!({
                    "metadata": noisy_metadata("reader-binding", Some("shop")),
                    "roleRef": {"apiGroup": "rbac.authorization.k8s.io", "kind": "Role", "name": "reader"},
                    "subjects": [{"kind": "Group", "name": "RES-DEV-OPSH-DEVELOPER"}],
                })),
            ),
            (
                "ClusterRole",
                source(json!({
                    "metadata": noisy_metadata("auditor", None),
                    "rules": [{"apiGroups": ["*"], "resources": ["*"], "verbs": ["get"]}],
                    "aggregationRule": {"clusterRoleSelectors": []},
                })),
            ),
            (
                "ClusterRoleBinding",
                source(json!({
                    "metadata": noisy_metadata("auditor-binding", None),
                    "roleRef": {"apiGroup": "rbac.authorization.k8s.io", "kind": "ClusterRole", "name": "auditor"},
                    "subjects": [{"kind": "User", "name": "jane-OPSH"}],
                })),
            ),
        ]
    }

    #[test]
    fn test_unsupported_kind_is_skipped() {
        let obj = source(json!({"metadata": {"name": "cfg"}, "data": {"k": "v"}}));
        assert!(canonicalize("ConfigMap", &obj).unwrap().is_none());
        assert!(canonicalize("", &obj).unwrap().is_none());
    }

    #[test]
    fn test_strips_server_fields() {
        for (kind, obj) in all_sources() {
            let canonical = canonicalize(kind, &obj).unwrap().unwrap();
            assert_eq!(canonical.kind().as_str(), kind);

            let rendered = serde_json::to_value(canonical.into_dynamic().unwrap()).unwrap();
            let meta = rendered["metadata"].as_object().unwrap();
            let mut keys: Vec<_> = meta.keys().map(String::as_str).collect();
            keys.sort();
            let expected: &[&str] = if ResourceKind::from_kind(kind).unwrap().is_namespaced() {
                &["labels", "name", "namespace"]
            } else {
                &["labels", "name"]
            };
            assert_eq!(keys, expected, "{}", kind);

            assert!(rendered.get("status").is_none(), "{}", kind);
            assert!(rendered.get("aggregationRule").is_none(), "{}", kind);
            assert!(rendered.get("apiVersion").is_none(), "{}", kind);
            assert!(rendered.get("kind").is_none(), "{}", kind);
        }
    }

    #[test]
    fn test_payload_fields_per_kind() {
        let sources = all_sources();
        let find = |kind: &str| {
            let obj = &sources.iter().find(|(k, _)| *k == kind).unwrap().1;
            serde_json::to_value(
                canonicalize(kind, obj)
                    .unwrap()
                    .unwrap()
                    .into_dynamic()
                    .unwrap(),
            )
            .unwrap()
        };

        let pod = find("Pod");
        assert_eq!(pod["spec"]["containers"][0]["image"], "nginx:1.27");

        let secret = find("Secret");
        assert_eq!(secret["type"], "Opaque");
        assert_eq!(secret["data"]["password"], "aHVudGVyMg==");

        let binding = find("RoleBinding");
        assert_eq!(binding["roleRef"]["name"], "reader");
        assert_eq!(binding["subjects"][0]["name"], "RES-DEV-OPSH-DEVELOPER");

        let role = find("ClusterRole");
        assert_eq!(role["rules"][0]["verbs"][0], "get");
    }

    #[test]
    fn test_canonicalize_is_idempotent() {
        for (kind, obj) in all_sources() {
            let once = canonicalize(kind, &obj).unwrap().unwrap();
            let rendered_once = once.clone().into_dynamic().unwrap();
            let twice = canonicalize(kind, &rendered_once).unwrap().unwrap();
            assert_eq!(once, twice, "{}", kind);

            let a = serde_yaml::to_string(&rendered_once).unwrap();
            let b = serde_yaml::to_string(&twice.into_dynamic().unwrap()).unwrap();
            assert_eq!(a, b, "{}", kind);
        }
    }

    #[test]
    fn test_source_is_not_mutated() {
        let (kind, obj) = all_sources().remove(0);
        let before = serde_json::to_value(&obj).unwrap();
        let _ = canonicalize(kind, &obj).unwrap();
        assert_eq!(serde_json::to_value(&obj).unwrap(), before);
    }

    #[test]
    fn test_cluster_role_drops_namespace() {
        let obj = source(json!({
            "metadata": {"name": "auditor", "namespace": "leftover"},
            "rules": [],
        }));
        let canonical = canonicalize("ClusterRole", &obj).unwrap().unwrap();
        assert!(canonical.namespace.is_empty());
    }

    #[test]
    fn test_missing_labels_render_as_absent() {
        let obj = source(json!({"metadata": {"name": "bare", "namespace": "ns"}}));
        let canonical = canonicalize("Pod", &obj).unwrap().unwrap();
        assert!(canonical.labels.is_empty());
        let rendered = canonical.into_dynamic().unwrap();
        assert!(rendered.metadata.labels.is_none());
        assert!(rendered.data.get("spec").is_none());
    }

    #[test]
    fn test_binding_without_role_ref() {
        let obj = source(json!({
            "metadata": {"name": "broken", "namespace": "ns"},
            "subjects": [],
        }));
        let err = canonicalize("RoleBinding", &obj).unwrap_err();
        assert!(matches!(err, ExportError::MissingField { field: "roleRef", .. }));
    }

    #[test]
    fn test_malformed_payload() {
        let obj = source(json!({
            "metadata": {"name": "weird", "namespace": "ns"},
            "rules": "not-a-list",
        }));
        let err = canonicalize("Role", &obj).unwrap_err();
        assert!(matches!(err, ExportError::Decode { field: "rules", .. }));
    }
}
