// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Subject filter for bindings.
//!
//! Most bindings in a cluster are defaults or belong to operators. The ones
//! created for user access name their subjects after a shared convention,
//! e.g. `RES-DEV-OPSH-DEVELOPER-FDS`, so a plain substring test on subject
//! names separates the two. Roles carry no back-reference to their bindings,
//! which is why the walk starts from bindings.
//!
//! The test is coarse: it matches inside unrelated names and misses
//! differently formatted ones.

use k8s_openapi::api::rbac::v1::{RoleRef, Subject};
use kube::api::DynamicObject;

use crate::error::{ExportError, Result};
use crate::kubernetes::ResourceKind;

/// Case-sensitive contiguous substring test
pub fn is_user_defined(subject_name: &str, pattern: &str) -> bool {
    subject_name.contains(pattern)
}

/// True if any subject name matches. Empty input never matches.
pub fn contains_user_defined(subjects: &[Subject], pattern: &str) -> bool {
    subjects
        .iter()
        .any(|subject| is_user_defined(&subject.name, pattern))
}

/// The parts of a raw binding needed for filtering and role resolution
#[derive(Debug, Clone, PartialEq)]
pub struct BindingView {
    pub name: String,
    pub namespace: String,
    pub role_ref: RoleRef,
    pub subjects: Vec<Subject>,
}

impl BindingView {
    pub fn from_source(kind: ResourceKind, source: &DynamicObject) -> Result<Self> {
        let name = source.metadata.name.clone().unwrap_or_default();
        let namespace = source.metadata.namespace.clone().unwrap_or_default();

        let role_ref = match source.data.get("roleRef") {
            Some(value) => serde_json::from_value(value.clone()).map_err(|source| {
                ExportError::Decode {
                    kind,
                    name: name.clone(),
                    field: "roleRef",
                    source,
                }
            })?,
            None => {
                return Err(ExportError::MissingField {
                    kind,
                    name,
                    field: "roleRef",
                });
            }
        };

        let subjects = match source.data.get("subjects") {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value.clone()).map_err(|source| {
                ExportError::Decode {
                    kind,
                    name: name.clone(),
                    field: "subjects",
                    source,
                }
            })?,
        };

        Ok(Self {
            name,
            namespace,
            role_ref,
            subjects,
        })
    }

    pub fn is_user_defined(&self, pattern: &str) -> bool {
        contains_user_defined(&self.subjects, pattern)
    }
}
