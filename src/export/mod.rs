// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Export pipeline.
//!
//! Categories run one after another, each to completion:
//! 1. bulk kinds (deployments, pods, secrets), every object
//! 2. role bindings whose subjects match the pattern, plus the roles they
//!    reference in the same namespace
//! 3. cluster role bindings whose subjects match, plus their cluster roles
//!
//! Every object goes fetch -> canonicalize -> annotate -> encode -> write.
//! The first error stops the run; files already written stay on disk.

pub mod annotate;
pub mod canonical;
pub mod filter;

pub use annotate::annotate;
pub use canonical::canonicalize;
pub use filter::BindingView;

use kube::api::DynamicObject;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{ExportError, Result};
use crate::kubernetes::{ResourceKind, ResourceSource, TypeRegistry};
use crate::output::{HierarchicalWriter, ManifestEncoder};
use crate::progress::ProgressHandle;

/// Kinds exported without filtering, in export order
pub const BULK_KINDS: [ResourceKind; 3] = [
    ResourceKind::Deployment,
    ResourceKind::Pod,
    ResourceKind::Secret,
];

/// What a run produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Documents written, per kind
    pub written: BTreeMap<ResourceKind, usize>,
    /// Bindings with no matching subject
    pub bindings_skipped: usize,
    /// Objects the canonicalizer did not recognise
    pub unsupported: usize,
}

impl ExportSummary {
    pub fn total(&self) -> usize {
        self.written.values().sum()
    }

    pub fn written_for(&self, kind: ResourceKind) -> usize {
        self.written.get(&kind).copied().unwrap_or(0)
    }

    fn record(&mut self, kind: ResourceKind) {
        *self.written.entry(kind).or_default() += 1;
    }
}

pub struct Exporter<'a> {
    source: &'a dyn ResourceSource,
    registry: &'a TypeRegistry,
    encoder: &'a dyn ManifestEncoder,
    writer: &'a HierarchicalWriter,
    pattern: &'a str,
    progress: Option<ProgressHandle>,
}

impl<'a> Exporter<'a> {
    pub fn new(
        source: &'a dyn ResourceSource,
        registry: &'a TypeRegistry,
        encoder: &'a dyn ManifestEncoder,
        writer: &'a HierarchicalWriter,
        pattern: &'a str,
    ) -> Self {
        Self {
            source,
            registry,
            encoder,
            writer,
            pattern,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressHandle) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run every category in order
    pub async fn run(&self) -> Result<ExportSummary> {
        let mut summary = ExportSummary::default();

        for kind in BULK_KINDS {
            self.export_bulk(kind, &mut summary).await?;
        }
        self.export_role_bindings(&mut summary).await?;
        self.export_cluster_role_bindings(&mut summary).await?;

        info!(
            written = summary.total(),
            bindings_skipped = summary.bindings_skipped,
            unsupported = summary.unsupported,
            root = %self.writer.root().display(),
            "Export complete"
        );
        Ok(summary)
    }

    async fn export_bulk(&self, kind: ResourceKind, summary: &mut ExportSummary) -> Result<()> {
        let category = format!("{}s", kind.type_label());
        let started = self.start(&category);

        let items = self.fetch_all(kind).await?;
        let mut written = 0;
        for item in &items {
            if self.emit(kind, item, summary)?.is_some() {
                written += 1;
            }
        }

        self.finish(&category, written, started);
        Ok(())
    }

    async fn export_role_bindings(&self, summary: &mut ExportSummary) -> Result<()> {
        let category = "role bindings";
        let started = self.start(category);
        let mut written = 0;

        let bindings = self.fetch_all(ResourceKind::RoleBinding).await?;
        for binding in &bindings {
            let Some(view) = self.user_defined(ResourceKind::RoleBinding, binding, summary)? else {
                continue;
            };
            self.emit(ResourceKind::RoleBinding, binding, summary)?;
            written += 1;

            // Name is not a unique key for this query, so write every match
            let roles = self
                .source
                .list_named(
                    ResourceKind::Role,
                    Some(view.namespace.as_str()),
                    &view.role_ref.name,
                )
                .await
                .map_err(|source| ExportError::SourceFetch {
                    kind: ResourceKind::Role,
                    source,
                })?;

            if roles.is_empty() {
                warn!(
                    binding = %view.name,
                    namespace = %view.namespace,
                    role_ref_kind = %view.role_ref.kind,
                    role = %view.role_ref.name,
                    "No Role found for binding"
                );
            }
            for role in &roles {
                if self.emit(ResourceKind::Role, role, summary)?.is_some() {
                    written += 1;
                }
            }
        }

        self.finish(category, written, started);
        Ok(())
    }

    async fn export_cluster_role_bindings(&self, summary: &mut ExportSummary) -> Result<()> {
        let category = "cluster role bindings";
        let started = self.start(category);
        let mut written = 0;

        let bindings = self.fetch_all(ResourceKind::ClusterRoleBinding).await?;
        for binding in &bindings {
            let Some(view) =
                self.user_defined(ResourceKind::ClusterRoleBinding, binding, summary)?
            else {
                continue;
            };
            self.emit(ResourceKind::ClusterRoleBinding, binding, summary)?;
            written += 1;

            let role = self
                .source
                .get_one(ResourceKind::ClusterRole, None, &view.role_ref.name)
                .await
                .map_err(|source| ExportError::SourceFetch {
                    kind: ResourceKind::ClusterRole,
                    source,
                })?
                .ok_or_else(|| ExportError::NotFound {
                    kind: ResourceKind::ClusterRole,
                    name: view.role_ref.name.clone(),
                })?;

            if self.emit(ResourceKind::ClusterRole, &role, summary)?.is_some() {
                written += 1;
            }
        }

        self.finish(category, written, started);
        Ok(())
    }

    async fn fetch_all(&self, kind: ResourceKind) -> Result<Vec<DynamicObject>> {
        let items = self
            .source
            .list_all(kind, None)
            .await
            .map_err(|source| ExportError::SourceFetch { kind, source })?;
        debug!(kind = %kind, count = items.len(), "Fetched");
        Ok(items)
    }

    /// Decode a raw binding and apply the subject filter once
    fn user_defined(
        &self,
        kind: ResourceKind,
        binding: &DynamicObject,
        summary: &mut ExportSummary,
    ) -> Result<Option<BindingView>> {
        let view = BindingView::from_source(kind, binding)?;
        if view.is_user_defined(self.pattern) {
            Ok(Some(view))
        } else {
            debug!(kind = %kind, binding = %view.name, namespace = %view.namespace, "Skipping binding");
            summary.bindings_skipped += 1;
            Ok(None)
        }
    }

    /// Canonicalize, annotate, encode and write one object.
    /// Ok(None) when the kind is not exportable.
    fn emit(
        &self,
        kind: ResourceKind,
        source: &DynamicObject,
        summary: &mut ExportSummary,
    ) -> Result<Option<PathBuf>> {
        let Some(canonical) = canonicalize(kind.as_str(), source)? else {
            summary.unsupported += 1;
            return Ok(None);
        };

        let namespace = canonical.namespace.clone();
        let name = canonical.name.clone();
        let kind = canonical.kind();

        let mut object = canonical.into_dynamic()?;
        annotate(self.registry, &mut object, kind.as_str())?;
        let bytes = self.encoder.encode(&object)?;
        let path = self
            .writer
            .write(&namespace, &name, kind.type_label(), &bytes)?;

        debug!(kind = %kind, path = %path.display(), "Exported");
        summary.record(kind);
        if let Some(progress) = &self.progress {
            progress.object_written(kind.as_str(), &path.display().to_string());
        }
        Ok(Some(path))
    }

    fn start(&self, category: &str) -> Instant {
        info!(category = %category, "Exporting");
        if let Some(progress) = &self.progress {
            progress.category_started(category);
        }
        Instant::now()
    }

    fn finish(&self, category: &str, written: usize, started: Instant) {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        info!(category = %category, written, elapsed_ms, "Category done");
        if let Some(progress) = &self.progress {
            progress.category_complete(category, written, elapsed_ms);
        }
    }
}
