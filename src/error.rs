// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Error taxonomy for an export run.
//!
//! Every variant is fatal: the exporter stops at the first error and leaves
//! whatever was already written on disk.

use std::path::PathBuf;

use thiserror::Error;

use crate::kubernetes::ResourceKind;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to fetch {kind} from the cluster: {source}")]
    SourceFetch {
        kind: ResourceKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: ResourceKind, name: String },

    #[error("no registered apiVersion/kind for '{0}'")]
    KindLookup(String),

    #[error("cannot decode field '{field}' of {kind} '{name}': {source}")]
    Decode {
        kind: ResourceKind,
        name: String,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{kind} '{name}' is missing required field '{field}'")]
    MissingField {
        kind: ResourceKind,
        name: String,
        field: &'static str,
    },

    #[error("refusing to encode '{0}': apiVersion/kind not set")]
    MissingTypeMeta(String),

    #[error("failed to encode '{name}': {source}")]
    Encode {
        name: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("failed to write {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ExportError>;
