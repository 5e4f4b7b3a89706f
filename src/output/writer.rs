//! Directory layout for exported documents:
//!
//! - `<root>/namespaces/<namespace>/<type>/<name>`
//! - `<root>/non_namespaced/<type>/<name>`

use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

use crate::error::{ExportError, Result};

const NAMESPACED_DIR: &str = "namespaces";
const CLUSTER_DIR: &str = "non_namespaced";

#[derive(Debug, Clone)]
pub struct HierarchicalWriter {
    root: PathBuf,
}

impl HierarchicalWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory that holds objects of one type in one namespace.
    /// An empty namespace goes under the cluster-scoped tree.
    pub fn target_dir(&self, namespace: &str, type_label: &str) -> PathBuf {
        if namespace.is_empty() {
            self.root.join(CLUSTER_DIR).join(type_label)
        } else {
            self.root
                .join(NAMESPACED_DIR)
                .join(namespace)
                .join(type_label)
        }
    }

    /// Write one document, replacing any file of the same name.
    /// Returns the path written.
    pub fn write(
        &self,
        namespace: &str,
        name: &str,
        type_label: &str,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let path = self.target_dir(namespace, type_label).join(name);
        write_file(&path, bytes)?;
        Ok(path)
    }
}

/// Create parent directories as needed and write `bytes` to `path`
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ExportError::Filesystem {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, bytes).map_err(|source| ExportError::Filesystem {
        path: path.to_path_buf(),
        source,
    })?;
    trace!(path = %path.display(), bytes = bytes.len(), "Wrote file");
    Ok(())
}
