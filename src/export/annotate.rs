// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use kube::api::DynamicObject;
use kube::core::TypeMeta;

use crate::error::{ExportError, Result};
use crate::kubernetes::TypeRegistry;

/// Stamp `apiVersion`/`kind` onto an object that lost them in transit.
///
/// The list API omits per-item type metadata, and canonical rendering never
/// sets it, so every object passes through here before encoding. A kind with
/// no usable registration fails the run rather than producing a document
/// without type metadata.
pub fn annotate(registry: &TypeRegistry, object: &mut DynamicObject, kind: &str) -> Result<()> {
    let info = registry
        .resolve(kind)
        .ok_or_else(|| ExportError::KindLookup(kind.to_string()))?;

    let gvk = info.gvk();
    object.types = Some(TypeMeta {
        api_version: gvk.api_version(),
        kind: gvk.kind,
    });
    Ok(())
}
