mod json;
mod writer;
mod yaml;

pub use json::JsonEncoder;
pub use writer::HierarchicalWriter;
pub use yaml::YamlEncoder;

use kube::api::DynamicObject;

use crate::cli::OutputFormat;
use crate::error::{ExportError, Result};

/// Renders one annotated object as a standalone document
pub trait ManifestEncoder: Send + Sync {
    fn encode(&self, object: &DynamicObject) -> Result<Vec<u8>>;
}

impl OutputFormat {
    pub fn encoder(&self) -> Box<dyn ManifestEncoder> {
        match self {
            OutputFormat::Yaml => Box::new(YamlEncoder),
            OutputFormat::Json => Box::new(JsonEncoder),
        }
    }
}

/// Documents without apiVersion/kind are not valid on their own
fn require_type_meta(object: &DynamicObject) -> Result<()> {
    match &object.types {
        Some(types) if !types.api_version.is_empty() && !types.kind.is_empty() => Ok(()),
        _ => Err(ExportError::MissingTypeMeta(
            object.metadata.name.clone().unwrap_or_default(),
        )),
    }
}

fn encode_error(object: &DynamicObject, source: impl std::error::Error + Send + Sync + 'static) -> ExportError {
    ExportError::Encode {
        name: object.metadata.name.clone().unwrap_or_default(),
        source: Box::new(source),
    }
}
