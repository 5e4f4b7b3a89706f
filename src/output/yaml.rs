use kube::api::DynamicObject;

use super::{ManifestEncoder, encode_error, require_type_meta};
use crate::error::Result;

pub struct YamlEncoder;

impl ManifestEncoder for YamlEncoder {
    fn encode(&self, object: &DynamicObject) -> Result<Vec<u8>> {
        require_type_meta(object)?;
        serde_yaml::to_string(object)
            .map(String::into_bytes)
            .map_err(|e| encode_error(object, e))
    }
}
