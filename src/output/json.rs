use kube::api::DynamicObject;

use super::{ManifestEncoder, encode_error, require_type_meta};
use crate::error::Result;

pub struct JsonEncoder;

impl ManifestEncoder for JsonEncoder {
    fn encode(&self, object: &DynamicObject) -> Result<Vec<u8>> {
        require_type_meta(object)?;
        let mut bytes = serde_json::to_vec_pretty(object).map_err(|e| encode_error(object, e))?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}
