use std::collections::BTreeMap;

use log::warn;

use crate::domain::entities::mapping::{HeaderMapping, StoredMapping};
use crate::usecase::ports::store::StoreError;

/// JSON object of header -> canonical column or `null`.
pub fn encode_mapping(mapping: &HeaderMapping) -> Result<String, StoreError> {
    let targets: BTreeMap<String, Option<String>> = mapping.to_targets();
    serde_json::to_string(&targets).map_err(|err| StoreError::Message(err.to_string()))
}

/// Lenient decoding of a stored payload: anything that is not a string
/// value under an object key is treated as absent.
pub fn decode_stored_mapping(json: &str) -> StoredMapping {
    let value: serde_json::Value = match serde_json::from_str(json) {
        Ok(value) => value,
        Err(err) => {
            warn!("stored column mapping is not valid JSON, ignoring it: {err}");
            return StoredMapping::default();
        }
    };
    let Some(object) = value.as_object() else {
        warn!("stored column mapping is not a JSON object, ignoring it");
        return StoredMapping::default();
    };

    let targets = object
        .iter()
        .filter_map(|(header, target)| {
            target
                .as_str()
                .filter(|target| !target.is_empty())
                .map(|target| (header.clone(), target.to_string()))
        })
        .collect();
    StoredMapping { targets }
}
