use std::collections::BTreeMap;

use log::warn;
use serde_json::Value;

use crate::domain::entities::batch::ExtractedBatch;

pub const GENERIC_SERVICE_ERROR: &str = "server error";

/// Decodes an extraction-service response body. A successful body is an
/// object of value arrays; a failed one carries `{"detail": "..."}`, whose
/// message is returned verbatim.
pub fn decode_response(success: bool, body: &str) -> Result<ExtractedBatch, String> {
    if !success {
        return Err(failure_detail(body));
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|err| format!("unreadable response from extraction service: {err}"))?;
    let Value::Object(fields) = value else {
        return Err("unexpected response from extraction service".to_string());
    };

    let mut columns = BTreeMap::new();
    for (field, values) in fields {
        match values {
            Value::Array(items) => {
                columns.insert(field, items.iter().map(cell_text).collect());
            }
            other => warn!("extraction field {field:?} is not an array ({other}), skipped"),
        }
    }
    Ok(ExtractedBatch::new(columns))
}

fn failure_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(fields)) => match fields.get("detail") {
            Some(Value::String(detail)) if !detail.is_empty() => detail.clone(),
            Some(Value::Null) | None => GENERIC_SERVICE_ERROR.to_string(),
            Some(Value::String(_)) => GENERIC_SERVICE_ERROR.to_string(),
            Some(other) => other.to_string(),
        },
        _ => GENERIC_SERVICE_ERROR.to_string(),
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
