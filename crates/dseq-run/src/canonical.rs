use std::collections::BTreeMap;

use dseq_core::errors::{codes, DseqError, ErrorInfo};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let ordered: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(key, val)| (key, canonicalize(val)))
                .collect();
            Value::Object(Map::from_iter(ordered))
        }
        Value::Array(values) => Value::Array(values.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Serializes a value into JSON with object keys in sorted order.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, DseqError> {
    let value = serde_json::to_value(value).map_err(|err| {
        DseqError::Serde(ErrorInfo::new(codes::REPORT_WRITE, err.to_string()))
    })?;
    serde_json::to_vec_pretty(&canonicalize(value))
        .map_err(|err| DseqError::Serde(ErrorInfo::new(codes::REPORT_WRITE, err.to_string())))
}

/// Hex SHA-256 digest of the canonical JSON encoding of `value`.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, DseqError> {
    let bytes = to_canonical_json_bytes(value)?;
    Ok(format!("{:x}", Sha256::digest(bytes)))
}
