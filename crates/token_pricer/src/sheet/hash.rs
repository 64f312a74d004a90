//! SHA-256 over key-sorted compact JSON, so a sheet's hash is independent of field order.

use super::PriceSheet;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Normalize JSON for hashing: sort keys and no whitespace.
pub fn normalize_for_hash(value: &serde_json::Value) -> Result<String, SheetError> {
    Ok(serde_json::to_string(&sort_json_keys(value))?)
}

fn sort_json_keys(v: &serde_json::Value) -> serde_json::Value {
    match v {
        serde_json::Value::Object(m) => {
            let sorted: BTreeMap<String, serde_json::Value> = m
                .iter()
                .map(|(k, v)| (k.clone(), sort_json_keys(v)))
                .collect();
            serde_json::Value::Object(sorted.into_iter().collect())
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(sort_json_keys).collect())
        }
        other => other.clone(),
    }
}

pub fn sheet_hash(sheet: &PriceSheet) -> Result<String, SheetError> {
    let json = serde_json::to_value(sheet)?;
    let normalized = normalize_for_hash(&json)?;
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SheetVerification {
    pub sheet_hash: String,
    pub expected_hash: String,
    pub matches: bool,
}

/// Compare against an expected hex digest, ignoring case and surrounding whitespace.
pub fn verify_sheet_hash(
    sheet: &PriceSheet,
    expected_hex: &str,
) -> Result<SheetVerification, SheetError> {
    let sheet_hash = sheet_hash(sheet)?;
    let expected_hash = expected_hex.trim().to_lowercase();
    let matches = sheet_hash == expected_hash;
    Ok(SheetVerification {
        sheet_hash,
        expected_hash,
        matches,
    })
}
