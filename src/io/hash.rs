//! Content hashing for result fingerprints.

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::writer::{to_json, RenderOptions};
use crate::cube::CubeResult;

/// SHA-256 of a serializable value's JSON form, as 64 lowercase hex chars.
pub fn compute_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Fingerprint of a cube result: identical rows in identical order hash the same.
pub fn result_fingerprint(result: &CubeResult) -> Result<String, serde_json::Error> {
    let options = RenderOptions {
        include_grouping_id: true,
        ..RenderOptions::default()
    };
    compute_hash(&to_json(result, &options))
}
