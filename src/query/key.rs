//! Canonical query keys for the result cache.

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::saved::{SavedQuery, Selection};
use super::text::fold;

/// Compute SHA256 hash of a serializable value.
///
/// The value is serialized to JSON before hashing, ensuring deterministic output.
/// Returns a 64-character lowercase hexadecimal string.
pub fn compute_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Key of a query, independent of selection order and text case.
///
/// Maps are already sorted; value lists are sorted and de-duplicated here.
/// Numbers stay JSON numbers, so `"5"` and `5` never collide.
pub fn query_key(query: &SavedQuery) -> Result<String, serde_json::Error> {
    let mut canonical = query.clone();
    for values in canonical.taxa.values_mut() {
        values.sort();
        values.dedup();
    }
    for selection in canonical.data.values_mut() {
        if let Selection::Values(values) = selection {
            values.sort();
            values.dedup();
        }
    }
    canonical.text = fold(canonical.text.trim());
    compute_hash(&canonical)
}
