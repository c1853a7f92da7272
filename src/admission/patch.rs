//! Patch documents.
//!
//! A JSON object is a merge patch (RFC 7386); a JSON array is a JSON patch
//! (RFC 6902). Anything else, or anything that fails to parse, is rejected
//! before the patch touches the cluster.

use serde_json::Value;
use tracing::debug;

use crate::error::{AdmissionError, Result};

const INVALID_PATCH: &str = "Invalid JSON Patch";

/// A parsed patch document.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchDocument {
    Merge(Value),
    Json(json_patch::Patch),
}

impl PatchDocument {
    pub fn parse(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body).map_err(|e| {
            debug!(error = %e, "Patch body is not valid JSON");
            AdmissionError::InvalidPatch(INVALID_PATCH.to_string())
        })?;

        match value {
            Value::Object(_) => Ok(PatchDocument::Merge(value)),
            Value::Array(_) => serde_json::from_value(value)
                .map(PatchDocument::Json)
                .map_err(|e| {
                    debug!(error = %e, "Patch array is not a valid JSON patch");
                    AdmissionError::InvalidPatch(INVALID_PATCH.to_string())
                }),
            _ => Err(AdmissionError::InvalidPatch(INVALID_PATCH.to_string())),
        }
    }

    /// Apply to `document` in place.
    ///
    /// On failure `document` may be partially modified; callers apply to a
    /// scratch copy.
    pub fn apply(&self, document: &mut Value) -> Result<()> {
        match self {
            PatchDocument::Merge(patch) => {
                json_patch::merge(document, patch);
                Ok(())
            }
            PatchDocument::Json(patch) => json_patch::patch(document, &patch.0)
                .map_err(|e| AdmissionError::InvalidPatch(format!("{}: {}", INVALID_PATCH, e))),
        }
    }
}
