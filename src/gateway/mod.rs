// Remote data gateway: traits for the hosted document database, object
// store, and user directory.
//
// The gateway is injected as a trait object everywhere it is used, so tests
// substitute `MemoryGateway` and the binary wires up `HttpGateway`. No
// module-level client handle exists.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod http;
pub mod memory;

pub use http::HttpGateway;
pub use memory::MemoryGateway;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {code} from {url}")]
    Status { code: u16, url: String },

    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

// ---------------------------------------------------------------------------
// Document model
// ---------------------------------------------------------------------------

/// One document from the hosted backend: an opaque id plus a JSON field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Field map. Always a JSON object for well-formed documents; readers
    /// must tolerate anything (permissive normalization happens downstream).
    #[serde(default)]
    pub fields: serde_json::Value,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: serde_json::Value) -> Self {
        Document {
            id: id.into(),
            fields,
        }
    }

    /// String field accessor with a permissive default (missing or
    /// non-string values become an empty string).
    pub fn str_field(&self, name: &str) -> String {
        self.fields
            .get(name)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }

    /// Numeric field accessor with a permissive default (missing,
    /// non-numeric, or negative values become 0).
    pub fn u64_field(&self, name: &str) -> u64 {
        self.fields.get(name).and_then(|v| v.as_u64()).unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Asynchronous key-value view of the hosted document database.
#[async_trait]
pub trait DocumentGateway: Send + Sync {
    /// List all documents in a collection. Collection paths may be nested,
    /// e.g. `events/summer-open/players`.
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>, GatewayError>;

    /// Fetch a single document. `Ok(None)` when it does not exist.
    async fn get_document(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, GatewayError>;

    /// Merge-update a document. Merge semantics preserve unspecified fields
    /// and deep-merge nested objects; see `merge_fields`. Creates the
    /// document if it does not exist.
    async fn merge_update(
        &self,
        collection: &str,
        id: &str,
        fields: &serde_json::Value,
    ) -> Result<(), GatewayError>;
}

/// Object storage exposing name-prefix listing and public URL resolution.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Names of stored objects whose full name starts with `prefix`.
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>, GatewayError>;

    /// Publicly reachable URL for a stored object.
    async fn public_url(&self, name: &str) -> Result<String, GatewayError>;
}

/// Identity lookup for provisioning.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Resolve an account uid by email. `Ok(None)` when no account matches.
    async fn lookup_by_email(&self, email: &str) -> Result<Option<String>, GatewayError>;
}

// ---------------------------------------------------------------------------
// Merge semantics
// ---------------------------------------------------------------------------

/// Merge `patch` into `base` in place.
///
/// Object values merge recursively; everything else (arrays included)
/// replaces the existing value. This is the contract both the backend and
/// `MemoryGateway` implement: writing `{"pickems": {"ev2": [...]}}` must not
/// clobber `pickems.ev1`.
pub fn merge_fields(base: &mut serde_json::Value, patch: &serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(patch_map)) => {
            for (key, patch_val) in patch_map {
                match base_map.get_mut(key) {
                    Some(base_val) if base_val.is_object() && patch_val.is_object() => {
                        merge_fields(base_val, patch_val);
                    }
                    _ => {
                        base_map.insert(key.clone(), patch_val.clone());
                    }
                }
            }
        }
        (base, patch) => {
            *base = patch.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn str_field_defaults_to_empty() {
        let doc = Document::new("d1", json!({"name": "Maya", "rank": 3}));
        assert_eq!(doc.str_field("name"), "Maya");
        assert_eq!(doc.str_field("team"), "");
        // Non-string value is treated as missing
        assert_eq!(doc.str_field("rank"), "");
    }

    #[test]
    fn u64_field_defaults_to_zero() {
        let doc = Document::new("d1", json!({"cost": 250000, "name": "Maya", "neg": -4}));
        assert_eq!(doc.u64_field("cost"), 250_000);
        assert_eq!(doc.u64_field("missing"), 0);
        assert_eq!(doc.u64_field("name"), 0);
        assert_eq!(doc.u64_field("neg"), 0);
    }

    #[test]
    fn merge_preserves_unspecified_fields() {
        let mut base = json!({"name": "Maya", "team": "Red"});
        merge_fields(&mut base, &json!({"team": "Blue"}));
        assert_eq!(base, json!({"name": "Maya", "team": "Blue"}));
    }

    #[test]
    fn merge_is_deep_for_nested_objects() {
        let mut base = json!({"pickems": {"ev1": ["a", "b"]}});
        merge_fields(&mut base, &json!({"pickems": {"ev2": ["c"]}}));
        assert_eq!(
            base,
            json!({"pickems": {"ev1": ["a", "b"], "ev2": ["c"]}})
        );
    }

    #[test]
    fn merge_replaces_arrays_wholesale() {
        // Pick lists are last-writer-wins: arrays replace, never concatenate.
        let mut base = json!({"pickems": {"ev1": ["a", "b"]}});
        merge_fields(&mut base, &json!({"pickems": {"ev1": ["c"]}}));
        assert_eq!(base, json!({"pickems": {"ev1": ["c"]}}));
    }

    #[test]
    fn merge_into_non_object_replaces() {
        let mut base = json!("scalar");
        merge_fields(&mut base, &json!({"a": 1}));
        assert_eq!(base, json!({"a": 1}));
    }
}
