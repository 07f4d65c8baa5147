//! Identifier types
//!
//! - CacheKey: random key generated for every stored cache value
//! - DocumentId: identifier assigned to inserted documents
//! - history key helpers for instrumented operations

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque key returned by the cache when a value is stored
///
/// 128 random bits (UUID v4) rendered as hyphenated lowercase text.
/// Collisions are possible in principle and ignored in practice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Generate a fresh random key
    pub fn generate() -> Self {
        CacheKey(Uuid::new_v4().to_string())
    }

    /// Wrap an existing key string (e.g. one typed on the command line)
    pub fn from_string(key: impl Into<String>) -> Self {
        CacheKey(key.into())
    }

    /// Key as text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the underlying string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of an inserted document, stored under `_id`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Generate a new identifier (32 hex characters)
    pub fn generate() -> Self {
        DocumentId(Uuid::new_v4().simple().to_string())
    }

    /// Wrap an identifier supplied by the caller
    pub fn from_string(id: impl Into<String>) -> Self {
        DocumentId(id.into())
    }

    /// Identifier as text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Field name that holds a document's identifier
pub const ID_FIELD: &str = "_id";

/// List key holding the recorded arguments of `identity`
pub fn inputs_key(identity: &str) -> String {
    format!("{}:inputs", identity)
}

/// List key holding the recorded results of `identity`
pub fn outputs_key(identity: &str) -> String {
    format!("{}:outputs", identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_uuid_text() {
        let key = CacheKey::generate();
        assert_eq!(key.as_str().len(), 36);
        assert!(Uuid::parse_str(key.as_str()).is_ok());
    }

    #[test]
    fn test_cache_keys_are_unique() {
        let keys: std::collections::HashSet<_> = (0..1000).map(|_| CacheKey::generate()).collect();
        assert_eq!(keys.len(), 1000);
    }

    #[test]
    fn test_document_id_is_simple_hex() {
        let id = DocumentId::generate();
        assert_eq!(id.as_str().len(), 32);
        assert!(id.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_history_keys() {
        assert_eq!(inputs_key("Cache.store"), "Cache.store:inputs");
        assert_eq!(outputs_key("Cache.store"), "Cache.store:outputs");
    }

    #[test]
    fn test_cache_key_serializes_as_string() {
        let key = CacheKey::from_string("abc");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"abc\"");
    }
}
