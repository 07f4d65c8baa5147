//! Client contracts for the two external stores
//!
//! These traits are the seam between the cache / helpers and whatever
//! actually holds the data. Swapping the in-memory backends for a networked
//! store must not change any caller.
//!
//! Thread safety: implementations must be safe to call concurrently from
//! multiple threads (requires Send + Sync). Each method is expected to be
//! atomic on its own; nothing above this layer assumes atomicity across calls.

use crate::document::Document;
use crate::error::Result;
use crate::types::DocumentId;
use serde_json::Value;

/// Key-value store client
///
/// Keys are text; values are bytes. A key holds either a single value or a
/// list of values. Operating on a key with the wrong kind returns
/// `Error::WrongType`.
pub trait KeyValueClient: Send + Sync {
    /// Store `value` under `key`, replacing whatever was there
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Read the value under `key`
    ///
    /// Returns `Ok(None)` if the key does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Atomically add one to the integer under `key` and return the new value
    ///
    /// A missing key counts as 0.
    fn increment(&self, key: &str) -> Result<i64>;

    /// Append `value` to the list under `key`, creating it if needed
    ///
    /// Returns the list length after the append.
    fn append_to_list(&self, key: &str, value: &[u8]) -> Result<u64>;

    /// Read element `index` of the list under `key`
    ///
    /// Returns `Ok(None)` when the list or the index does not exist.
    fn read_list_element(&self, key: &str, index: u64) -> Result<Option<Vec<u8>>>;

    /// Length of the list under `key` (0 if missing)
    fn list_length(&self, key: &str) -> Result<u64>;

    /// Check if `key` exists
    fn exists(&self, key: &str) -> Result<bool>;

    /// Remove every key. Destructive and unconditional.
    fn flush_all(&self) -> Result<()>;
}

/// Counts reported by `update_many`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// Documents that matched the filter
    pub matched: u64,
    /// Documents actually changed by the update
    pub modified: u64,
}

/// Document collection client
pub trait DocumentStoreClient: Send + Sync {
    /// Return every document matching `filter` (an empty filter matches all)
    fn find(&self, filter: &Document) -> Result<Vec<Document>>;

    /// Insert `document`, assigning an `_id` when it has none
    fn insert_one(&self, document: Document) -> Result<DocumentId>;

    /// Apply `update` to every document matching `filter`
    fn update_many(&self, filter: &Document, update: &Document) -> Result<UpdateOutcome>;

    /// Evaluate an aggregation pipeline over the collection
    fn aggregate(&self, pipeline: &[Value]) -> Result<Vec<Document>>;

    /// Number of documents in the collection
    fn count(&self) -> Result<u64>;
}

impl<T: KeyValueClient + ?Sized> KeyValueClient for std::sync::Arc<T> {
    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        (**self).set(key, value)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn increment(&self, key: &str) -> Result<i64> {
        (**self).increment(key)
    }

    fn append_to_list(&self, key: &str, value: &[u8]) -> Result<u64> {
        (**self).append_to_list(key, value)
    }

    fn read_list_element(&self, key: &str, index: u64) -> Result<Option<Vec<u8>>> {
        (**self).read_list_element(key, index)
    }

    fn list_length(&self, key: &str) -> Result<u64> {
        (**self).list_length(key)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key)
    }

    fn flush_all(&self) -> Result<()> {
        (**self).flush_all()
    }
}
