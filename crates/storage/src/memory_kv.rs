//! In-memory key-value backend
//!
//! # Design
//!
//! - DashMap: sharded by key, so unrelated keys never contend
//! - Per-key atomicity: every operation holds the shard entry for its key
//!   for its whole read-modify-write
//! - A key holds either a single value or a list; using the wrong kind
//!   fails with `Error::WrongType` (Redis WRONGTYPE semantics)

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use stashkit_core::{Error, KeyValueClient, Result};
use tracing::{debug, info};

/// Contents of one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// Single value
    Value(Vec<u8>),
    /// Ordered list of values
    List(Vec<Vec<u8>>),
}

impl Slot {
    fn kind(&self) -> &'static str {
        match self {
            Slot::Value(_) => "value",
            Slot::List(_) => "list",
        }
    }
}

/// Process-local key-value store
///
/// Cheap to create; share it through an `Arc` when several components must
/// see the same data.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    data: DashMap<String, Slot>,
}

impl MemoryKvStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the store holds no keys
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Snapshot of the slot under `key`
    pub fn slot(&self, key: &str) -> Option<Slot> {
        self.data.get(key).map(|s| s.value().clone())
    }

    /// All keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

impl KeyValueClient for MemoryKvStore {
    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.data.insert(key.to_string(), Slot::Value(value.to_vec()));
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.data.get(key) {
            None => Ok(None),
            Some(slot) => match slot.value() {
                Slot::Value(bytes) => Ok(Some(bytes.clone())),
                Slot::List(_) => Err(Error::wrong_type(key, "value")),
            },
        }
    }

    fn increment(&self, key: &str) -> Result<i64> {
        match self.data.entry(key.to_string()) {
            MapEntry::Vacant(vacant) => {
                vacant.insert(Slot::Value(b"1".to_vec()));
                Ok(1)
            }
            MapEntry::Occupied(mut occupied) => {
                let current = match occupied.get() {
                    Slot::Value(bytes) => std::str::from_utf8(bytes)
                        .ok()
                        .and_then(|s| s.parse::<i64>().ok())
                        .ok_or_else(|| Error::wrong_type(key, "integer"))?,
                    Slot::List(_) => return Err(Error::wrong_type(key, "integer")),
                };
                let next = current
                    .checked_add(1)
                    .ok_or_else(|| Error::Backend(format!("increment would overflow '{}'", key)))?;
                occupied.insert(Slot::Value(next.to_string().into_bytes()));
                Ok(next)
            }
        }
    }

    fn append_to_list(&self, key: &str, value: &[u8]) -> Result<u64> {
        let mut slot = self
            .data
            .entry(key.to_string())
            .or_insert_with(|| Slot::List(Vec::new()));
        match slot.value_mut() {
            Slot::List(items) => {
                items.push(value.to_vec());
                Ok(items.len() as u64)
            }
            other => {
                debug!(target: "stashkit::kv", key, kind = other.kind(), "list append on non-list key");
                Err(Error::wrong_type(key, "list"))
            }
        }
    }

    fn read_list_element(&self, key: &str, index: u64) -> Result<Option<Vec<u8>>> {
        match self.data.get(key) {
            None => Ok(None),
            Some(slot) => match slot.value() {
                Slot::List(items) => Ok(usize::try_from(index)
                    .ok()
                    .and_then(|i| items.get(i))
                    .cloned()),
                Slot::Value(_) => Err(Error::wrong_type(key, "list")),
            },
        }
    }

    fn list_length(&self, key: &str) -> Result<u64> {
        match self.data.get(key) {
            None => Ok(0),
            Some(slot) => match slot.value() {
                Slot::List(items) => Ok(items.len() as u64),
                Slot::Value(_) => Err(Error::wrong_type(key, "list")),
            },
        }
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.data.contains_key(key))
    }

    fn flush_all(&self) -> Result<()> {
        let dropped = self.data.len();
        self.data.clear();
        info!(target: "stashkit::kv", dropped, "Flushed in-memory store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_set_get() {
        let kv = MemoryKvStore::new();
        kv.set("a", b"1").unwrap();
        assert_eq!(kv.get("a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(kv.get("missing").unwrap(), None);
    }

    #[test]
    fn test_set_overwrites() {
        let kv = MemoryKvStore::new();
        kv.set("a", b"1").unwrap();
        kv.set("a", b"2").unwrap();
        assert_eq!(kv.get("a").unwrap(), Some(b"2".to_vec()));
        assert_eq!(kv.len(), 1);
    }

    #[test]
    fn test_increment_starts_at_one() {
        let kv = MemoryKvStore::new();
        assert_eq!(kv.increment("c").unwrap(), 1);
        assert_eq!(kv.increment("c").unwrap(), 2);
        assert_eq!(kv.get("c").unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn test_increment_existing_integer_text() {
        let kv = MemoryKvStore::new();
        kv.set("c", b"41").unwrap();
        assert_eq!(kv.increment("c").unwrap(), 42);
    }

    #[test]
    fn test_increment_non_integer_is_wrong_type() {
        let kv = MemoryKvStore::new();
        kv.set("c", b"hello").unwrap();
        assert!(matches!(kv.increment("c"), Err(Error::WrongType { .. })));
    }

    #[test]
    fn test_list_append_and_index() {
        let kv = MemoryKvStore::new();
        assert_eq!(kv.append_to_list("l", b"x").unwrap(), 1);
        assert_eq!(kv.append_to_list("l", b"y").unwrap(), 2);
        assert_eq!(kv.list_length("l").unwrap(), 2);
        assert_eq!(kv.read_list_element("l", 0).unwrap(), Some(b"x".to_vec()));
        assert_eq!(kv.read_list_element("l", 1).unwrap(), Some(b"y".to_vec()));
        assert_eq!(kv.read_list_element("l", 2).unwrap(), None);
        assert_eq!(kv.read_list_element("nope", 0).unwrap(), None);
        assert_eq!(kv.list_length("nope").unwrap(), 0);
    }

    #[test]
    fn test_list_ops_on_value_are_wrong_type() {
        let kv = MemoryKvStore::new();
        kv.set("v", b"1").unwrap();
        assert!(matches!(kv.append_to_list("v", b"x"), Err(Error::WrongType { .. })));
        assert!(matches!(kv.list_length("v"), Err(Error::WrongType { .. })));
        assert!(matches!(kv.read_list_element("v", 0), Err(Error::WrongType { .. })));
    }

    #[test]
    fn test_get_on_list_is_wrong_type() {
        let kv = MemoryKvStore::new();
        kv.append_to_list("l", b"x").unwrap();
        assert!(matches!(kv.get("l"), Err(Error::WrongType { .. })));
    }

    #[test]
    fn test_exists_and_flush() {
        let kv = MemoryKvStore::new();
        kv.set("a", b"1").unwrap();
        kv.append_to_list("l", b"x").unwrap();
        assert!(kv.exists("a").unwrap());
        assert!(kv.exists("l").unwrap());
        kv.flush_all().unwrap();
        assert!(!kv.exists("a").unwrap());
        assert!(kv.is_empty());
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let kv = Arc::new(MemoryKvStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let kv = Arc::clone(&kv);
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        kv.increment("hits").unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(kv.get("hits").unwrap(), Some(b"4000".to_vec()));
    }

    #[test]
    fn test_concurrent_appends_keep_every_element() {
        let kv = Arc::new(MemoryKvStore::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let kv = Arc::clone(&kv);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        kv.append_to_list("log", format!("{}-{}", t, i).as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(kv.list_length("log").unwrap(), 400);
    }
}
