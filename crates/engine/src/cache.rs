//! InstrumentedCache: random-key value cache over a key-value store
//!
//! ## Design
//!
//! The cache is a stateless facade. It holds an `Arc<dyn KeyValueClient>`
//! and immutable options; every byte lives in the store. Two caches built
//! over the same client see the same values, counters and history.
//!
//! ## Keys
//!
//! `store` generates a fresh UUID v4 key per call and writes without an
//! existence check. Keys are never reused, so the returned key is the only
//! handle to its value.
//!
//! ## Values
//!
//! Text and bytes are stored verbatim. Numbers are normalized to canonical
//! text (`42`, `3.14`, `1.0`) before the write; reading them back is an
//! explicit decode step chosen by the caller through [`DecodeStrategy`].
//!
//! ## Instrumentation
//!
//! `store` runs through [`Instrumentation`] under the identity
//! [`STORE_IDENTITY`], so its calls are counted and recorded unless the
//! options disable it.

use std::fmt;
use std::sync::Arc;

use stashkit_core::{CacheKey, DecodeStrategy, Decoded, KeyValueClient, Result, StoredValue};
use tracing::{debug, info};

use crate::instrumentation::{CallHistory, Instrumentation, InstrumentationMode, Operation};
use crate::replay::ReplayReporter;

/// Identity under which `store` calls are counted and recorded
pub const STORE_IDENTITY: &str = "Cache.store";

/// Construction options for [`InstrumentedCache`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Flush the whole store on construction
    pub flush_on_init: bool,
    /// Bookkeeping applied to `store`
    pub instrumentation: InstrumentationMode,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            flush_on_init: true,
            instrumentation: InstrumentationMode::Full,
        }
    }
}

impl CacheOptions {
    /// Keep existing data on construction
    pub fn without_flush(mut self) -> Self {
        self.flush_on_init = false;
        self
    }

    /// Use a different instrumentation mode
    pub fn with_instrumentation(mut self, mode: InstrumentationMode) -> Self {
        self.instrumentation = mode;
        self
    }
}

/// Value cache with call counting and history
///
/// # Example
///
/// ```ignore
/// let client: Arc<dyn KeyValueClient> = Arc::new(MemoryKvStore::new());
/// let cache = InstrumentedCache::initialize(client)?;
///
/// let key = cache.store("hello")?;
/// assert_eq!(cache.get_as_text(&key)?, Some("hello".to_string()));
/// assert_eq!(cache.call_count("Cache.store")?, 1);
/// ```
#[derive(Clone)]
pub struct InstrumentedCache {
    client: Arc<dyn KeyValueClient>,
    instrumentation: Instrumentation,
    options: CacheOptions,
}

impl fmt::Debug for InstrumentedCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstrumentedCache")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl InstrumentedCache {
    /// Take the client handle and flush the store
    ///
    /// Destructive: every key in the store is dropped, including keys the
    /// cache did not write.
    ///
    /// # Errors
    ///
    /// Propagates the store failure if the flush fails.
    pub fn initialize(client: Arc<dyn KeyValueClient>) -> Result<Self> {
        Self::with_options(client, CacheOptions::default())
    }

    /// Build with explicit options
    pub fn with_options(client: Arc<dyn KeyValueClient>, options: CacheOptions) -> Result<Self> {
        if options.flush_on_init {
            client.flush_all()?;
            info!(target: "stashkit::cache", "Flushed store on cache init");
        }
        let instrumentation = Instrumentation::new(client.clone(), options.instrumentation);
        Ok(Self {
            client,
            instrumentation,
            options,
        })
    }

    /// Options the cache was built with
    pub fn options(&self) -> CacheOptions {
        self.options
    }

    /// Shared client handle
    pub fn client(&self) -> &Arc<dyn KeyValueClient> {
        &self.client
    }

    /// Instrumentation routine, for wrapping further operations
    pub fn instrumentation(&self) -> &Instrumentation {
        &self.instrumentation
    }

    /// Reporter over the same store
    pub fn reporter(&self) -> ReplayReporter {
        ReplayReporter::new(self.client.clone())
    }

    // ========== Write ==========

    /// Store a value under a fresh key and return the key
    ///
    /// # Errors
    ///
    /// Store failures propagate; the value itself is never rejected.
    pub fn store(&self, value: impl Into<StoredValue>) -> Result<CacheKey> {
        let value = value.into();
        let op = Operation::new(STORE_IDENTITY, || self.store_uninstrumented(&value))
            .arg(value.repr());
        self.instrumentation.run(op)
    }

    fn store_uninstrumented(&self, value: &StoredValue) -> Result<CacheKey> {
        let key = CacheKey::generate();
        self.client.set(key.as_str(), &value.to_bytes())?;
        debug!(target: "stashkit::cache", key = %key, kind = value.type_name(), "Stored value");
        Ok(key)
    }

    // ========== Read ==========

    /// Read `key` and decode it with `strategy`
    ///
    /// An absent key is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` if the bytes do not fit the strategy, or the
    /// store failure if the read fails.
    pub fn get(&self, key: impl AsRef<str>, strategy: DecodeStrategy) -> Result<Option<Decoded>> {
        let key = key.as_ref();
        match self.client.get(key)? {
            None => {
                debug!(target: "stashkit::cache", key, "Cache miss");
                Ok(None)
            }
            Some(bytes) => strategy.decode(key, bytes).map(Some),
        }
    }

    /// Read the raw bytes
    pub fn get_raw(&self, key: impl AsRef<str>) -> Result<Option<Vec<u8>>> {
        Ok(self
            .get(key, DecodeStrategy::Raw)?
            .and_then(Decoded::into_bytes))
    }

    /// Read as UTF-8 text
    pub fn get_as_text(&self, key: impl AsRef<str>) -> Result<Option<String>> {
        Ok(self
            .get(key, DecodeStrategy::Text)?
            .and_then(Decoded::into_text))
    }

    /// Read as a base-10 integer
    ///
    /// Stored floats such as `3.14` are not integer literals and fail to
    /// decode.
    pub fn get_as_integer(&self, key: impl AsRef<str>) -> Result<Option<i64>> {
        Ok(self
            .get(key, DecodeStrategy::Integer)?
            .and_then(|d| d.as_int()))
    }

    /// Read as a float
    pub fn get_as_float(&self, key: impl AsRef<str>) -> Result<Option<f64>> {
        Ok(self
            .get(key, DecodeStrategy::Float)?
            .and_then(|d| d.as_float()))
    }

    // ========== Bookkeeping ==========

    /// Invocation counter for `identity`
    pub fn call_count(&self, identity: &str) -> Result<u64> {
        self.instrumentation.call_count(identity)
    }

    /// Recorded history for `identity`
    pub fn history(&self, identity: &str) -> Result<CallHistory> {
        self.instrumentation.history(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stashkit_core::Error;
    use stashkit_storage::MemoryKvStore;

    fn setup() -> InstrumentedCache {
        InstrumentedCache::initialize(Arc::new(MemoryKvStore::new())).unwrap()
    }

    #[test]
    fn test_store_text_round_trip() {
        let cache = setup();
        let key = cache.store("hello").unwrap();
        assert_eq!(cache.get_as_text(&key).unwrap(), Some("hello".to_string()));
    }

    #[test]
    fn test_store_integer_round_trip() {
        let cache = setup();
        let key = cache.store(42).unwrap();
        assert_eq!(cache.get_as_integer(&key).unwrap(), Some(42));
        assert_eq!(cache.get_as_text(&key).unwrap(), Some("42".to_string()));
    }

    #[test]
    fn test_store_float_is_canonical_text() {
        let cache = setup();
        let key = cache.store(3.14).unwrap();
        assert_eq!(cache.get_raw(&key).unwrap(), Some(b"3.14".to_vec()));
        assert_eq!(cache.get_as_float(&key).unwrap(), Some(3.14));
        assert!(matches!(cache.get_as_integer(&key), Err(Error::Decode { .. })));

        let key = cache.store(1.0).unwrap();
        assert_eq!(cache.get_as_text(&key).unwrap(), Some("1.0".to_string()));
    }

    #[test]
    fn test_store_bytes_round_trip() {
        let cache = setup();
        let key = cache.store(&b"\x00\xff"[..]).unwrap();
        assert_eq!(cache.get_raw(&key).unwrap(), Some(vec![0x00, 0xff]));
        assert!(matches!(cache.get_as_text(&key), Err(Error::Decode { .. })));
    }

    #[test]
    fn test_missing_key_is_none_for_every_strategy() {
        let cache = setup();
        for strategy in [
            DecodeStrategy::Raw,
            DecodeStrategy::Text,
            DecodeStrategy::Integer,
            DecodeStrategy::Float,
        ] {
            assert_eq!(cache.get("nonexistent-key", strategy).unwrap(), None);
        }
    }

    #[test]
    fn test_keys_are_fresh() {
        let cache = setup();
        let a = cache.store("same").unwrap();
        let b = cache.store("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_store_is_instrumented() {
        let cache = setup();
        let k1 = cache.store("first").unwrap();
        let k2 = cache.store(2).unwrap();

        assert_eq!(cache.call_count(STORE_IDENTITY).unwrap(), 2);
        let history = cache.history(STORE_IDENTITY).unwrap();
        assert_eq!(history.inputs, vec!["(\"first\",)", "(2,)"]);
        assert_eq!(history.outputs, vec![k1.to_string(), k2.to_string()]);
    }

    #[test]
    fn test_initialize_flushes() {
        let client: Arc<dyn KeyValueClient> = Arc::new(MemoryKvStore::new());
        client.set("stale", b"x").unwrap();
        InstrumentedCache::initialize(client.clone()).unwrap();
        assert!(!client.exists("stale").unwrap());
    }

    #[test]
    fn test_without_flush_keeps_data() {
        let client: Arc<dyn KeyValueClient> = Arc::new(MemoryKvStore::new());
        client.set("kept", b"x").unwrap();
        let cache =
            InstrumentedCache::with_options(client, CacheOptions::default().without_flush())
                .unwrap();
        assert_eq!(cache.get_as_text("kept").unwrap(), Some("x".to_string()));
    }

    #[test]
    fn test_uninstrumented_store_leaves_no_bookkeeping() {
        let client: Arc<dyn KeyValueClient> = Arc::new(MemoryKvStore::new());
        let options = CacheOptions::default().with_instrumentation(InstrumentationMode::Off);
        let cache = InstrumentedCache::with_options(client.clone(), options).unwrap();
        let key = cache.store("v").unwrap();
        assert_eq!(cache.call_count(STORE_IDENTITY).unwrap(), 0);
        assert!(cache.history(STORE_IDENTITY).unwrap().is_empty());
        assert!(client.exists(key.as_str()).unwrap());
    }
}
