//! Stashkit - instrumented cache and document helpers over pluggable stores
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use stashkit::{InstrumentedCache, KeyValueClient, MemoryKvStore};
//!
//! let client: Arc<dyn KeyValueClient> = Arc::new(MemoryKvStore::new());
//! let cache = InstrumentedCache::initialize(client)?;
//!
//! let key = cache.store("hello")?;
//! assert_eq!(cache.get_as_text(&key)?, Some("hello".to_string()));
//!
//! print!("{}", cache.reporter().replay("Cache.store")?);
//! // Cache.store was called 1 times:
//! // Cache.store(*("hello",)) -> <key>
//! ```
//!
//! # Architecture
//!
//! - `stashkit-core`: value model, errors, and the two client contracts
//! - `stashkit-storage`: in-memory (and optional Redis) backends
//! - `stashkit-engine`: cache, instrumentation, replay, school helpers, config
//!
//! This crate re-exports the public surface of all three.

pub use stashkit_core::*;
pub use stashkit_engine::*;
pub use stashkit_storage::{MemoryCollection, MemoryKvStore};

#[cfg(feature = "redis")]
pub use stashkit_storage::RedisKvStore;
