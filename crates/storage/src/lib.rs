//! Storage backends for stashkit
//!
//! This crate implements the client contracts from `stashkit-core`:
//! - `MemoryKvStore`: DashMap-backed key-value store with lists and counters
//! - `RedisKvStore`: the same contract over a Redis connection (feature `redis`)
//! - `MemoryCollection`: schema-less document collection
//!
//! The collection understands the subset of the document query language the
//! engine needs: equality and comparison filters (`query`), operator updates
//! (`update`), and aggregation pipelines (`pipeline`).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collection;
pub mod memory_kv;
pub mod pipeline;
pub mod query;
#[cfg(feature = "redis")]
pub mod redis_kv;
pub mod update;

pub use collection::MemoryCollection;
pub use memory_kv::{MemoryKvStore, Slot};
pub use pipeline::{Accumulator, Direction, Expr, Pipeline, Projection, Stage};
pub use query::{Condition, Filter};
#[cfg(feature = "redis")]
pub use redis_kv::RedisKvStore;
pub use update::{Change, Update};
