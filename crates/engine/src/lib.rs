//! Engine for stashkit
//!
//! This crate composes the client contracts into the user-facing pieces:
//! - InstrumentedCache: random-key value storage with typed reads
//! - Instrumentation: call counting and call history around any operation
//! - ReplayReporter: renders recorded history in call order
//! - schools: one-request helpers over a document collection
//! - StashConfig: `stash.toml` backend and cache settings
//!
//! Nothing here holds global state. Every component receives its store
//! handle explicitly.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cache;
pub mod config;
pub mod instrumentation;
pub mod replay;
pub mod schools;

pub use cache::{CacheOptions, InstrumentedCache, STORE_IDENTITY};
pub use config::{Backend, StashConfig, CONFIG_FILE_NAME};
pub use instrumentation::{
    call_count, render_arguments, CallHistory, Instrumentation, InstrumentationMode, Operation,
};
pub use replay::{ReplayReport, ReplayReporter, ReplayedCall, UNKNOWN_OUTPUT};
pub use schools::{
    insert_school, list_all, schools_by_topic, top_students, update_topics, AVERAGE_SCORE_FIELD,
};
