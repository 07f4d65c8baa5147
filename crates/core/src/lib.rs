//! Core types and traits for stashkit
//!
//! This crate defines the foundational types used throughout the system:
//! - StoredValue / DecodeStrategy / Decoded: the cache value model
//! - CacheKey, DocumentId: identifiers
//! - Document, FieldPath: the schema-less record model
//! - Error: error type hierarchy
//! - Traits: the KeyValueClient and DocumentStoreClient contracts

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod traits;
pub mod types;
pub mod value;

// Re-export commonly used types and traits
pub use document::{compare_values, into_document, values_equal, Document, FieldPath};
pub use error::{Error, Result};
pub use traits::{DocumentStoreClient, KeyValueClient, UpdateOutcome};
pub use types::{inputs_key, outputs_key, CacheKey, DocumentId, ID_FIELD};
pub use value::{canonical_float, DecodeStrategy, Decoded, StoredValue};
