//! Error types for stashkit
//!
//! This module defines the error type shared by every crate in the workspace.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! A missing key is NOT an error: reads return `Ok(None)` for absent keys.

use std::io;
use thiserror::Error;

/// Result type alias for stashkit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for stashkit
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (config files, terminal)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The store could not be reached or dropped the connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// The store rejected or failed a command
    #[error("Backend error: {0}")]
    Backend(String),

    /// Operation against a key holding the wrong kind of value
    #[error("Wrong type for key '{key}': expected {expected}")]
    WrongType {
        /// Key the operation targeted
        key: String,
        /// Kind of value the operation needs
        expected: &'static str,
    },

    /// Stored bytes could not be decoded as requested
    #[error("Cannot decode value at '{key}' as {expected}: {reason}")]
    Decode {
        /// Key that was read
        key: String,
        /// Requested representation
        expected: &'static str,
        /// Underlying parse failure
        reason: String,
    },

    /// Malformed query filter
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Malformed update document
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    /// Malformed aggregation pipeline
    #[error("Invalid pipeline: {0}")]
    InvalidPipeline(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid or unreadable configuration
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Build a decode error for `key`
    pub fn decode(key: impl Into<String>, expected: &'static str, reason: impl ToString) -> Self {
        Error::Decode {
            key: key.into(),
            expected,
            reason: reason.to_string(),
        }
    }

    /// Build a wrong-type error for `key`
    pub fn wrong_type(key: impl Into<String>, expected: &'static str) -> Self {
        Error::WrongType {
            key: key.into(),
            expected,
        }
    }

    /// True for failures that come from the store itself rather than the caller
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Backend(_) | Error::Io(_))
    }
}
