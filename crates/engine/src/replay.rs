//! Replay of recorded call history
//!
//! ## Output format
//!
//! ```text
//! Cache.store was called 3 times:
//! Cache.store(*("foo",)) -> 13bf32a9-5f5c-4a6d-9b47-7f9e1c3d2e10
//! Cache.store(*("bar",)) -> dcddd00c-4219-4eb5-8d8e-4d3b2a1f0c99
//! Cache.store(*(42,)) -> 5e752f2b-ecd8-4925-a3ce-e2efdee08d20
//! ```
//!
//! An identity without an inputs list renders as a single line,
//! `<identity> was never called.`
//!
//! Replay only reads. The call count is the length of the inputs list; an
//! output missing at some index (the output append failed, or another writer
//! filled the inputs list) renders as `<unknown>`.

use std::fmt;
use std::io;
use std::sync::Arc;

use stashkit_core::{inputs_key, outputs_key, KeyValueClient, Result};
use tracing::debug;

/// Placeholder for an output that was never recorded
pub const UNKNOWN_OUTPUT: &str = "<unknown>";

/// One replayed call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayedCall {
    /// Rendered argument tuple
    pub input: String,
    /// Rendered result, `None` if missing from the outputs list
    pub output: Option<String>,
}

/// Result of replaying one identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayReport {
    /// No inputs list exists for the identity
    NeverCalled {
        /// Identity that was looked up
        identity: String,
    },
    /// Calls in index order
    Called {
        /// Identity that was looked up
        identity: String,
        /// One entry per recorded input
        calls: Vec<ReplayedCall>,
    },
}

impl ReplayReport {
    /// Identity the report is about
    pub fn identity(&self) -> &str {
        match self {
            ReplayReport::NeverCalled { identity } | ReplayReport::Called { identity, .. } => {
                identity
            }
        }
    }

    /// Number of replayed calls
    pub fn call_count(&self) -> usize {
        match self {
            ReplayReport::NeverCalled { .. } => 0,
            ReplayReport::Called { calls, .. } => calls.len(),
        }
    }

    /// Replayed calls (empty when never called)
    pub fn calls(&self) -> &[ReplayedCall] {
        match self {
            ReplayReport::NeverCalled { .. } => &[],
            ReplayReport::Called { calls, .. } => calls,
        }
    }
}

impl fmt::Display for ReplayReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayReport::NeverCalled { identity } => writeln!(f, "{} was never called.", identity),
            ReplayReport::Called { identity, calls } => {
                writeln!(f, "{} was called {} times:", identity, calls.len())?;
                for call in calls {
                    writeln!(
                        f,
                        "{}(*{}) -> {}",
                        identity,
                        call.input,
                        call.output.as_deref().unwrap_or(UNKNOWN_OUTPUT)
                    )?;
                }
                Ok(())
            }
        }
    }
}

/// Reads recorded history back in call order
#[derive(Clone)]
pub struct ReplayReporter {
    client: Arc<dyn KeyValueClient>,
}

impl fmt::Debug for ReplayReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplayReporter").finish_non_exhaustive()
    }
}

impl ReplayReporter {
    /// Create over a client handle
    pub fn new(client: Arc<dyn KeyValueClient>) -> Self {
        Self { client }
    }

    /// Build the report for `identity`
    ///
    /// # Errors
    ///
    /// Store failures propagate. A missing output is not an error.
    pub fn replay(&self, identity: &str) -> Result<ReplayReport> {
        let inputs = inputs_key(identity);
        if !self.client.exists(&inputs)? {
            debug!(target: "stashkit::replay", identity, "No recorded calls");
            return Ok(ReplayReport::NeverCalled {
                identity: identity.to_string(),
            });
        }

        let outputs = outputs_key(identity);
        let n = self.client.list_length(&inputs)?;
        let mut calls = Vec::with_capacity(n as usize);
        for i in 0..n {
            let input = self
                .client
                .read_list_element(&inputs, i)?
                .map(|b| String::from_utf8_lossy(&b).into_owned())
                .unwrap_or_default();
            let output = self
                .client
                .read_list_element(&outputs, i)?
                .map(|b| String::from_utf8_lossy(&b).into_owned());
            calls.push(ReplayedCall { input, output });
        }
        debug!(target: "stashkit::replay", identity, calls = n, "Replayed history");

        Ok(ReplayReport::Called {
            identity: identity.to_string(),
            calls,
        })
    }

    /// Replay `identity` and write the rendered report to `out`
    pub fn write_replay<W: io::Write>(&self, identity: &str, out: &mut W) -> Result<()> {
        let report = self.replay(identity)?;
        write!(out, "{}", report)?;
        Ok(())
    }
}
