//! Call counting and call history around arbitrary operations
//!
//! An [`Operation`] bundles an identity, its rendered arguments and the
//! closure that performs the call. [`Instrumentation::run`] executes it
//! between the bookkeeping steps:
//!
//! 1. `INCR <identity>` (before invoking, so failed calls are counted)
//! 2. invoke
//! 3. `RPUSH <identity>:inputs <arguments>` then
//!    `RPUSH <identity>:outputs <result>` (or `<error: message>` on failure),
//!    both under the history lock
//!
//! The history lock is shared by every clone of an [`Instrumentation`], so
//! concurrent runs through one instance keep position *i* of both lists
//! pointing at the same call. Separate instances over the same store do not
//! share the lock. The sequence is not transactional: a store failure between
//! steps can leave the counter and the lists out of step.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use stashkit_core::{inputs_key, outputs_key, DecodeStrategy, Error, KeyValueClient, Result};
use tracing::{debug, warn};

/// Which bookkeeping steps run around an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum InstrumentationMode {
    /// Invoke only
    #[serde(rename = "off")]
    Off,
    /// Increment the invocation counter
    #[serde(rename = "count")]
    CountOnly,
    /// Record inputs and outputs
    #[serde(rename = "history")]
    HistoryOnly,
    /// Counter and history
    #[default]
    #[serde(rename = "full")]
    Full,
}

impl InstrumentationMode {
    /// True when the counter is incremented
    pub fn counts_calls(&self) -> bool {
        matches!(self, InstrumentationMode::CountOnly | InstrumentationMode::Full)
    }

    /// True when inputs and outputs are recorded
    pub fn records_history(&self) -> bool {
        matches!(self, InstrumentationMode::HistoryOnly | InstrumentationMode::Full)
    }

    /// Name used in `stash.toml` and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            InstrumentationMode::Off => "off",
            InstrumentationMode::CountOnly => "count",
            InstrumentationMode::HistoryOnly => "history",
            InstrumentationMode::Full => "full",
        }
    }
}

impl FromStr for InstrumentationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "off" => Ok(InstrumentationMode::Off),
            "count" => Ok(InstrumentationMode::CountOnly),
            "history" => Ok(InstrumentationMode::HistoryOnly),
            "full" => Ok(InstrumentationMode::Full),
            other => Err(Error::Config(format!(
                "unknown instrumentation mode '{}', expected off, count, history or full",
                other
            ))),
        }
    }
}

impl fmt::Display for InstrumentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Render positional arguments as a tuple literal
///
/// `[]` becomes `()`, a single argument keeps its trailing comma (`("a",)`),
/// and several are joined with `", "`.
pub fn render_arguments(arguments: &[String]) -> String {
    match arguments {
        [] => "()".to_string(),
        [only] => format!("({},)", only),
        many => format!("({})", many.join(", ")),
    }
}

/// One call to be run under instrumentation
pub struct Operation<F> {
    identity: String,
    arguments: Vec<String>,
    invoke: F,
}

impl<F> Operation<F> {
    /// Operation with no arguments
    pub fn new(identity: impl Into<String>, invoke: F) -> Self {
        Self {
            identity: identity.into(),
            arguments: Vec::new(),
            invoke,
        }
    }

    /// Add one positional argument, already rendered
    pub fn arg(mut self, rendered: impl Into<String>) -> Self {
        self.arguments.push(rendered.into());
        self
    }

    /// Fully-qualified identity, e.g. `Cache.store`
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Rendered arguments in call order
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }
}

impl<F> fmt::Debug for Operation<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("identity", &self.identity)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

/// Runs operations with counting and history recording
///
/// Clones share the same store and the same history lock.
#[derive(Clone)]
pub struct Instrumentation {
    client: Arc<dyn KeyValueClient>,
    mode: InstrumentationMode,
    history_lock: Arc<Mutex<()>>,
}

impl fmt::Debug for Instrumentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instrumentation")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Instrumentation {
    /// Create over a client handle
    pub fn new(client: Arc<dyn KeyValueClient>, mode: InstrumentationMode) -> Self {
        Self {
            client,
            mode,
            history_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Active mode
    pub fn mode(&self) -> InstrumentationMode {
        self.mode
    }

    /// Invoke `op` with the bookkeeping selected by the mode
    ///
    /// The result is recorded through its `Display` form. A failed invocation
    /// records `<error: message>` as its output and returns the original
    /// error.
    ///
    /// # Errors
    ///
    /// Store failures during bookkeeping propagate immediately, before or
    /// after the invocation depending on which step failed.
    pub fn run<T, F>(&self, op: Operation<F>) -> Result<T>
    where
        T: fmt::Display,
        F: FnOnce() -> Result<T>,
    {
        let Operation {
            identity,
            arguments,
            invoke,
        } = op;

        if self.mode.counts_calls() {
            let n = self.client.increment(&identity)?;
            debug!(target: "stashkit::instrument", identity = %identity, calls = n, "Counted call");
        }

        let outcome = invoke();

        if self.mode.records_history() {
            let input = render_arguments(&arguments);
            let output = match &outcome {
                Ok(value) => value.to_string(),
                Err(e) => {
                    warn!(target: "stashkit::instrument", identity = %identity, error = %e, "Recorded failed call");
                    format!("<error: {}>", e)
                }
            };
            let _guard = self.history_lock.lock();
            self.client
                .append_to_list(&inputs_key(&identity), input.as_bytes())?;
            self.client
                .append_to_list(&outputs_key(&identity), output.as_bytes())?;
        }

        outcome
    }

    /// Current counter for `identity` (0 when never counted)
    pub fn call_count(&self, identity: &str) -> Result<u64> {
        call_count(self.client.as_ref(), identity)
    }

    /// Recorded history for `identity`
    pub fn history(&self, identity: &str) -> Result<CallHistory> {
        CallHistory::load(self.client.as_ref(), identity)
    }
}

/// Read the invocation counter for `identity`
///
/// # Errors
///
/// Returns `Error::Decode` if the key holds something other than a
/// non-negative integer.
pub fn call_count(client: &dyn KeyValueClient, identity: &str) -> Result<u64> {
    match client.get(identity)? {
        None => Ok(0),
        Some(bytes) => {
            let n = DecodeStrategy::Integer
                .decode(identity, bytes)?
                .as_int()
                .unwrap_or_default();
            u64::try_from(n).map_err(|e| Error::decode(identity, "counter", e))
        }
    }
}

/// Inputs and outputs recorded for one identity, index-aligned
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallHistory {
    /// Identity the history belongs to
    pub identity: String,
    /// Rendered argument tuples in call order
    pub inputs: Vec<String>,
    /// Rendered results in call order
    pub outputs: Vec<String>,
}

impl CallHistory {
    /// Read both lists for `identity` (bytes decoded as lossy UTF-8)
    pub fn load(client: &dyn KeyValueClient, identity: &str) -> Result<Self> {
        Ok(Self {
            identity: identity.to_string(),
            inputs: read_list(client, &inputs_key(identity))?,
            outputs: read_list(client, &outputs_key(identity))?,
        })
    }

    /// Number of recorded calls (length of the inputs list)
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// True when no call was recorded
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// `(input, output)` pairs; the output is `None` if it was never written
    pub fn calls(&self) -> impl Iterator<Item = (&str, Option<&str>)> + '_ {
        self.inputs
            .iter()
            .enumerate()
            .map(|(i, input)| (input.as_str(), self.outputs.get(i).map(String::as_str)))
    }
}

fn read_list(client: &dyn KeyValueClient, key: &str) -> Result<Vec<String>> {
    let len = client.list_length(key)?;
    let mut out = Vec::with_capacity(len as usize);
    for i in 0..len {
        match client.read_list_element(key, i)? {
            Some(bytes) => out.push(String::from_utf8_lossy(&bytes).into_owned()),
            None => break,
        }
    }
    Ok(out)
}
