//! Session wrapper around one cache.
//!
//! Holds the `InstrumentedCache` and a `ReplayReporter` over the same
//! store handle, and turns each `Request` into an `Output`.

use stashkit_core::{CacheKey, Decoded, Result};
use stashkit_engine::{InstrumentedCache, ReplayReport, ReplayReporter};
use tracing::info;

use crate::parse::Request;

/// Result of one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Key(CacheKey),
    Value(Option<Decoded>),
    Count { identity: String, count: u64 },
    Replay(ReplayReport),
    Flushed,
}

/// Wraps the cache handles for the lifetime of the process.
pub struct SessionState {
    cache: InstrumentedCache,
    reporter: ReplayReporter,
    backend: String,
}

impl SessionState {
    /// Create a session over an initialized cache.
    pub fn new(cache: InstrumentedCache, backend: impl Into<String>) -> Self {
        let reporter = cache.reporter();
        Self {
            cache,
            reporter,
            backend: backend.into(),
        }
    }

    /// Execute a request.
    pub fn execute(&mut self, request: Request) -> Result<Output> {
        match request {
            Request::Store(value) => self.cache.store(value).map(Output::Key),
            Request::Get { key, strategy } => self.cache.get(&key, strategy).map(Output::Value),
            Request::Count { identity } => {
                let count = self.cache.call_count(&identity)?;
                Ok(Output::Count { identity, count })
            }
            Request::Replay { identity } => self.reporter.replay(&identity).map(Output::Replay),
            Request::Flush => {
                self.cache.client().flush_all()?;
                info!(target: "stashkit::cache", backend = %self.backend, "Flushed store from CLI");
                Ok(Output::Flushed)
            }
        }
    }

    /// Generate the REPL prompt string.
    pub fn prompt(&self) -> String {
        format!("stash:{}> ", self.backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stashkit_core::{DecodeStrategy, StoredValue};
    use stashkit_engine::StashConfig;

    fn setup() -> SessionState {
        let config = StashConfig::default();
        let cache = InstrumentedCache::with_options(config.open_kv().unwrap(), config.cache_options())
            .unwrap();
        SessionState::new(cache, "memory")
    }

    #[test]
    fn test_store_then_get() {
        let mut state = setup();
        let key = match state
            .execute(Request::Store(StoredValue::Text("hello".into())))
            .unwrap()
        {
            Output::Key(k) => k,
            other => panic!("unexpected output {:?}", other),
        };
        let out = state
            .execute(Request::Get {
                key: key.to_string(),
                strategy: DecodeStrategy::Text,
            })
            .unwrap();
        assert_eq!(out, Output::Value(Some(Decoded::Text("hello".into()))));
    }

    #[test]
    fn test_count_and_flush() {
        let mut state = setup();
        state.execute(Request::Store(StoredValue::Int(1))).unwrap();
        let out = state
            .execute(Request::Count {
                identity: "Cache.store".into(),
            })
            .unwrap();
        assert_eq!(
            out,
            Output::Count {
                identity: "Cache.store".into(),
                count: 1
            }
        );

        assert_eq!(state.execute(Request::Flush).unwrap(), Output::Flushed);
        let out = state
            .execute(Request::Replay {
                identity: "Cache.store".into(),
            })
            .unwrap();
        assert!(matches!(out, Output::Replay(ReplayReport::NeverCalled { .. })));
    }

    #[test]
    fn test_prompt_names_backend() {
        assert_eq!(setup().prompt(), "stash:memory> ");
    }
}
