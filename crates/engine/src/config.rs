//! Configuration via `stash.toml`
//!
//! Selects the key-value backend and the cache options. A missing file is
//! not an error for the CLI: it writes the commented default on first use
//! and reads it back.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stashkit_core::{Error, KeyValueClient, Result};
use stashkit_storage::MemoryKvStore;
use tracing::info;

use crate::cache::CacheOptions;
use crate::instrumentation::InstrumentationMode;

/// Config file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "stash.toml";

/// Default Redis URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1/";

/// Key-value backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Process-local store, lost on exit
    #[default]
    Memory,
    /// Redis server at `redis_url`
    Redis,
}

impl std::str::FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "memory" => Ok(Backend::Memory),
            "redis" => Ok(Backend::Redis),
            other => Err(Error::Config(format!(
                "unknown backend '{}', expected \"memory\" or \"redis\"",
                other
            ))),
        }
    }
}

/// Configuration loaded from `stash.toml`
///
/// # Example
///
/// ```toml
/// backend = "redis"
/// redis_url = "redis://127.0.0.1/"
/// flush_on_init = false
/// instrumentation = "count"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashConfig {
    /// `"memory"` or `"redis"`
    #[serde(default)]
    pub backend: Backend,
    /// Connection URL for the redis backend
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Flush the store when the cache starts
    #[serde(default = "default_flush_on_init")]
    pub flush_on_init: bool,
    /// `"off"`, `"count"`, `"history"` or `"full"`
    #[serde(default)]
    pub instrumentation: InstrumentationMode,
}

fn default_redis_url() -> String {
    DEFAULT_REDIS_URL.to_string()
}

fn default_flush_on_init() -> bool {
    true
}

impl Default for StashConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Memory,
            redis_url: default_redis_url(),
            flush_on_init: default_flush_on_init(),
            instrumentation: InstrumentationMode::Full,
        }
    }
}

impl StashConfig {
    /// Default config file content with comments
    pub fn default_toml() -> &'static str {
        r#"# stashkit configuration
#
# Key-value backend: "memory" (default) or "redis"
#   "memory" = process-local, lost on exit
#   "redis"  = server at redis_url (needs the "redis" feature)
backend = "memory"

redis_url = "redis://127.0.0.1/"

# Flush the whole store when the cache starts (default: true)
flush_on_init = true

# Bookkeeping around Cache.store: "off", "count", "history" or "full"
instrumentation = "full"
"#
    }

    /// Parse config from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Read and parse config from a file path
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Write the default config file if it does not already exist
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Cache options described by this config
    pub fn cache_options(&self) -> CacheOptions {
        CacheOptions {
            flush_on_init: self.flush_on_init,
            instrumentation: self.instrumentation,
        }
    }

    /// Open the configured key-value backend
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for the redis backend when the crate was built
    /// without the `redis` feature, or the connection error otherwise.
    pub fn open_kv(&self) -> Result<Arc<dyn KeyValueClient>> {
        match self.backend {
            Backend::Memory => {
                info!(target: "stashkit::kv", "Opened in-memory store");
                Ok(Arc::new(MemoryKvStore::new()))
            }
            Backend::Redis => open_redis(&self.redis_url),
        }
    }
}

#[cfg(feature = "redis")]
fn open_redis(url: &str) -> Result<Arc<dyn KeyValueClient>> {
    let store = stashkit_storage::RedisKvStore::connect(url)?;
    info!(target: "stashkit::kv", url, "Connected to redis");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis"))]
fn open_redis(url: &str) -> Result<Arc<dyn KeyValueClient>> {
    Err(Error::Config(format!(
        "backend \"redis\" ({}) requires building with the \"redis\" feature",
        url
    )))
}
