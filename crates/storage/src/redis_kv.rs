//! Redis-protocol key-value backend (feature `redis`)
//!
//! Each contract call maps to exactly one command, so per-call atomicity is
//! whatever the server gives that command:
//!
//! | Contract | Command |
//! |----------|---------|
//! | `set` | `SET` |
//! | `get` | `GET` |
//! | `increment` | `INCR` |
//! | `append_to_list` | `RPUSH` |
//! | `read_list_element` | `LINDEX` |
//! | `list_length` | `LLEN` |
//! | `exists` | `EXISTS` |
//! | `flush_all` | `FLUSHDB` |
//!
//! The synchronous connection needs `&mut`, so it sits behind a mutex.

use parking_lot::Mutex;
use redis::{Connection, ErrorKind, FromRedisValue, RedisError};
use stashkit_core::{Error, KeyValueClient, Result};
use tracing::info;

/// Key-value client backed by a Redis server
pub struct RedisKvStore {
    url: String,
    conn: Mutex<Connection>,
}

impl RedisKvStore {
    /// Connect to `url` (e.g. `redis://127.0.0.1/`)
    ///
    /// # Errors
    ///
    /// Returns `Error::Connection` if the URL is invalid or the server is unreachable.
    pub fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| Error::Connection(e.to_string()))?;
        let conn = client
            .get_connection()
            .map_err(|e| Error::Connection(e.to_string()))?;
        info!(target: "stashkit::kv", url, "Connected to Redis");
        Ok(Self {
            url: url.to_string(),
            conn: Mutex::new(conn),
        })
    }

    /// URL this store connected to
    pub fn url(&self) -> &str {
        &self.url
    }

    fn query<T: FromRedisValue>(&self, key: &str, cmd: &mut redis::Cmd) -> Result<T> {
        let mut conn = self.conn.lock();
        cmd.query(&mut *conn).map_err(|e| map_error(key, e))
    }
}

fn map_error(key: &str, e: RedisError) -> Error {
    match e.kind() {
        ErrorKind::TypeError => Error::wrong_type(key, "matching type"),
        ErrorKind::ExtensionError if e.code() == Some("WRONGTYPE") => Error::wrong_type(key, "matching type"),
        ErrorKind::IoError => Error::Connection(e.to_string()),
        _ if e.is_connection_dropped() || e.is_connection_refusal() => Error::Connection(e.to_string()),
        _ if e.code() == Some("WRONGTYPE") => Error::wrong_type(key, "matching type"),
        _ => Error::Backend(e.to_string()),
    }
}

impl KeyValueClient for RedisKvStore {
    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.query(key, redis::cmd("SET").arg(key).arg(value))
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.query(key, redis::cmd("GET").arg(key))
    }

    fn increment(&self, key: &str) -> Result<i64> {
        self.query(key, redis::cmd("INCR").arg(key))
    }

    fn append_to_list(&self, key: &str, value: &[u8]) -> Result<u64> {
        self.query(key, redis::cmd("RPUSH").arg(key).arg(value))
    }

    fn read_list_element(&self, key: &str, index: u64) -> Result<Option<Vec<u8>>> {
        let index = i64::try_from(index)
            .map_err(|_| Error::Backend(format!("list index {} out of range", index)))?;
        self.query(key, redis::cmd("LINDEX").arg(key).arg(index))
    }

    fn list_length(&self, key: &str) -> Result<u64> {
        self.query(key, redis::cmd("LLEN").arg(key))
    }

    fn exists(&self, key: &str) -> Result<bool> {
        self.query(key, redis::cmd("EXISTS").arg(key))
    }

    fn flush_all(&self) -> Result<()> {
        self.query::<()>("*", &mut redis::cmd("FLUSHDB"))?;
        info!(target: "stashkit::kv", url = %self.url, "Flushed Redis database");
        Ok(())
    }
}
