//! List Store Abstraction
//!
//! The rotating writer only needs five operations on a named list:
//! push to head, trim to a range, read a range, length and teardown.
//! Index arguments follow Redis semantics: inclusive `stop`, negative
//! indices count back from the tail.
//!
//! Implementations:
//! - `RedisListStore`: real Redis server (LPUSH/LTRIM/LRANGE/LLEN/QUIT)
//! - `InMemoryListStore`: shared in-process lists for tests and embedding
//! - `SimulatedListStore`: fault-injecting wrapper for DST

mod list;
mod memory;
mod redis_store;
mod simulated;

pub use list::LogList;
pub use memory::InMemoryListStore;
pub use redis_store::RedisListStore;
pub use simulated::{SimulatedListStore, SimulatedStoreConfig, SimulatedStoreStats};

use crate::config::LedisConfig;
use std::io::Error as IoError;

/// Error type for list store operations
#[derive(Debug)]
pub enum StoreError {
    /// Could not reach the store, or the connection broke mid-call
    Connection(String),
    /// The call did not complete in time
    Timeout(String),
    /// The store answered with an error reply
    Response(String),
    /// Other I/O error
    Io(IoError),
}

impl StoreError {
    /// Short name of the failure class, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Connection(_) => "ConnectionError",
            StoreError::Timeout(_) => "TimeoutError",
            StoreError::Response(_) => "ResponseError",
            StoreError::Io(_) => "IoError",
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Connection(msg) => write!(f, "connection error: {}", msg),
            StoreError::Timeout(msg) => write!(f, "timed out: {}", msg),
            StoreError::Response(msg) => write!(f, "error reply: {}", msg),
            StoreError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IoError> for StoreError {
    fn from(e: IoError) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                StoreError::Timeout(e.to_string())
            }
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::NotConnected
            | std::io::ErrorKind::BrokenPipe => StoreError::Connection(e.to_string()),
            _ => StoreError::Io(e),
        }
    }
}

/// Synchronous list store used by the rotating writer.
///
/// Every call is one request/response round trip; timeouts are whatever the
/// underlying connection enforces.
pub trait ListStore {
    /// LPUSH: prepend `value`, returning the new length
    fn push_head(&mut self, key: &str, value: &str) -> Result<usize, StoreError>;

    /// LTRIM: keep only `[start, stop]`
    fn trim(&mut self, key: &str, start: isize, stop: isize) -> Result<(), StoreError>;

    /// LRANGE: entries `[start, stop]`, head first
    fn range(&mut self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, StoreError>;

    /// LLEN
    fn len(&mut self, key: &str) -> Result<usize, StoreError>;

    /// Release the connection
    fn close(&mut self) -> Result<(), StoreError>;
}

/// Stores that can build a default connection from configuration, used when
/// the writer has to create one lazily.
pub trait Connect: ListStore + Sized {
    fn connect(config: &LedisConfig) -> Self;
}

impl<S: ListStore + ?Sized> ListStore for Box<S> {
    fn push_head(&mut self, key: &str, value: &str) -> Result<usize, StoreError> {
        (**self).push_head(key, value)
    }

    fn trim(&mut self, key: &str, start: isize, stop: isize) -> Result<(), StoreError> {
        (**self).trim(key, start, stop)
    }

    fn range(&mut self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, StoreError> {
        (**self).range(key, start, stop)
    }

    fn len(&mut self, key: &str) -> Result<usize, StoreError> {
        (**self).len(key)
    }

    fn close(&mut self) -> Result<(), StoreError> {
        (**self).close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;
    use std::io::ErrorKind;

    #[test]
    fn test_io_error_classification() {
        let refused: StoreError = IoError::new(ErrorKind::ConnectionRefused, "refused").into();
        assert_eq!(refused.kind(), "ConnectionError");

        let timed_out: StoreError = IoError::new(ErrorKind::TimedOut, "slow").into();
        assert_eq!(timed_out.kind(), "TimeoutError");

        let other: StoreError = IoError::new(ErrorKind::Other, "disk").into();
        assert_eq!(other.kind(), "IoError");
        assert!(other.source().is_some());
    }

    #[test]
    fn test_display() {
        let err = StoreError::Response("WRONGTYPE".to_string());
        assert_eq!(err.to_string(), "error reply: WRONGTYPE");
        let err = StoreError::Timeout("LPUSH".to_string());
        assert_eq!(err.to_string(), "timed out: LPUSH");
    }

    #[test]
    fn test_boxed_store_forwards() {
        let mut store: Box<dyn ListStore> = Box::new(InMemoryListStore::new());
        assert_eq!(store.push_head("k", "a").unwrap(), 1);
        assert_eq!(store.push_head("k", "b").unwrap(), 2);
        assert_eq!(store.range("k", 0, -1).unwrap(), vec!["b", "a"]);
        store.trim("k", 0, 0).unwrap();
        assert_eq!(store.len("k").unwrap(), 1);
        store.close().unwrap();
    }
}
