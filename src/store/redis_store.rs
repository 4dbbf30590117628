//! Redis-backed list store
//!
//! Holds a URL and connects on first use. A call that fails with a broken
//! connection drops it, and the next call reconnects, the way Redis client
//! libraries recover from a server restart. Connecting happens on the write
//! path, so neither connecting nor closing emits `tracing` events.

use super::{Connect, ListStore, StoreError};
use crate::config::LedisConfig;
use redis::{Client, Connection, RedisError};
use std::time::Duration;

impl From<RedisError> for StoreError {
    fn from(e: RedisError) -> Self {
        if e.is_timeout() {
            StoreError::Timeout(e.to_string())
        } else if e.is_connection_refusal() || e.is_connection_dropped() || e.is_io_error() {
            StoreError::Connection(e.to_string())
        } else {
            StoreError::Response(e.to_string())
        }
    }
}

/// List store talking to a Redis server over a blocking connection
pub struct RedisListStore {
    url: String,
    timeout: Option<Duration>,
    client: Option<Client>,
    conn: Option<Connection>,
}

impl std::fmt::Debug for RedisListStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisListStore")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .field("connected", &self.conn.is_some())
            .finish()
    }
}

impl RedisListStore {
    /// Build a store for `url`; no I/O happens until the first command.
    pub fn new(url: impl Into<String>) -> Self {
        RedisListStore {
            url: url.into(),
            timeout: None,
            client: None,
            conn: None,
        }
    }

    /// Connect and read/write timeout; `None` leaves the client defaults
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn connection(&mut self) -> Result<&mut Connection, StoreError> {
        if self.conn.is_none() {
            let client = match self.client.take() {
                Some(client) => client,
                None => Client::open(self.url.as_str())?,
            };
            let conn = match self.timeout {
                Some(timeout) => {
                    let conn = client.get_connection_with_timeout(timeout)?;
                    conn.set_read_timeout(Some(timeout))?;
                    conn.set_write_timeout(Some(timeout))?;
                    conn
                }
                None => client.get_connection()?,
            };
            self.client = Some(client);
            self.conn = Some(conn);
        }
        self.conn
            .as_mut()
            .ok_or_else(|| StoreError::Connection("no connection".to_string()))
    }

    /// Run one command, dropping the connection if it broke.
    fn run<T: redis::FromRedisValue>(&mut self, cmd: &redis::Cmd) -> Result<T, StoreError> {
        let result = cmd.query::<T>(self.connection()?);
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                let err = StoreError::from(e);
                if matches!(err, StoreError::Connection(_) | StoreError::Timeout(_)) {
                    self.conn = None;
                }
                Err(err)
            }
        }
    }
}

impl ListStore for RedisListStore {
    fn push_head(&mut self, key: &str, value: &str) -> Result<usize, StoreError> {
        self.run(redis::cmd("LPUSH").arg(key).arg(value))
    }

    fn trim(&mut self, key: &str, start: isize, stop: isize) -> Result<(), StoreError> {
        self.run(redis::cmd("LTRIM").arg(key).arg(start).arg(stop))
    }

    fn range(&mut self, key: &str, start: isize, stop: isize) -> Result<Vec<String>, StoreError> {
        self.run(redis::cmd("LRANGE").arg(key).arg(start).arg(stop))
    }

    fn len(&mut self, key: &str) -> Result<usize, StoreError> {
        self.run(redis::cmd("LLEN").arg(key))
    }

    fn close(&mut self) -> Result<(), StoreError> {
        let Some(mut conn) = self.conn.take() else {
            return Ok(());
        };
        redis::cmd("QUIT").query::<()>(&mut conn)?;
        Ok(())
    }
}

impl Connect for RedisListStore {
    fn connect(config: &LedisConfig) -> Self {
        RedisListStore::new(config.redis_url.clone()).with_timeout(config.timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_does_not_connect() {
        let store = RedisListStore::new("redis://127.0.0.1:6379");
        assert!(!store.is_connected());
        assert_eq!(store.url(), "redis://127.0.0.1:6379");
    }

    #[test]
    fn test_connect_uses_config() {
        let mut config = LedisConfig::default();
        config.redis_url = "redis://10.0.0.5:6380/2".to_string();
        config.timeout_ms = Some(250);

        let store = RedisListStore::connect(&config);
        assert_eq!(store.url(), "redis://10.0.0.5:6380/2");
        assert_eq!(store.timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_bad_url_is_a_store_error() {
        let mut store = RedisListStore::new("not a url");
        assert!(store.push_head("log", "line").is_err());
        assert!(!store.is_connected());
    }

    #[test]
    fn test_close_without_connection_is_ok() {
        let mut store = RedisListStore::new("redis://127.0.0.1:6379");
        assert!(store.close().is_ok());
    }

    #[test]
    fn test_failed_connect_and_close_emit_no_events() {
        let events = crate::testing::SharedBuffer::new();
        let sink = events.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut store = RedisListStore::new("not a url");
            assert!(store.push_head("log", "line").is_err());
            assert!(store.close().is_ok());
        });

        assert_eq!(events.contents(), "");
    }
}
