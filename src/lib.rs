//! ledis: a log sink that appends lines to a capped Redis list
//!
//! Every write pushes one line to the head of a list. Every `cycle` writes
//! the list is trimmed back to its newest `cap` entries, so the list stays
//! bounded without a trim per write.
//!
//! ```no_run
//! use ledis::{ConfigOverrides, LedisConfig};
//!
//! let config = LedisConfig::resolve(&ConfigOverrides::new().list("app:log").cap(1000))?;
//! let logger = ledis::logger(config)?;
//! logger.info("service started");
//! let recent = logger.tail(10)?;
//! # Ok::<(), ledis::Error>(())
//! ```

pub mod buggify;
pub mod config;
pub mod error;
pub mod level;
pub mod logger;
pub mod store;
pub mod subscriber;
pub mod testing;
pub mod writer;
pub mod writer_dst;

pub use config::{ConfigError, ConfigOverrides, LedisConfig};
pub use error::Error;
pub use level::{LevelSpec, Severity};
pub use logger::{Formatter, Logger, SharedWriter};
pub use store::{
    Connect, InMemoryListStore, ListStore, RedisListStore, SimulatedListStore,
    SimulatedStoreConfig, StoreError,
};
pub use subscriber::ListMakeWriter;
pub use writer::{RotatingListWriter, WriteOutcome, WriteStatus, DEFAULT_TAIL};

/// Crate version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Redis-backed logger for `config`. The connection opens on first use.
/// With `framework_integration` on, `tracing` events are routed to the list
/// as well.
pub fn logger(config: LedisConfig) -> Result<Logger<RedisListStore>, Error> {
    let framework_integration = config.framework_integration;
    let logger = Logger::new(RotatingListWriter::new(config)?);
    if framework_integration {
        logger.install_subscriber()?;
    }
    Ok(logger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(version(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_logger_rejects_invalid_config() {
        let config = LedisConfig {
            cycle: 0,
            ..LedisConfig::default()
        };
        assert!(matches!(logger(config), Err(Error::Config(ConfigError::ZeroCycle))));
    }

    #[test]
    fn test_logger_does_not_connect_eagerly() {
        let logger = logger(LedisConfig::default()).unwrap();
        assert_eq!(logger.list(), config::DEFAULT_LIST);
        assert!(!logger.with_connection(|c| c.is_connected()));
    }
}
