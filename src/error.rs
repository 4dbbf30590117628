//! Crate-level error type

use crate::config::ConfigError;
use crate::store::StoreError;

#[derive(Debug)]
pub enum Error {
    /// Invalid or unreadable configuration
    Config(ConfigError),
    /// A read-back or maintenance call failed at the store
    Store(StoreError),
    /// A global `tracing` subscriber could not be installed
    Subscriber(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "configuration error: {}", e),
            Error::Store(e) => write!(f, "store error: {}", e),
            Error::Subscriber(msg) => write!(f, "subscriber error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => Some(e),
            Error::Store(e) => Some(e),
            Error::Subscriber(_) => None,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        Error::Store(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_conversions_keep_source() {
        let err: Error = ConfigError::ZeroCycle.into();
        assert!(matches!(err, Error::Config(ConfigError::ZeroCycle)));
        assert!(err.source().is_some());

        let err: Error = StoreError::Timeout("LPUSH".to_string()).into();
        assert!(err.to_string().starts_with("store error: "));

        let err = Error::Subscriber("already set".to_string());
        assert!(err.source().is_none());
    }
}
