//! Log severities
//!
//! Fixed table of the six standard severities. Lookups go both ways:
//! number to severity and case-insensitive name to severity.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Fatal = 4,
    Unknown = 5,
}

const LEVELS: [(&str, Severity); 6] = [
    ("debug", Severity::Debug),
    ("info", Severity::Info),
    ("warn", Severity::Warn),
    ("error", Severity::Error),
    ("fatal", Severity::Fatal),
    ("unknown", Severity::Unknown),
];

/// A level given either by number or by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelSpec {
    Number(i64),
    Name(String),
}

impl From<i64> for LevelSpec {
    fn from(n: i64) -> Self {
        LevelSpec::Number(n)
    }
}

impl From<i32> for LevelSpec {
    fn from(n: i32) -> Self {
        LevelSpec::Number(n.into())
    }
}

impl From<&str> for LevelSpec {
    fn from(name: &str) -> Self {
        LevelSpec::Name(name.to_string())
    }
}

impl From<String> for LevelSpec {
    fn from(name: String) -> Self {
        LevelSpec::Name(name)
    }
}

impl From<Severity> for LevelSpec {
    fn from(severity: Severity) -> Self {
        LevelSpec::Number(severity.as_i64())
    }
}

impl Severity {
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn name(self) -> &'static str {
        LEVELS[self as usize].0
    }

    /// Upper-case label used in formatted lines
    pub fn label(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
            Severity::Unknown => "ANY",
        }
    }

    pub fn from_number(n: i64) -> Option<Self> {
        LEVELS
            .iter()
            .map(|&(_, severity)| severity)
            .find(|severity| severity.as_i64() == n)
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        LEVELS
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|&(_, severity)| severity)
    }

    /// Resolve a number or name. Unknown numbers fall back to the
    /// lowest-numbered level, unknown names to debug.
    pub fn resolve(level: impl Into<LevelSpec>) -> Self {
        match level.into() {
            LevelSpec::Number(n) => Self::from_number(n).unwrap_or(LEVELS[0].1),
            LevelSpec::Name(name) => Self::from_name(&name).unwrap_or(Severity::Debug),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSeverity(pub String);

impl fmt::Display for UnknownSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown severity: {:?}", self.0)
    }
}

impl std::error::Error for UnknownSeverity {}

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::from_name(s).ok_or_else(|| UnknownSeverity(s.to_string()))
    }
}

impl From<Severity> for tracing::Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Debug => tracing::Level::DEBUG,
            Severity::Info => tracing::Level::INFO,
            Severity::Warn => tracing::Level::WARN,
            Severity::Error | Severity::Fatal | Severity::Unknown => tracing::Level::ERROR,
        }
    }
}

impl From<tracing::Level> for Severity {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE | tracing::Level::DEBUG => Severity::Debug,
            tracing::Level::INFO => Severity::Info,
            tracing::Level::WARN => Severity::Warn,
            tracing::Level::ERROR => Severity::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_and_number_agree() {
        assert_eq!(Severity::resolve("warn"), Severity::resolve(2));
        assert_eq!(Severity::resolve("WARN"), Severity::Warn);
        assert_eq!(Severity::resolve("Warn"), Severity::Warn);
        assert_eq!(Severity::resolve(" error "), Severity::Error);
    }

    #[test]
    fn test_unknown_name_falls_back_to_debug() {
        assert_eq!(Severity::resolve("verbose"), Severity::Debug);
        assert_eq!(Severity::resolve(""), Severity::Debug);
    }

    #[test]
    fn test_unknown_number_falls_back_to_lowest() {
        assert_eq!(Severity::resolve(42), Severity::Debug);
        assert_eq!(Severity::resolve(-1), Severity::Debug);
    }

    #[test]
    fn test_table_is_bidirectional() {
        for (name, severity) in LEVELS {
            assert_eq!(Severity::from_name(name), Some(severity));
            assert_eq!(Severity::from_number(severity.as_i64()), Some(severity));
            assert_eq!(severity.name(), name);
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!("fatal".parse::<Severity>(), Ok(Severity::Fatal));
        assert!("loud".parse::<Severity>().is_err());
    }

    #[test]
    fn test_ordering_and_tracing_levels() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Fatal > Severity::Error);
        assert_eq!(tracing::Level::from(Severity::Fatal), tracing::Level::ERROR);
        assert_eq!(Severity::from(tracing::Level::TRACE), Severity::Debug);
    }
}
