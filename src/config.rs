//! Writer configuration
//!
//! Resolution order: defaults, then an overrides bag, then an optional
//! callback, then validation. Bags come from code, TOML or the environment:
//!
//! - `LEDIS_LIST`: list key (default `ledis:log`)
//! - `LEDIS_CAP`: entries kept by a trim (default 65536)
//! - `LEDIS_CYCLE`: writes between trims (default 256)
//! - `LEDIS_STEP`: initial step counter (default 0)
//! - `LEDIS_REDIS_URL` / `REDIS_URL`: server used for lazy connections
//! - `LEDIS_TIMEOUT_MS`: connect/read/write timeout
//! - `LEDIS_CONSOLE_TEE`: echo every line to stdout
//! - `LEDIS_FRAMEWORK_INTEGRATION`: install as the `tracing` destination
//! - `LEDIS_LEVEL`: initial logger level name

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_LIST: &str = "ledis:log";
pub const DEFAULT_CAP: usize = 1 << 16;
pub const DEFAULT_CYCLE: usize = 1 << 8;
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    /// `cycle` of zero would make the rotation modulo undefined
    ZeroCycle,
    /// `cap` of zero would erase every line on rotation
    ZeroCapacity,
    /// Empty list key
    EmptyList,
    /// A value could not be parsed
    InvalidValue { key: String, value: String },
    /// TOML syntax or type error
    Parse(toml::de::Error),
    /// Config file could not be read
    Io(std::io::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ZeroCycle => write!(f, "cycle must be at least 1"),
            ConfigError::ZeroCapacity => write!(f, "cap must be at least 1"),
            ConfigError::EmptyList => write!(f, "list key must not be empty"),
            ConfigError::InvalidValue { key, value } => {
                write!(f, "invalid value for {}: {:?}", key, value)
            }
            ConfigError::Parse(e) => write!(f, "config parse error: {}", e),
            ConfigError::Io(e) => write!(f, "config read error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Parse(e) => Some(e),
            ConfigError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

/// Fully resolved writer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedisConfig {
    /// Redis list key
    pub list: String,
    /// Entries kept by each trim
    pub cap: usize,
    /// Writes between trims
    pub cycle: usize,
    /// Initial step counter, always in `[0, cycle)` once resolved
    pub step: usize,
    /// Server for lazily created connections
    pub redis_url: String,
    /// Connect/read/write timeout in milliseconds
    pub timeout_ms: Option<u64>,
    /// Echo every written line to stdout
    pub console_tee: bool,
    /// Install the writer as the `tracing` destination
    pub framework_integration: bool,
    /// Initial logger level name
    pub level: Option<String>,
}

impl Default for LedisConfig {
    fn default() -> Self {
        LedisConfig {
            list: DEFAULT_LIST.to_string(),
            cap: DEFAULT_CAP,
            cycle: DEFAULT_CYCLE,
            step: 0,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            timeout_ms: None,
            console_tee: false,
            framework_integration: false,
            level: None,
        }
    }
}

impl LedisConfig {
    /// Defaults overlaid with `overrides`, validated
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        Self::resolve_with(overrides, |_| {})
    }

    /// Defaults overlaid with `overrides`, then `callback`, then validated
    pub fn resolve_with<F>(overrides: &ConfigOverrides, callback: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&mut LedisConfig),
    {
        let mut config = LedisConfig::default();
        overrides.apply(&mut config);
        callback(&mut config);
        config.validate()?;
        config.step %= config.cycle;
        debug!(
            list = %config.list,
            cap = config.cap,
            cycle = config.cycle,
            step = config.step,
            "resolved ledis config"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle == 0 {
            return Err(ConfigError::ZeroCycle);
        }
        if self.cap == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.list.is_empty() {
            return Err(ConfigError::EmptyList);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Partial configuration; only fields that are set override the defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub list: Option<String>,
    pub cap: Option<usize>,
    pub cycle: Option<usize>,
    pub step: Option<usize>,
    pub redis_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub console_tee: Option<bool>,
    pub framework_integration: Option<bool>,
    pub level: Option<String>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(mut self, list: impl Into<String>) -> Self {
        self.list = Some(list.into());
        self
    }

    pub fn cap(mut self, cap: usize) -> Self {
        self.cap = Some(cap);
        self
    }

    pub fn cycle(mut self, cycle: usize) -> Self {
        self.cycle = Some(cycle);
        self
    }

    pub fn step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }

    pub fn redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    pub fn console_tee(mut self, enabled: bool) -> Self {
        self.console_tee = Some(enabled);
        self
    }

    pub fn framework_integration(mut self, enabled: bool) -> Self {
        self.framework_integration = Some(enabled);
        self
    }

    pub fn level(mut self, level: impl Into<String>) -> Self {
        self.level = Some(level.into());
        self
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load overrides from `LEDIS_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(ConfigOverrides {
            list: lookup("LEDIS_LIST"),
            cap: parse_var(&lookup, "LEDIS_CAP")?,
            cycle: parse_var(&lookup, "LEDIS_CYCLE")?,
            step: parse_var(&lookup, "LEDIS_STEP")?,
            redis_url: lookup("LEDIS_REDIS_URL").or_else(|| lookup("REDIS_URL")),
            timeout_ms: parse_var(&lookup, "LEDIS_TIMEOUT_MS")?,
            console_tee: lookup("LEDIS_CONSOLE_TEE")
                .map(|v| parse_flag("LEDIS_CONSOLE_TEE", &v))
                .transpose()?,
            framework_integration: lookup("LEDIS_FRAMEWORK_INTEGRATION")
                .map(|v| parse_flag("LEDIS_FRAMEWORK_INTEGRATION", &v))
                .transpose()?,
            level: lookup("LEDIS_LEVEL"),
        })
    }

    /// Layer `other` on top of `self`; fields set in `other` win
    pub fn merge(self, other: ConfigOverrides) -> Self {
        ConfigOverrides {
            list: other.list.or(self.list),
            cap: other.cap.or(self.cap),
            cycle: other.cycle.or(self.cycle),
            step: other.step.or(self.step),
            redis_url: other.redis_url.or(self.redis_url),
            timeout_ms: other.timeout_ms.or(self.timeout_ms),
            console_tee: other.console_tee.or(self.console_tee),
            framework_integration: other.framework_integration.or(self.framework_integration),
            level: other.level.or(self.level),
        }
    }

    pub fn apply(&self, config: &mut LedisConfig) {
        if let Some(list) = &self.list {
            config.list = list.clone();
        }
        if let Some(cap) = self.cap {
            config.cap = cap;
        }
        if let Some(cycle) = self.cycle {
            config.cycle = cycle;
        }
        if let Some(step) = self.step {
            config.step = step;
        }
        if let Some(url) = &self.redis_url {
            config.redis_url = url.clone();
        }
        if self.timeout_ms.is_some() {
            config.timeout_ms = self.timeout_ms;
        }
        if let Some(tee) = self.console_tee {
            config.console_tee = tee;
        }
        if let Some(integration) = self.framework_integration {
            config.framework_integration = integration;
        }
        if self.level.is_some() {
            config.level = self.level.clone();
        }
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
