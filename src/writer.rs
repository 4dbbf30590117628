//! Rotating list writer
//!
//! Appends lines to the head of a list and caps the list every `cycle`
//! writes. Write failures never propagate: the line and the error go to a
//! diagnostic sink (stderr) instead. Trim failures are dropped silently so
//! a broken store does not produce a second diagnostic per write.
//!
//! Only `configure` emits a `tracing` event. Writes, read-backs, truncation
//! and close stay silent, so a writer can be the destination of a `tracing`
//! subscriber without feeding itself.

use crate::config::{ConfigError, ConfigOverrides, LedisConfig};
use crate::store::{Connect, ListStore, RedisListStore, StoreError};
use std::io::Write;
use tracing::info;

/// Number of lines returned by `tail_default`
pub const DEFAULT_TAIL: usize = 1024;

/// What happened to the pushed line
#[derive(Debug)]
pub enum WriteStatus {
    /// Line stored; list length after the push
    Stored { len: usize },
    /// Push failed; the line went to the diagnostic sink
    TransportError(StoreError),
}

/// Result of one `write` call
#[derive(Debug)]
pub struct WriteOutcome {
    pub status: WriteStatus,
    /// A rotation trim was attempted (its own result is not reported)
    pub trimmed: bool,
}

impl WriteOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self.status, WriteStatus::Stored { .. })
    }
}

/// Log device writing to a capped remote list
pub struct RotatingListWriter<S: ListStore = RedisListStore> {
    connection: Option<S>,
    config: LedisConfig,
    step: usize,
    diagnostics: Box<dyn Write + Send>,
    console: Box<dyn Write + Send>,
}

impl<S: ListStore> std::fmt::Debug for RotatingListWriter<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingListWriter")
            .field("list", &self.config.list)
            .field("cap", &self.config.cap)
            .field("cycle", &self.config.cycle)
            .field("step", &self.step)
            .field("connected", &self.connection.is_some())
            .finish()
    }
}

impl<S: Connect> RotatingListWriter<S> {
    /// Writer that connects lazily on first use
    pub fn new(config: LedisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let step = config.step % config.cycle;
        Ok(RotatingListWriter {
            connection: None,
            config,
            step,
            diagnostics: Box::new(std::io::stderr()),
            console: Box::new(std::io::stdout()),
        })
    }

    /// Writer using an existing connection
    pub fn with_connection(connection: S, config: LedisConfig) -> Result<Self, ConfigError> {
        let mut writer = Self::new(config)?;
        writer.connection = Some(connection);
        Ok(writer)
    }

    /// Resolve `overrides` on top of the defaults and build a writer
    pub fn from_overrides(
        connection: Option<S>,
        overrides: &ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let config = LedisConfig::resolve(overrides)?;
        match connection {
            Some(connection) => Self::with_connection(connection, config),
            None => Self::new(config),
        }
    }

    /// Redirect diagnostics (stderr by default)
    pub fn with_diagnostics(mut self, sink: impl Write + Send + 'static) -> Self {
        self.diagnostics = Box::new(sink);
        self
    }

    /// Redirect the console tee (stdout by default)
    pub fn with_console(mut self, sink: impl Write + Send + 'static) -> Self {
        self.console = Box::new(sink);
        self
    }

    /// Re-resolve the configuration from defaults. The connection is kept
    /// and the step counter is taken from the new configuration.
    pub fn configure(&mut self, overrides: &ConfigOverrides) -> Result<(), ConfigError> {
        self.configure_with(overrides, |_| {})
    }

    pub fn configure_with<F>(&mut self, overrides: &ConfigOverrides, callback: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut LedisConfig),
    {
        let config = LedisConfig::resolve_with(overrides, callback)?;
        self.step = config.step;
        self.config = config;
        info!(list = %self.config.list, "ledis writer reconfigured");
        Ok(())
    }

    pub fn config(&self) -> &LedisConfig {
        &self.config
    }

    /// The store handle, created from the configuration if none was set
    pub fn connection(&mut self) -> &mut S {
        let config = &self.config;
        self.connection.get_or_insert_with(|| S::connect(config))
    }

    pub fn set_connection(&mut self, connection: S) {
        self.connection = Some(connection);
    }

    /// Detach the store handle without closing it
    pub fn take_connection(&mut self) -> Option<S> {
        self.connection.take()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn list(&self) -> &str {
        &self.config.list
    }

    pub fn set_list(&mut self, list: impl Into<String>) -> Result<(), ConfigError> {
        let list = list.into();
        if list.is_empty() {
            return Err(ConfigError::EmptyList);
        }
        self.config.list = list;
        Ok(())
    }

    pub fn cap(&self) -> usize {
        self.config.cap
    }

    pub fn set_cap(&mut self, cap: usize) -> Result<(), ConfigError> {
        if cap == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        self.config.cap = cap;
        Ok(())
    }

    pub fn cycle(&self) -> usize {
        self.config.cycle
    }

    /// Change the cycle length; the step counter is wrapped into range
    pub fn set_cycle(&mut self, cycle: usize) -> Result<(), ConfigError> {
        if cycle == 0 {
            return Err(ConfigError::ZeroCycle);
        }
        self.config.cycle = cycle;
        self.step %= cycle;
        Ok(())
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Set the step counter, wrapped modulo the cycle length
    pub fn set_step(&mut self, step: usize) {
        self.step = step % self.config.cycle;
    }

    pub fn console_tee(&self) -> bool {
        self.config.console_tee
    }

    pub fn set_console_tee(&mut self, enabled: bool) {
        self.config.console_tee = enabled;
    }

    /// Push `message` to the list head and rotate when a cycle completes.
    pub fn write(&mut self, message: &str) -> WriteOutcome {
        if self.config.console_tee {
            let _ = writeln!(self.console, "{}", message);
        }

        let list = self.config.list.clone();
        let status = match self.connection().push_head(&list, message) {
            Ok(len) => WriteStatus::Stored { len },
            Err(e) => {
                self.report(&e, message);
                WriteStatus::TransportError(e)
            }
        };

        let trimmed = self.advance();
        if trimmed {
            let cap = self.config.cap;
            let _ = self.trim_to(&list, cap);
        }

        WriteOutcome { status, trimmed }
    }

    /// Advance the step counter; true when this write closes a cycle.
    fn advance(&mut self) -> bool {
        self.step = (self.step + 1) % self.config.cycle;
        self.step == 0
    }

    fn report(&mut self, error: &StoreError, message: &str) {
        use std::error::Error as _;

        let mut text = format!("{} ({})", error, error.kind());
        let mut source = error.source();
        while let Some(cause) = source {
            text.push('\n');
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        let _ = writeln!(self.diagnostics, "{}", text);
        let _ = writeln!(self.diagnostics, "{}", message);
        let _ = self.diagnostics.flush();
    }

    fn trim_to(&mut self, list: &str, size: usize) -> Result<(), StoreError> {
        // LTRIM 0 -1 keeps everything, so an empty keep-range is 1..0
        let (start, stop) = match size {
            0 => (1, 0),
            n => (0, last_index(n)),
        };
        self.connection().trim(list, start, stop)
    }

    /// Up to `n` most recent lines, oldest first.
    pub fn tail(&mut self, n: usize) -> Result<Vec<String>, StoreError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let list = self.config.list.clone();
        let mut lines = self.connection().range(&list, 0, last_index(n))?;
        lines.reverse();
        Ok(lines)
    }

    pub fn tail_default(&mut self) -> Result<Vec<String>, StoreError> {
        self.tail(DEFAULT_TAIL)
    }

    /// Keep only the `size` most recent lines
    pub fn truncate(&mut self, size: usize) -> Result<(), StoreError> {
        let list = self.config.list.clone();
        self.trim_to(&list, size)
    }

    /// Current list length
    pub fn size(&mut self) -> Result<usize, StoreError> {
        let list = self.config.list.clone();
        self.connection().len(&list)
    }

    /// Release the connection; errors are ignored. The handle is kept, and
    /// reconnects on the next call.
    pub fn close(&mut self) {
        if let Some(connection) = self.connection.as_mut() {
            let _ = connection.close();
        }
    }
}

/// Inclusive stop index for the first `n` entries, `n > 0`. Counts beyond
/// `isize::MAX` saturate; a negative stop would count from the tail instead.
fn last_index(n: usize) -> isize {
    isize::try_from(n).unwrap_or(isize::MAX) - 1
}
