//! Logger facade
//!
//! Severity filter and line formatter in front of a shared
//! [`RotatingListWriter`]. The writer's accessors are forwarded one by one.

use crate::config::ConfigError;
use crate::error::Error;
use crate::level::{LevelSpec, Severity};
use crate::store::{Connect, StoreError};
use crate::subscriber::{self, ListMakeWriter};
use crate::writer::{RotatingListWriter, WriteOutcome};
use chrono::{DateTime, Local, TimeZone};
use parking_lot::{Mutex, MutexGuard};
use std::cell::RefCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::SystemTime;

thread_local! {
    // Writers whose lock this thread holds, by allocation address
    static HELD: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// A writer shared between a [`Logger`] and a `tracing` subscriber
pub struct SharedWriter<S: Connect> {
    inner: Arc<Mutex<RotatingListWriter<S>>>,
}

impl<S: Connect> Clone for SharedWriter<S> {
    fn clone(&self) -> Self {
        SharedWriter {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Connect> SharedWriter<S> {
    pub fn new(writer: RotatingListWriter<S>) -> Self {
        SharedWriter {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    pub fn lock(&self) -> WriterGuard<'_, S> {
        let guard = self.inner.lock();
        let id = self.id();
        HELD.with(|held| held.borrow_mut().push(id));
        WriterGuard { guard, id }
    }

    /// True while the current thread holds this writer's lock. Events raised
    /// in that window must not try to lock it again.
    pub fn held_by_current_thread(&self) -> bool {
        let id = self.id();
        HELD.with(|held| held.borrow().contains(&id))
    }
}

/// Lock guard that tracks re-entrancy on the current thread
pub struct WriterGuard<'a, S: Connect> {
    guard: MutexGuard<'a, RotatingListWriter<S>>,
    id: usize,
}

impl<S: Connect> Drop for WriterGuard<'_, S> {
    fn drop(&mut self) {
        HELD.with(|held| {
            let mut held = held.borrow_mut();
            if let Some(pos) = held.iter().rposition(|&id| id == self.id) {
                held.swap_remove(pos);
            }
        });
    }
}

impl<S: Connect> Deref for WriterGuard<'_, S> {
    type Target = RotatingListWriter<S>;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<S: Connect> DerefMut for WriterGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

/// Renders `"<S>, [<datetime>#<pid>] <SEVERITY> : <message>"` with the
/// datetime in local time
#[derive(Debug, Clone, Default)]
pub struct Formatter;

impl Formatter {
    pub fn format(
        &self,
        severity: Severity,
        time: SystemTime,
        progname: Option<&str>,
        message: &str,
    ) -> String {
        let label = severity.label();
        let initial = &label[..1];
        let message = match progname {
            Some(progname) => format!("{}: {}", progname, message),
            None => message.to_string(),
        };
        format!(
            "{}, [{}#{}] {:>5} : {}",
            initial,
            format_datetime(&DateTime::<Local>::from(time)),
            std::process::id(),
            label,
            message
        )
    }
}

/// `YYYY-MM-DDTHH:MM:SS.ffffff` in the timestamp's own zone
pub fn format_datetime<Tz>(time: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    time.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Leveled logger writing formatted lines through a rotating list writer
pub struct Logger<S: Connect> {
    writer: SharedWriter<S>,
    level: Severity,
    progname: Option<String>,
    formatter: Formatter,
}

impl<S: Connect> Logger<S> {
    pub fn new(writer: RotatingListWriter<S>) -> Self {
        let level = writer
            .config()
            .level
            .as_deref()
            .map(Severity::resolve)
            .unwrap_or(Severity::Debug);
        Logger {
            writer: SharedWriter::new(writer),
            level,
            progname: None,
            formatter: Formatter,
        }
    }

    /// Handle to the underlying writer
    pub fn shared_writer(&self) -> SharedWriter<S> {
        self.writer.clone()
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    /// Accepts a severity, its number, or its name in any case
    pub fn set_level(&mut self, level: impl Into<LevelSpec>) {
        self.level = Severity::resolve(level);
    }

    pub fn enabled(&self, severity: Severity) -> bool {
        severity >= self.level
    }

    pub fn progname(&self) -> Option<&str> {
        self.progname.as_deref()
    }

    pub fn set_progname(&mut self, progname: impl Into<String>) {
        self.progname = Some(progname.into());
    }

    /// Format and write `message` if `severity` passes the level filter.
    /// Returns `None` when the line was filtered out.
    pub fn log(&self, severity: Severity, message: &str) -> Option<WriteOutcome> {
        if !self.enabled(severity) {
            return None;
        }
        let line = self.formatter.format(
            severity,
            SystemTime::now(),
            self.progname.as_deref(),
            message,
        );
        Some(self.writer.lock().write(&line))
    }

    pub fn debug(&self, message: &str) -> Option<WriteOutcome> {
        self.log(Severity::Debug, message)
    }

    pub fn info(&self, message: &str) -> Option<WriteOutcome> {
        self.log(Severity::Info, message)
    }

    pub fn warn(&self, message: &str) -> Option<WriteOutcome> {
        self.log(Severity::Warn, message)
    }

    pub fn error(&self, message: &str) -> Option<WriteOutcome> {
        self.log(Severity::Error, message)
    }

    pub fn fatal(&self, message: &str) -> Option<WriteOutcome> {
        self.log(Severity::Fatal, message)
    }

    pub fn unknown(&self, message: &str) -> Option<WriteOutcome> {
        self.log(Severity::Unknown, message)
    }

    /// Write `message` as-is, bypassing level and formatter
    pub fn append(&self, message: &str) -> &Self {
        self.writer.lock().write(message);
        self
    }

    /// Run `f` with the store handle, connecting lazily if needed
    pub fn with_connection<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(self.writer.lock().connection())
    }

    pub fn set_connection(&self, connection: S) {
        self.writer.lock().set_connection(connection);
    }

    pub fn list(&self) -> String {
        self.writer.lock().list().to_string()
    }

    pub fn set_list(&self, list: impl Into<String>) -> Result<(), ConfigError> {
        self.writer.lock().set_list(list)
    }

    pub fn cap(&self) -> usize {
        self.writer.lock().cap()
    }

    pub fn set_cap(&self, cap: usize) -> Result<(), ConfigError> {
        self.writer.lock().set_cap(cap)
    }

    pub fn step(&self) -> usize {
        self.writer.lock().step()
    }

    pub fn set_step(&self, step: usize) {
        self.writer.lock().set_step(step);
    }

    pub fn cycle(&self) -> usize {
        self.writer.lock().cycle()
    }

    pub fn set_cycle(&self, cycle: usize) -> Result<(), ConfigError> {
        self.writer.lock().set_cycle(cycle)
    }

    pub fn tail(&self, n: usize) -> Result<Vec<String>, StoreError> {
        self.writer.lock().tail(n)
    }

    pub fn tail_default(&self) -> Result<Vec<String>, StoreError> {
        self.writer.lock().tail_default()
    }

    pub fn truncate(&self, size: usize) -> Result<(), StoreError> {
        self.writer.lock().truncate(size)
    }

    pub fn size(&self) -> Result<usize, StoreError> {
        self.writer.lock().size()
    }

    pub fn close(&self) {
        self.writer.lock().close();
    }

    /// `MakeWriter` for a `tracing_subscriber::fmt` layer of your own
    pub fn make_writer(&self) -> ListMakeWriter<S> {
        ListMakeWriter::new(self.writer.clone())
    }
}

impl<S: Connect + Send + 'static> Logger<S> {
    /// Route `tracing` events at or above this logger's level to the list.
    /// Fails if a global subscriber is already set.
    pub fn install_subscriber(&self) -> Result<(), Error> {
        subscriber::install(self.writer.clone(), self.level)
    }
}
