//! `tracing` integration
//!
//! [`ListMakeWriter`] lets a `tracing_subscriber::fmt` layer use a rotating
//! list writer as its output. Each event is buffered and stored as one list
//! entry when the per-event writer drops.
//!
//! Events raised while the current thread already holds this writer's lock
//! (for instance the `debug!` emitted while `configure` resolves a new
//! configuration) cannot be written to the list and are discarded. Locks on
//! other writers do not matter.

use crate::error::Error;
use crate::level::Severity;
use crate::logger::SharedWriter;
use crate::store::Connect;
use std::io::{self, Write};
use tracing_subscriber::fmt::MakeWriter;

pub struct ListMakeWriter<S: Connect> {
    writer: SharedWriter<S>,
}

impl<S: Connect> Clone for ListMakeWriter<S> {
    fn clone(&self) -> Self {
        ListMakeWriter {
            writer: self.writer.clone(),
        }
    }
}

impl<S: Connect> ListMakeWriter<S> {
    pub fn new(writer: SharedWriter<S>) -> Self {
        ListMakeWriter { writer }
    }
}

impl<'a, S: Connect + 'a> MakeWriter<'a> for ListMakeWriter<S> {
    type Writer = LineWriter<S>;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter {
            writer: self.writer.clone(),
            buf: Vec::new(),
        }
    }
}

/// Per-event writer; flushes its line on drop
pub struct LineWriter<S: Connect> {
    writer: SharedWriter<S>,
    buf: Vec<u8>,
}

impl<S: Connect> Write for LineWriter<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: Connect> Drop for LineWriter<S> {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        if self.writer.held_by_current_thread() {
            return;
        }
        let text = String::from_utf8_lossy(&self.buf);
        let line = text.trim_end_matches(['\n', '\r']);
        self.writer.lock().write(line);
    }
}

/// Install a global `fmt` subscriber writing through `writer`
pub fn install<S>(writer: SharedWriter<S>, level: Severity) -> Result<(), Error>
where
    S: Connect + Send + 'static,
{
    tracing_subscriber::fmt()
        .with_writer(ListMakeWriter::new(writer))
        .with_ansi(false)
        .with_max_level(tracing::Level::from(level))
        .try_init()
        .map_err(|e| Error::Subscriber(e.to_string()))
}
