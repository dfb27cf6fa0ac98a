//! # Diagnostic Sinks
//!
//! Stages report progress and failures through a [`DiagnosticSink`] handed to
//! them by the caller. The binaries pass a [`TracingSink`]; tests pass a
//! [`MemorySink`] and assert on what was recorded.

use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tracing::Level;

use super::logrecord::LogRecord;

/// Receiver for stage diagnostics.
///
/// Only [`DiagnosticSink::log`] is required; the level helpers mirror the
/// `info/warn/error(message, extras)` shape used throughout the pipeline.
pub trait DiagnosticSink: Send + Sync {
    fn log(&self, level: Level, stage: &str, message: &str, extras: Option<Value>);

    fn debug(&self, stage: &str, message: &str, extras: Option<Value>) {
        self.log(Level::DEBUG, stage, message, extras);
    }

    fn info(&self, stage: &str, message: &str, extras: Option<Value>) {
        self.log(Level::INFO, stage, message, extras);
    }

    fn warn(&self, stage: &str, message: &str, extras: Option<Value>) {
        self.log(Level::WARN, stage, message, extras);
    }

    fn error(&self, stage: &str, message: &str, extras: Option<Value>) {
        self.log(Level::ERROR, stage, message, extras);
    }
}

/// Forwards every event to the installed `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn log(&self, level: Level, stage: &str, message: &str, extras: Option<Value>) {
        let extras = extras.map(|v| v.to_string()).unwrap_or_default();
        // `tracing` needs the level at compile time.
        match level {
            Level::ERROR => tracing::error!(stage, extras = %extras, "{message}"),
            Level::WARN => tracing::warn!(stage, extras = %extras, "{message}"),
            Level::INFO => tracing::info!(stage, extras = %extras, "{message}"),
            Level::DEBUG => tracing::debug!(stage, extras = %extras, "{message}"),
            _ => tracing::trace!(stage, extras = %extras, "{message}"),
        }
    }
}

/// Buffers records in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<LogRecord> {
        self.lock().clone()
    }

    /// Records at `level` (`"warn"`, `"error"`, ...).
    pub fn at_level(&self, level: &str) -> Vec<LogRecord> {
        self.lock()
            .iter()
            .filter(|r| r.level == level)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogRecord>> {
        // A poisoned buffer is still a valid buffer.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DiagnosticSink for MemorySink {
    fn log(&self, level: Level, stage: &str, message: &str, extras: Option<Value>) {
        let name = level.as_str().to_ascii_lowercase();
        self.lock().push(LogRecord::new(&name, stage, message, extras));
    }
}
