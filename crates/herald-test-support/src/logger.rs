//! Loggers for asserting on bus diagnostics.

use std::sync::{Mutex, PoisonError};

use herald_events::{BusLogger, LogFields, LogLevel, render_fields};

/// One captured log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedLine {
    /// Severity.
    pub level: LogLevel,
    /// Message text.
    pub message: String,
    /// Fields rendered as `key=value` pairs.
    pub fields: String,
}

/// Records every line the bus logs.
#[derive(Debug, Default)]
pub struct CapturingLogger {
    lines: Mutex<Vec<CapturedLine>>,
}

impl CapturingLogger {
    /// Empty logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: LogLevel, message: &str, fields: LogFields<'_>) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CapturedLine {
                level,
                message: message.to_string(),
                fields: render_fields(fields),
            });
    }

    /// Every line captured so far.
    #[must_use]
    pub fn lines(&self) -> Vec<CapturedLine> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Lines captured at `level`.
    #[must_use]
    pub fn at(&self, level: LogLevel) -> Vec<CapturedLine> {
        self.lines()
            .into_iter()
            .filter(|line| line.level == level)
            .collect()
    }

    /// Whether any line at `level` contains `needle` in its message.
    #[must_use]
    pub fn contains(&self, level: LogLevel, needle: &str) -> bool {
        self.at(level)
            .iter()
            .any(|line| line.message.contains(needle))
    }
}

impl BusLogger for CapturingLogger {
    fn debug(&self, message: &str, fields: LogFields<'_>) {
        self.push(LogLevel::Debug, message, fields);
    }

    fn info(&self, message: &str, fields: LogFields<'_>) {
        self.push(LogLevel::Info, message, fields);
    }

    fn warn(&self, message: &str, fields: LogFields<'_>) {
        self.push(LogLevel::Warn, message, fields);
    }

    fn error(&self, message: &str, fields: LogFields<'_>) {
        self.push(LogLevel::Error, message, fields);
    }
}

/// Panics on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanickingLogger;

impl BusLogger for PanickingLogger {
    fn debug(&self, message: &str, _: LogFields<'_>) {
        panic!("logger refused debug line: {message}");
    }

    fn info(&self, message: &str, _: LogFields<'_>) {
        panic!("logger refused info line: {message}");
    }

    fn warn(&self, message: &str, _: LogFields<'_>) {
        panic!("logger refused warn line: {message}");
    }

    fn error(&self, message: &str, _: LogFields<'_>) {
        panic!("logger refused error line: {message}");
    }
}
