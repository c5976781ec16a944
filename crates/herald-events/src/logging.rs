//! Logger capability consumed by the bus.
//!
//! # Design
//! - `BusLogger` is the narrow interface the bus logs through; the default
//!   implementation forwards to `tracing` under the `herald::bus` target.
//! - Every call the bus makes is guarded with `catch_unwind`, so a panicking
//!   logger never affects subscription, emission, or replay.

use std::fmt::{self, Display, Write as _};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

/// Structured context attached to a log line.
pub type LogFields<'a> = &'a [(&'static str, &'a dyn Display)];

/// Severity of a bus log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Policy traces: vetoes and filtered emissions.
    Debug,
    /// Informational messages.
    Info,
    /// Soft-limit and disabled-feature warnings.
    Warn,
    /// Listener failures.
    Error,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

/// Logging capability used by the bus.
pub trait BusLogger: Send + Sync {
    /// Emit a debug line.
    fn debug(&self, message: &str, fields: LogFields<'_>);
    /// Emit an info line.
    fn info(&self, message: &str, fields: LogFields<'_>);
    /// Emit a warning.
    fn warn(&self, message: &str, fields: LogFields<'_>);
    /// Emit an error.
    fn error(&self, message: &str, fields: LogFields<'_>);

    /// Dispatch to the method matching `level`.
    fn log(&self, level: LogLevel, message: &str, fields: LogFields<'_>) {
        match level {
            LogLevel::Debug => self.debug(message, fields),
            LogLevel::Info => self.info(message, fields),
            LogLevel::Warn => self.warn(message, fields),
            LogLevel::Error => self.error(message, fields),
        }
    }
}

/// Render fields as `key=value` pairs separated by spaces.
#[must_use]
pub fn render_fields(fields: LogFields<'_>) -> String {
    let mut rendered = String::new();
    for (index, (key, value)) in fields.iter().enumerate() {
        if index > 0 {
            rendered.push(' ');
        }
        let _ = write!(rendered, "{key}={value}");
    }
    rendered
}

/// Keys lifted out of the field list into dedicated `tracing` fields.
const LIFTED_KEYS: [&str; 3] = ["topic", "event_id", "listener"];

/// Fields split into the lifted keys and the rendered remainder.
struct SplitFields<'a> {
    topic: Option<&'a dyn Display>,
    event_id: Option<&'a dyn Display>,
    listener: Option<&'a dyn Display>,
    context: String,
}

fn split_fields<'a>(fields: LogFields<'a>) -> SplitFields<'a> {
    let lookup = |wanted: &str| {
        fields
            .iter()
            .find(|(key, _)| *key == wanted)
            .map(|(_, value)| *value)
    };
    let rest: Vec<(&'static str, &'a dyn Display)> = fields
        .iter()
        .filter(|(key, _)| !LIFTED_KEYS.contains(key))
        .copied()
        .collect();
    SplitFields {
        topic: lookup("topic"),
        event_id: lookup("event_id"),
        listener: lookup("listener"),
        context: render_fields(&rest),
    }
}

macro_rules! bus_event {
    ($level:ident, $message:expr, $fields:expr) => {{
        let split = split_fields($fields);
        $level!(
            target: "herald::bus",
            topic = split.topic.map(tracing::field::display),
            event_id = split.event_id.map(tracing::field::display),
            listener = split.listener.map(tracing::field::display),
            context = %split.context,
            "{}",
            $message
        );
    }};
}

/// Forwards bus logs to `tracing`.
///
/// `topic`, `event_id`, and `listener` are recorded as their own fields;
/// anything else is rendered into `context`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl BusLogger for TracingLogger {
    fn debug(&self, message: &str, fields: LogFields<'_>) {
        bus_event!(debug, message, fields);
    }

    fn info(&self, message: &str, fields: LogFields<'_>) {
        bus_event!(info, message, fields);
    }

    fn warn(&self, message: &str, fields: LogFields<'_>) {
        bus_event!(warn, message, fields);
    }

    fn error(&self, message: &str, fields: LogFields<'_>) {
        bus_event!(error, message, fields);
    }
}

/// Wraps a logger so its panics are contained.
#[derive(Clone)]
pub(crate) struct GuardedLogger {
    inner: Arc<dyn BusLogger>,
}

impl GuardedLogger {
    pub(crate) fn new(inner: Arc<dyn BusLogger>) -> Self {
        Self { inner }
    }

    pub(crate) fn log(&self, level: LogLevel, message: &str, fields: LogFields<'_>) {
        let inner = &self.inner;
        if panic::catch_unwind(AssertUnwindSafe(|| inner.log(level, message, fields))).is_err() {
            warn!(target: "herald::bus", %level, "bus logger panicked; line dropped");
        }
    }

    pub(crate) fn debug(&self, message: &str, fields: LogFields<'_>) {
        self.log(LogLevel::Debug, message, fields);
    }

    pub(crate) fn warn(&self, message: &str, fields: LogFields<'_>) {
        self.log(LogLevel::Warn, message, fields);
    }

    pub(crate) fn error(&self, message: &str, fields: LogFields<'_>) {
        self.log(LogLevel::Error, message, fields);
    }
}
