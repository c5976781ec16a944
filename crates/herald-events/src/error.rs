//! Event bus error primitives.

use herald_config::ConfigError;
use thiserror::Error;

/// Boxed error returned by listeners and middleware.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Orchestration failures surfaced by bus operations.
///
/// Listener failures never appear here; they are logged and counted in the
/// emission's dispatch report instead.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// An operation was called with an empty topic.
    #[error("topic must not be empty")]
    EmptyTopic {
        /// Bus operation that rejected the topic.
        operation: &'static str,
    },
    /// A subscription was requested with an empty pattern.
    #[error("subscription pattern must not be empty")]
    EmptyPattern {
        /// Bus operation that rejected the pattern.
        operation: &'static str,
    },
    /// A middleware stage failed while transforming a payload.
    #[error("middleware failed")]
    Middleware {
        /// Topic being emitted.
        topic: String,
        /// Zero-based position of the failing middleware.
        stage: usize,
        /// Error returned by the middleware.
        #[source]
        source: BoxError,
    },
    /// The bus configuration failed validation at construction.
    #[error("bus configuration is invalid")]
    InvalidConfig {
        /// Validation failure reported by the config layer.
        #[source]
        source: ConfigError,
    },
}

impl EventBusError {
    /// Bus operation or topic associated with the failure.
    #[must_use]
    pub fn context(&self) -> &str {
        match self {
            Self::EmptyTopic { operation } | Self::EmptyPattern { operation } => operation,
            Self::Middleware { topic, .. } => topic,
            Self::InvalidConfig { source } => source.field().unwrap_or("config"),
        }
    }
}

/// Result wrapper for event bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;
