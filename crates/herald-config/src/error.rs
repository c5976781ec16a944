//! Error types for configuration operations.

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Field contained an invalid value.
    #[error("invalid configuration field")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Offending value when available.
        value: Option<String>,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// The configuration document was not valid JSON for `BusConfig`.
    #[error("invalid configuration document")]
    Json {
        /// Source serde error.
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Name of the offending field, if the error is tied to one.
    #[must_use]
    pub const fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidField { field, .. } => Some(field),
            Self::Json { .. } => None,
        }
    }
}

/// Convenience alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn invalid_field_exposes_field_name() {
        let err = ConfigError::InvalidField {
            field: "max_listeners",
            value: Some("0".into()),
            reason: "must be at least 1",
        };
        assert_eq!(err.field(), Some("max_listeners"));
        assert_eq!(err.to_string(), "invalid configuration field");
        assert!(err.source().is_none());
    }

    #[test]
    fn json_error_keeps_source() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ConfigError::Json { source };
        assert_eq!(err.field(), None);
        assert_eq!(err.to_string(), "invalid configuration document");
    }
}
