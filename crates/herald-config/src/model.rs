//! Typed configuration model for the event bus.
//!
//! # Design
//! - Pure data carrier; the bus takes ownership at construction and never
//!   mutates it afterwards.
//! - Every field has a serde default so partial documents are accepted.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::error::ConfigResult;
use crate::validate;

/// Construction-time settings for an event bus instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    /// Soft cap on listeners per pattern. Reaching it logs a warning; the
    /// subscription is still accepted.
    #[serde(default = "defaults::max_listeners")]
    pub max_listeners: usize,
    /// Record emitted envelopes in the per-topic history ring.
    #[serde(default = "defaults::enable_persistence")]
    pub enable_persistence: bool,
    /// Capacity of each per-topic history ring.
    #[serde(default = "defaults::persistence_limit")]
    pub persistence_limit: usize,
    /// Allow `replay` to re-deliver history to a listener.
    #[serde(default = "defaults::enable_replay")]
    pub enable_replay: bool,
    /// Optional deadline applied to every listener invocation, in milliseconds.
    #[serde(default)]
    pub listener_timeout_ms: Option<u64>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_listeners: defaults::DEFAULT_MAX_LISTENERS,
            enable_persistence: defaults::DEFAULT_ENABLE_PERSISTENCE,
            persistence_limit: defaults::DEFAULT_PERSISTENCE_LIMIT,
            enable_replay: defaults::DEFAULT_ENABLE_REPLAY,
            listener_timeout_ms: None,
        }
    }
}

impl BusConfig {
    /// Convenience constructor enabling both persistence and replay with the
    /// given history capacity.
    #[must_use]
    pub fn with_history(persistence_limit: usize) -> Self {
        Self {
            enable_persistence: true,
            enable_replay: true,
            persistence_limit,
            ..Self::default()
        }
    }

    /// Deadline applied to listener invocations, if configured.
    #[must_use]
    pub fn listener_timeout(&self) -> Option<Duration> {
        self.listener_timeout_ms.map(Duration::from_millis)
    }

    /// Check every field against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::InvalidField`] naming the first field that
    /// is out of range.
    pub fn validate(&self) -> ConfigResult<()> {
        validate::ensure_positive("max_listeners", self.max_listeners)?;
        validate::ensure_positive("persistence_limit", self.persistence_limit)?;
        if let Some(timeout) = self.listener_timeout_ms {
            validate::ensure_positive_u64("listener_timeout_ms", timeout)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;

    #[test]
    fn defaults_match_documented_values() {
        let config = BusConfig::default();
        assert_eq!(config.max_listeners, 100);
        assert!(!config.enable_persistence);
        assert_eq!(config.persistence_limit, 100);
        assert!(!config.enable_replay);
        assert!(config.listener_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn with_history_enables_persistence_and_replay() {
        let config = BusConfig::with_history(3);
        assert!(config.enable_persistence);
        assert!(config.enable_replay);
        assert_eq!(config.persistence_limit, 3);
        assert_eq!(config.max_listeners, 100);
    }

    #[test]
    fn validate_rejects_zero_limits() {
        let config = BusConfig {
            persistence_limit: 0,
            ..BusConfig::default()
        };
        match config.validate() {
            Err(ConfigError::InvalidField { field, .. }) => assert_eq!(field, "persistence_limit"),
            other => panic!("unexpected validation result: {other:?}"),
        }

        let config = BusConfig {
            max_listeners: 0,
            ..BusConfig::default()
        };
        assert!(config.validate().is_err());

        let config = BusConfig {
            listener_timeout_ms: Some(0),
            ..BusConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn listener_timeout_converts_to_duration() {
        let config = BusConfig {
            listener_timeout_ms: Some(250),
            ..BusConfig::default()
        };
        assert_eq!(config.listener_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn partial_documents_fill_defaults() {
        let config: BusConfig =
            serde_json::from_str(r#"{"enable_persistence": true}"#).expect("valid document");
        assert!(config.enable_persistence);
        assert_eq!(config.persistence_limit, 100);
        assert_eq!(config.max_listeners, 100);
    }
}
