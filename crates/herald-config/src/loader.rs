//! Loading `BusConfig` from JSON documents and the process environment.
//!
//! # Design
//! - Environment lookups go through a caller-supplied function so tests never
//!   mutate process state.
//! - Unset variables keep their defaults; malformed values fail loudly.

use crate::error::{ConfigError, ConfigResult};
use crate::model::BusConfig;
use crate::validate::{parse_count, parse_flag, parse_millis};

/// Prefix shared by every environment variable the loader reads.
pub const ENV_PREFIX: &str = "HERALD_";

const MAX_LISTENERS: &str = "max_listeners";
const ENABLE_PERSISTENCE: &str = "enable_persistence";
const PERSISTENCE_LIMIT: &str = "persistence_limit";
const ENABLE_REPLAY: &str = "enable_replay";
const LISTENER_TIMEOUT_MS: &str = "listener_timeout_ms";

/// Environment variable name for a configuration field.
#[must_use]
pub fn env_key(field: &str) -> String {
    format!("{ENV_PREFIX}{}", field.to_ascii_uppercase())
}

impl BusConfig {
    /// Parse and validate a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for malformed documents and
    /// [`ConfigError::InvalidField`] when a value is out of range.
    pub fn from_json_str(document: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_json::from_str(document).map_err(|source| ConfigError::Json { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from `HERALD_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] when a variable cannot be parsed
    /// or the resulting configuration fails validation.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration using an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`BusConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |field: &str| lookup(&env_key(field)).filter(|raw| !raw.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = read(MAX_LISTENERS) {
            config.max_listeners = parse_count(MAX_LISTENERS, &raw)?;
        }
        if let Some(raw) = read(ENABLE_PERSISTENCE) {
            config.enable_persistence = parse_flag(ENABLE_PERSISTENCE, &raw)?;
        }
        if let Some(raw) = read(PERSISTENCE_LIMIT) {
            config.persistence_limit = parse_count(PERSISTENCE_LIMIT, &raw)?;
        }
        if let Some(raw) = read(ENABLE_REPLAY) {
            config.enable_replay = parse_flag(ENABLE_REPLAY, &raw)?;
        }
        if let Some(raw) = read(LISTENER_TIMEOUT_MS) {
            config.listener_timeout_ms = Some(parse_millis(LISTENER_TIMEOUT_MS, &raw)?);
        }

        config.validate()?;
        Ok(config)
    }
}
