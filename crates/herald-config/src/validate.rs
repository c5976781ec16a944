//! Validation helpers and parsing utilities for configuration values.

use crate::error::{ConfigError, ConfigResult};

/// Reject zero for fields that size buffers or caps.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when `value` is zero.
pub fn ensure_positive(field: &'static str, value: usize) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::InvalidField {
            field,
            value: Some(value.to_string()),
            reason: "must be at least 1",
        });
    }
    Ok(())
}

/// Same as [`ensure_positive`] for millisecond durations.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when `value` is zero.
pub fn ensure_positive_u64(field: &'static str, value: u64) -> ConfigResult<()> {
    if value == 0 {
        return Err(ConfigError::InvalidField {
            field,
            value: Some(value.to_string()),
            reason: "must be at least 1",
        });
    }
    Ok(())
}

/// Parse a boolean flag. Accepts `true/false`, `1/0`, `yes/no`, `on/off`.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for any other spelling.
pub fn parse_flag(field: &'static str, raw: &str) -> ConfigResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidField {
            field,
            value: Some(raw.to_string()),
            reason: "must be a boolean",
        }),
    }
}

/// Parse a non-negative integer.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] if `raw` is not an unsigned integer.
pub fn parse_count(field: &'static str, raw: &str) -> ConfigResult<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidField {
            field,
            value: Some(raw.to_string()),
            reason: "must be an unsigned integer",
        })
}

/// Parse a millisecond duration.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] if `raw` is not an unsigned integer.
pub fn parse_millis(field: &'static str, raw: &str) -> ConfigResult<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidField {
            field,
            value: Some(raw.to_string()),
            reason: "must be a duration in milliseconds",
        })
}
