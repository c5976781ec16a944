//! Tracing subscriber installation.
//!
//! # Design
//! - One entry point installs an `EnvFilter` plus a `fmt` layer, pretty or
//!   JSON. `RUST_LOG` wins over the configured level when set.
//! - Bus policy traces (vetoes, filtered emissions) log at debug under
//!   `herald::bus`; `bus_debug` opts into them without lowering every target.
//! - The build SHA is recorded once, on first initialisation.

use std::fmt;

use once_cell::sync::OnceCell;
use serde_json::Value;
use tracing_subscriber::{EnvFilter, fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Result, TelemetryError};

/// Level applied when neither `RUST_LOG` nor the config override it.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Key read by [`log_format_from_config`].
pub const LOG_FORMAT_KEY: &str = "log_format";

const BUS_TARGET_DEBUG: &str = "herald::bus=debug";

static BUILD_SHA: OnceCell<String> = OnceCell::new();

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    Json,
    /// Human-readable lines.
    Pretty,
}

impl LogFormat {
    /// Pretty in debug builds, JSON in release builds.
    #[must_use]
    pub const fn for_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }

    /// Parse `json` or `pretty`, ignoring ASCII case.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else if raw.eq_ignore_ascii_case("pretty") {
            Some(Self::Pretty)
        } else {
            None
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Json => "json",
            Self::Pretty => "pretty",
        })
    }
}

/// Settings for [`init_logging`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset, e.g. `info`.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Also enable debug output for the `herald::bus` target.
    pub bus_debug: bool,
    /// Build identifier recorded on first initialisation.
    pub build_sha: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::for_build(),
            bus_debug: false,
            build_sha: None,
        }
    }
}

impl LoggingConfig {
    fn directives(&self) -> String {
        if self.bus_debug {
            format!("{},{BUS_TARGET_DEBUG}", self.level)
        } else {
            self.level.clone()
        }
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns [`TelemetryError::SubscriberInstall`] when a global subscriber is
/// already set.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    if let Some(sha) = &config.build_sha {
        let _ = BUILD_SHA.set(sha.clone());
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.directives()));
    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Json => registry
            .with(fmt_layer::layer().json().with_target(true))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt_layer::layer().with_target(true)).try_init(),
    };
    installed.map_err(|source| TelemetryError::SubscriberInstall {
        format: config.format,
        source,
    })
}

/// Build SHA recorded by [`init_logging`], or `dev`.
#[must_use]
pub fn build_sha() -> &'static str {
    BUILD_SHA.get().map_or("dev", String::as_str)
}

/// Read the log format from a `{"log_format": ...}` document.
///
/// Returns `None` when the key is absent; unknown values fall back to
/// [`LogFormat::for_build`].
#[must_use]
pub fn log_format_from_config(config: Option<&Value>) -> Option<LogFormat> {
    let raw = config?.get(LOG_FORMAT_KEY)?.as_str()?;
    Some(LogFormat::parse(raw).unwrap_or_else(LogFormat::for_build))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_is_read_from_documents() {
        let cases = [
            (json!({"log_format": "json"}), Some(LogFormat::Json)),
            (json!({"log_format": "PRETTY"}), Some(LogFormat::Pretty)),
            (json!({"log_format": "xml"}), Some(LogFormat::for_build())),
            (json!({"log_format": 3}), None),
            (json!({}), None),
        ];
        for (document, expected) in cases {
            assert_eq!(log_format_from_config(Some(&document)), expected, "{document}");
        }
        assert!(log_format_from_config(None).is_none());
    }

    #[test]
    fn bus_debug_adds_target_directive() {
        let mut config = LoggingConfig::default();
        assert_eq!(config.directives(), "info");
        config.bus_debug = true;
        assert_eq!(config.directives(), "info,herald::bus=debug");
    }

    #[test]
    fn second_install_is_an_error() {
        let config = LoggingConfig {
            format: LogFormat::Pretty,
            build_sha: Some("abc123".to_string()),
            ..LoggingConfig::default()
        };
        let first = init_logging(&config);
        let second = init_logging(&config);
        assert!(matches!(
            second,
            Err(TelemetryError::SubscriberInstall {
                format: LogFormat::Pretty,
                ..
            })
        ));
        if first.is_ok() {
            assert_eq!(build_sha(), "abc123");
        }
        assert_eq!(LogFormat::Json.to_string(), "json");
    }
}
