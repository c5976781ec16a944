//! Error types for telemetry operations.

use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::string::FromUtf8Error;

use crate::init::LogFormat;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Step of collector setup that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorStage {
    /// Constructing the collector from its options.
    Build,
    /// Adding the collector to the registry.
    Register,
}

impl Display for CollectorStage {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Build => "build",
            Self::Register => "register",
        })
    }
}

/// Errors raised by telemetry helpers.
#[derive(Debug)]
pub enum TelemetryError {
    /// A global tracing subscriber was already installed.
    SubscriberInstall {
        /// Output format that was being installed.
        format: LogFormat,
        /// Underlying tracing subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// A Prometheus collector could not be built or registered.
    Collector {
        /// Metric name.
        metric: &'static str,
        /// Setup step that failed.
        stage: CollectorStage,
        /// Underlying Prometheus error.
        source: prometheus::Error,
    },
    /// Gathered metrics could not be encoded.
    Encode {
        /// Underlying Prometheus error.
        source: prometheus::Error,
    },
    /// Encoded metrics were not valid UTF-8.
    Utf8 {
        /// Underlying conversion error.
        source: FromUtf8Error,
    },
}

impl TelemetryError {
    /// Metric involved in the failure, if any.
    #[must_use]
    pub const fn metric(&self) -> Option<&'static str> {
        match self {
            Self::Collector { metric, .. } => Some(metric),
            Self::SubscriberInstall { .. } | Self::Encode { .. } | Self::Utf8 { .. } => None,
        }
    }
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubscriberInstall { format, .. } => {
                write!(formatter, "could not install {format} log subscriber")
            }
            Self::Collector { metric, stage, .. } => {
                write!(formatter, "could not {stage} collector {metric}")
            }
            Self::Encode { .. } => formatter.write_str("could not encode metrics"),
            Self::Utf8 { .. } => formatter.write_str("encoded metrics were not utf-8"),
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SubscriberInstall { source, .. } => Some(source),
            Self::Collector { source, .. } | Self::Encode { source } => Some(source),
            Self::Utf8 { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prometheus_error() -> prometheus::Error {
        prometheus::Error::Msg("duplicate".to_string())
    }

    #[test]
    fn collector_errors_name_metric_and_stage() {
        let build = TelemetryError::Collector {
            metric: "herald_emissions_total",
            stage: CollectorStage::Build,
            source: prometheus_error(),
        };
        assert_eq!(
            build.to_string(),
            "could not build collector herald_emissions_total"
        );
        assert_eq!(build.metric(), Some("herald_emissions_total"));
        assert!(build.source().is_some());

        let register = TelemetryError::Collector {
            metric: "herald_operations_total",
            stage: CollectorStage::Register,
            source: prometheus_error(),
        };
        assert_eq!(
            register.to_string(),
            "could not register collector herald_operations_total"
        );
    }

    #[test]
    fn render_errors_keep_sources() {
        let encode = TelemetryError::Encode {
            source: prometheus_error(),
        };
        assert_eq!(encode.to_string(), "could not encode metrics");
        assert!(encode.metric().is_none());
        assert!(encode.source().is_some());

        let utf8 = String::from_utf8(vec![0, 159]).err().map(|source| TelemetryError::Utf8 {
            source,
        });
        assert_eq!(
            utf8.map(|err| err.to_string()).as_deref(),
            Some("encoded metrics were not utf-8")
        );
    }
}
