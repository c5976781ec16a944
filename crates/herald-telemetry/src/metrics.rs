//! Prometheus collectors for bus operations and emission outcomes.
//!
//! # Design
//! - Each `Metrics` value owns its own registry; buses never share global
//!   collectors.
//! - Labels stay low-cardinality: operation names and outcome kinds, never
//!   topic names.

use std::sync::Arc;
use std::time::Duration;

use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder,
    core::Collector,
};
use serde::Serialize;

use crate::error::{CollectorStage, Result, TelemetryError};

/// Outcome label for emissions that reached dispatch.
pub const OUTCOME_DELIVERED: &str = "delivered";
/// Outcome label for emissions stopped by middleware.
pub const OUTCOME_VETOED: &str = "vetoed";
/// Outcome label for emissions suppressed by topic filters.
pub const OUTCOME_FILTERED: &str = "filtered";

const STATUS_OK: &str = "ok";
const STATUS_ERROR: &str = "error";

/// Prometheus-backed metrics registry shared across bus instances.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    operations_total: IntCounterVec,
    operation_latency_ms: IntGaugeVec,
    emissions_total: IntCounterVec,
    listener_failures_total: IntCounter,
}

/// Snapshot of selected counters for health reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Emissions that reached listener dispatch.
    pub emissions_delivered: u64,
    /// Emissions stopped by middleware.
    pub emissions_vetoed: u64,
    /// Emissions suppressed by topic filters.
    pub emissions_filtered: u64,
    /// Listener invocations that failed, panicked, or timed out.
    pub listener_failures_total: u64,
}

impl Metrics {
    /// Build a registry holding the bus collectors.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Collector`] naming the first collector that
    /// could not be built or registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let operations_total = IntCounterVec::new(
            Opts::new(
                "herald_operations_total",
                "Bus operations executed, by operation and status",
            ),
            &["operation", "status"],
        )
        .map_err(|source| collector_error("herald_operations_total", source))?;
        let operation_latency_ms = IntGaugeVec::new(
            Opts::new(
                "herald_operation_latency_ms",
                "Latency of the most recent execution of each operation (ms)",
            ),
            &["operation"],
        )
        .map_err(|source| collector_error("herald_operation_latency_ms", source))?;
        let emissions_total = IntCounterVec::new(
            Opts::new("herald_emissions_total", "Emissions by outcome"),
            &["outcome"],
        )
        .map_err(|source| collector_error("herald_emissions_total", source))?;
        let listener_failures_total = IntCounter::with_opts(Opts::new(
            "herald_listener_failures_total",
            "Listener invocations that failed, panicked, or timed out",
        ))
        .map_err(|source| collector_error("herald_listener_failures_total", source))?;

        register(&registry, "herald_operations_total", &operations_total)?;
        register(&registry, "herald_operation_latency_ms", &operation_latency_ms)?;
        register(&registry, "herald_emissions_total", &emissions_total)?;
        register(
            &registry,
            "herald_listener_failures_total",
            &listener_failures_total,
        )?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                operations_total,
                operation_latency_ms,
                emissions_total,
                listener_failures_total,
            }),
        })
    }

    /// Record one execution of a named operation.
    pub fn record_operation(&self, operation: &str, succeeded: bool, elapsed: Duration) {
        let status = if succeeded { STATUS_OK } else { STATUS_ERROR };
        self.inner
            .operations_total
            .with_label_values(&[operation, status])
            .inc();
        self.inner
            .operation_latency_ms
            .with_label_values(&[operation])
            .set(Self::duration_to_ms(elapsed));
    }

    /// Increment the emission counter for the given outcome label.
    pub fn inc_emission(&self, outcome: &str) {
        self.inner
            .emissions_total
            .with_label_values(&[outcome])
            .inc();
    }

    /// Add failed listener invocations to the failure counter.
    pub fn inc_listener_failures(&self, count: u64) {
        if count > 0 {
            self.inner.listener_failures_total.inc_by(count);
        }
    }

    /// Number of recorded executions of `operation` with the given status.
    #[must_use]
    pub fn operation_count(&self, operation: &str, succeeded: bool) -> u64 {
        let status = if succeeded { STATUS_OK } else { STATUS_ERROR };
        self.inner
            .operations_total
            .with_label_values(&[operation, status])
            .get()
    }

    /// Encode every collector in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Encode`] or [`TelemetryError::Utf8`] when
    /// encoding fails.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::Encode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::Utf8 { source })
    }

    /// Take a point-in-time snapshot of the emission and failure counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let emissions = |outcome: &str| {
            self.inner
                .emissions_total
                .with_label_values(&[outcome])
                .get()
        };
        MetricsSnapshot {
            emissions_delivered: emissions(OUTCOME_DELIVERED),
            emissions_vetoed: emissions(OUTCOME_VETOED),
            emissions_filtered: emissions(OUTCOME_FILTERED),
            listener_failures_total: self.inner.listener_failures_total.get(),
        }
    }

    pub(crate) fn duration_to_ms(duration: Duration) -> i64 {
        i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
    }
}

const fn collector_error(metric: &'static str, source: prometheus::Error) -> TelemetryError {
    TelemetryError::Collector {
        metric,
        stage: CollectorStage::Build,
        source,
    }
}

fn register<C>(registry: &Registry, metric: &'static str, collector: &C) -> Result<()>
where
    C: Collector + Clone + 'static,
{
    registry
        .register(Box::new(collector.clone()))
        .map_err(|source| TelemetryError::Collector {
            metric,
            stage: CollectorStage::Register,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_to_ms_saturates_on_large_values() {
        let duration = Duration::from_secs(u64::MAX / 2);
        assert_eq!(Metrics::duration_to_ms(duration), i64::MAX);
    }

    #[test]
    fn metrics_snapshot_reflects_updates() -> Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_emission(OUTCOME_DELIVERED);
        metrics.inc_emission(OUTCOME_DELIVERED);
        metrics.inc_emission(OUTCOME_VETOED);
        metrics.inc_emission(OUTCOME_FILTERED);
        metrics.inc_listener_failures(3);
        metrics.inc_listener_failures(0);
        metrics.record_operation("event_bus.emit", true, Duration::from_millis(12));
        metrics.record_operation("event_bus.emit", false, Duration::from_millis(4));

        let snapshot = metrics.snapshot();
        assert_eq!(
            snapshot,
            MetricsSnapshot {
                emissions_delivered: 2,
                emissions_vetoed: 1,
                emissions_filtered: 1,
                listener_failures_total: 3,
            }
        );
        assert_eq!(metrics.operation_count("event_bus.emit", true), 1);
        assert_eq!(metrics.operation_count("event_bus.emit", false), 1);

        let rendered = metrics.render()?;
        assert!(rendered.contains("herald_operations_total"));
        assert!(rendered.contains("herald_emissions_total"));
        assert!(rendered.contains("herald_listener_failures_total"));
        Ok(())
    }

    #[test]
    fn registries_are_independent() -> Result<()> {
        let first = Metrics::new()?;
        let second = Metrics::new()?;
        first.inc_emission(OUTCOME_VETOED);
        assert_eq!(first.snapshot().emissions_vetoed, 1);
        assert_eq!(second.snapshot().emissions_vetoed, 0);
        Ok(())
    }
}
