//! Timed execution wrapper for top-level bus operations.
//!
//! # Design
//! - Every operation is timed, logged with its name and elapsed time, and
//!   counted in the optional metrics registry.
//! - The wrapped future's result is returned unchanged; the executor never
//!   retries or rewrites errors.

use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

use tracing::{debug, warn};

use crate::metrics::Metrics;

/// Wraps named asynchronous operations with timing, logging, and metrics.
#[derive(Clone, Default)]
pub struct OperationExecutor {
    metrics: Option<Metrics>,
}

impl OperationExecutor {
    /// Executor that logs but records no metrics.
    #[must_use]
    pub const fn new() -> Self {
        Self { metrics: None }
    }

    /// Executor that also records into the supplied metrics registry.
    #[must_use]
    pub const fn with_metrics(metrics: Metrics) -> Self {
        Self {
            metrics: Some(metrics),
        }
    }

    /// Metrics registry attached to this executor, if any.
    #[must_use]
    pub const fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    /// Run `operation` to completion and report how it went.
    ///
    /// # Errors
    ///
    /// Propagates the error produced by the wrapped future.
    pub async fn execute<F, T, E>(&self, operation: &'static str, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: Display,
    {
        let started = Instant::now();
        let result = fut.await;
        let elapsed = started.elapsed();
        let elapsed_ms = Metrics::duration_to_ms(elapsed);

        match &result {
            Ok(_) => debug!(
                target: "herald::executor",
                operation,
                elapsed_ms,
                "operation completed"
            ),
            Err(error) => warn!(
                target: "herald::executor",
                operation,
                elapsed_ms,
                error = %error,
                "operation failed"
            ),
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_operation(operation, result.is_ok(), elapsed);
        }
        result
    }
}

impl std::fmt::Debug for OperationExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationExecutor")
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}
