#![forbid(unsafe_code)]
#![warn(
    unused,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Telemetry primitives shared across the Herald workspace.
//!
//! This crate centralises logging setup, Prometheus metrics, and the operation
//! executor that times and logs the bus's top-level operations.
//!
//! Layout: `init.rs` (subscriber installation), `metrics.rs` (Prometheus
//! registry), `executor.rs` (`OperationExecutor`), `error.rs`
//! (`TelemetryError`).

pub mod error;
pub mod executor;
pub mod init;
pub mod metrics;

pub use error::{CollectorStage, Result, TelemetryError};
pub use executor::OperationExecutor;
pub use init::{
    DEFAULT_LOG_LEVEL, LOG_FORMAT_KEY, LogFormat, LoggingConfig, build_sha, init_logging,
    log_format_from_config,
};
pub use metrics::{Metrics, MetricsSnapshot, OUTCOME_DELIVERED, OUTCOME_FILTERED, OUTCOME_VETOED};
