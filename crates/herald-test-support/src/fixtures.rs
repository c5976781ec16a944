//! Bus constructors for tests.
//!
//! Every helper builds a new, independent bus; there is no shared instance to
//! reset between tests.

use std::sync::Arc;

use herald_config::BusConfig;
use herald_events::{BusLogger, EventBus};

/// A bus with default configuration.
#[must_use]
pub fn fresh_bus<T>() -> EventBus<T>
where
    T: Send + Sync + 'static,
{
    EventBus::new(BusConfig::default())
}

/// A bus with the supplied configuration.
#[must_use]
pub fn bus_with_config<T>(config: BusConfig) -> EventBus<T>
where
    T: Send + Sync + 'static,
{
    EventBus::new(config)
}

/// A bus that logs through `logger`.
#[must_use]
pub fn bus_with_logger<T>(config: BusConfig, logger: Arc<dyn BusLogger>) -> EventBus<T>
where
    T: Send + Sync + 'static,
{
    EventBus::builder(config).logger(logger).build()
}

/// Configuration with persistence and replay enabled, retaining `limit`
/// entries per topic.
#[must_use]
pub fn replay_config(limit: usize) -> BusConfig {
    BusConfig::with_history(limit)
}
