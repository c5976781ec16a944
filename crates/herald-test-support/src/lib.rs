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

//! Shared test helpers used across integration suites.
//! Layout: fixtures.rs (bus constructors), recorder.rs (recording and
//! misbehaving listeners), logger.rs (capturing and panicking loggers).

pub mod fixtures;
pub mod logger;
pub mod recorder;

pub use fixtures::{bus_with_config, bus_with_logger, fresh_bus, replay_config};
pub use logger::{CapturedLine, CapturingLogger, PanickingLogger};
pub use recorder::{Recorder, failing_listener, panicking_listener, slow_listener};
