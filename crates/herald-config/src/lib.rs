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

//! Construction-time configuration for the Herald event bus.
//!
//! Layout: `model.rs` (the `BusConfig` document), `defaults.rs` (default
//! values), `validate.rs` (validation and parsing helpers), `loader.rs`
//! (JSON and environment loading), `error.rs` (`ConfigError`).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ENV_PREFIX, env_key};
pub use model::BusConfig;
