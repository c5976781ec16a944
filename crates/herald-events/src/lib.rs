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

//! Typed in-process event bus for Herald.
//!
//! The bus matches topics exactly or through `*` wildcards, runs an ordered
//! middleware pipeline over every emission, applies per-topic filters, keeps a
//! bounded history for replay, and tracks per-topic statistics. Listener
//! failures are isolated from the emitter and from each other.
//!
//! Layout: `bus.rs` (composition root and emission), `registry.rs`,
//! `topics.rs`, `middleware.rs`, `filters.rs`, `history.rs`, `stats.rs`,
//! `dispatch.rs` (isolated invocation), `listener.rs` (callback types),
//! `subscription.rs`, `stream.rs`, `logging.rs`, `payloads.rs`, `error.rs`.

pub mod bus;
mod dispatch;
pub mod error;
mod filters;
mod history;
pub mod listener;
pub mod logging;
mod middleware;
pub mod payloads;
mod registry;
mod stats;
pub mod stream;
pub mod subscription;
pub mod topics;

pub use bus::{DynamicEventBus, EventBus, EventBusBuilder};
pub use error::{BoxError, EventBusError, EventBusResult};
pub use herald_config::BusConfig;
pub use listener::{Filter, Listener, ListenerId, ListenerResult, Middleware, MiddlewareResult};
pub use logging::{BusLogger, LogFields, LogLevel, TracingLogger, render_fields};
pub use payloads::{
    DispatchReport, EmitOutcome, EventEnvelope, EventId, EventMetadata, ReplayOutcome, TopicStats,
};
pub use stream::EventStream;
pub use subscription::Subscription;
pub use topics::{TopicPattern, matches};
