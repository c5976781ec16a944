//! Default values applied to missing configuration fields.
//!
//! # Design
//! - Centralise defaults so serde, `Default`, and the env loader agree.

/// Soft ceiling on listeners per pattern before a warning is logged.
pub const DEFAULT_MAX_LISTENERS: usize = 100;
/// History is not recorded unless explicitly enabled.
pub const DEFAULT_ENABLE_PERSISTENCE: bool = false;
/// Number of entries retained per topic when persistence is enabled.
pub const DEFAULT_PERSISTENCE_LIMIT: usize = 100;
/// Replay is refused unless explicitly enabled.
pub const DEFAULT_ENABLE_REPLAY: bool = false;

pub(crate) const fn max_listeners() -> usize {
    DEFAULT_MAX_LISTENERS
}

pub(crate) const fn enable_persistence() -> bool {
    DEFAULT_ENABLE_PERSISTENCE
}

pub(crate) const fn persistence_limit() -> usize {
    DEFAULT_PERSISTENCE_LIMIT
}

pub(crate) const fn enable_replay() -> bool {
    DEFAULT_ENABLE_REPLAY
}
