//! Event payload types shared by the bus, its listeners, and its callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier assigned to each emission, sequential per bus starting at 1.
pub type EventId = u64;

/// Metadata attached once per emission and shared by every observer of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventMetadata {
    /// Sequential identifier of the emission.
    pub id: EventId,
    /// Wall-clock time the emission started.
    pub timestamp: DateTime<Utc>,
    /// Topic the payload was emitted on.
    pub topic: String,
    /// Optional caller-supplied origin of the emission.
    pub source: Option<String>,
}

/// Post-middleware payload together with its emission metadata.
///
/// Listeners and the history store share one envelope per emission through
/// an `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventEnvelope<T> {
    /// Emission metadata.
    pub metadata: EventMetadata,
    /// Payload as delivered to listeners.
    pub payload: T,
}

impl<T> EventEnvelope<T> {
    /// Identifier of the emission that produced this envelope.
    #[must_use]
    pub const fn id(&self) -> EventId {
        self.metadata.id
    }

    /// Topic the envelope was emitted on.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.metadata.topic
    }
}

/// Per-topic usage counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopicStats {
    /// Literal topic key.
    pub topic: String,
    /// Exact-pattern subscriptions on this key. Wildcard subscribers are not
    /// counted against the topics they match.
    pub listener_count: usize,
    /// Non-vetoed emissions on this key.
    pub emit_count: u64,
    /// Timestamp of the latest non-vetoed emission.
    pub last_emitted: Option<DateTime<Utc>>,
}

impl TopicStats {
    /// Zeroed counters for a topic that has never been seen.
    #[must_use]
    pub fn empty(topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            listener_count: 0,
            emit_count: 0,
            last_emitted: None,
        }
    }
}

/// Summary of one live dispatch.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct DispatchReport {
    /// Identifier of the dispatched emission.
    pub event_id: EventId,
    /// Listeners invoked. Single-use listeners claimed by a concurrent
    /// emission are not counted.
    pub listeners: usize,
    /// Invocations that returned an error, panicked, or timed out.
    pub failures: usize,
}

impl DispatchReport {
    /// Invocations that completed successfully.
    #[must_use]
    pub const fn succeeded(&self) -> usize {
        self.listeners.saturating_sub(self.failures)
    }
}

/// Result of an `emit` call that did not fail.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EmitOutcome {
    /// A middleware vetoed the payload; nothing was recorded or delivered.
    Vetoed,
    /// Topic filters rejected the payload after history and stats were updated.
    Filtered {
        /// Identifier of the suppressed emission.
        event_id: EventId,
    },
    /// Listeners were dispatched.
    Delivered(DispatchReport),
}

impl EmitOutcome {
    /// Identifier of the emission, absent when vetoed.
    #[must_use]
    pub const fn event_id(&self) -> Option<EventId> {
        match self {
            Self::Vetoed => None,
            Self::Filtered { event_id } => Some(*event_id),
            Self::Delivered(report) => Some(report.event_id),
        }
    }

    /// Number of listeners invoked.
    #[must_use]
    pub const fn delivered_to(&self) -> usize {
        match self {
            Self::Delivered(report) => report.listeners,
            Self::Vetoed | Self::Filtered { .. } => 0,
        }
    }

    /// Label used for metrics and logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Vetoed => herald_telemetry::metrics::OUTCOME_VETOED,
            Self::Filtered { .. } => herald_telemetry::metrics::OUTCOME_FILTERED,
            Self::Delivered(_) => herald_telemetry::metrics::OUTCOME_DELIVERED,
        }
    }
}

/// Result of a `replay` call that did not fail.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReplayOutcome {
    /// Replay is disabled for this bus; the listener was not invoked.
    Disabled,
    /// The listener was invoked once per retained entry.
    Replayed {
        /// Entries handed to the listener.
        delivered: usize,
        /// Invocations that returned an error, panicked, or timed out.
        failures: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_outcome_accessors() {
        assert_eq!(EmitOutcome::Vetoed.event_id(), None);
        assert_eq!(EmitOutcome::Vetoed.label(), "vetoed");
        let filtered = EmitOutcome::Filtered { event_id: 4 };
        assert_eq!(filtered.event_id(), Some(4));
        assert_eq!(filtered.delivered_to(), 0);
        assert_eq!(filtered.label(), "filtered");

        let report = DispatchReport {
            event_id: 9,
            listeners: 3,
            failures: 1,
        };
        let delivered = EmitOutcome::Delivered(report);
        assert_eq!(delivered.event_id(), Some(9));
        assert_eq!(delivered.delivered_to(), 3);
        assert_eq!(report.succeeded(), 2);
    }

    #[test]
    fn outcomes_serialise_with_tag() -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(EmitOutcome::Filtered { event_id: 2 })?;
        assert_eq!(value["outcome"], "filtered");
        assert_eq!(value["event_id"], 2);

        let value = serde_json::to_value(ReplayOutcome::Replayed {
            delivered: 2,
            failures: 0,
        })?;
        assert_eq!(value["outcome"], "replayed");
        assert_eq!(value["delivered"], 2);
        Ok(())
    }

    #[test]
    fn envelope_round_trips_through_json() -> Result<(), serde_json::Error> {
        let envelope = EventEnvelope {
            metadata: EventMetadata {
                id: 1,
                timestamp: Utc::now(),
                topic: "user.created".to_string(),
                source: Some("signup".to_string()),
            },
            payload: serde_json::json!({ "name": "ada" }),
        };
        let json = serde_json::to_string(&envelope)?;
        let decoded: EventEnvelope<serde_json::Value> = serde_json::from_str(&json)?;
        assert_eq!(decoded, envelope);
        assert_eq!(decoded.topic(), "user.created");
        assert_eq!(decoded.id(), 1);
        Ok(())
    }

    #[test]
    fn empty_stats_are_zeroed() {
        let stats = TopicStats::empty("missing");
        assert_eq!(stats.topic, "missing");
        assert_eq!(stats.listener_count, 0);
        assert_eq!(stats.emit_count, 0);
        assert!(stats.last_emitted.is_none());
    }
}
