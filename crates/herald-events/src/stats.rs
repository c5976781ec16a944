//! Per-topic usage counters.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::payloads::TopicStats;

pub(crate) struct StatsTracker {
    topics: HashMap<String, TopicStats>,
}

impl StatsTracker {
    pub(crate) fn new() -> Self {
        Self {
            topics: HashMap::new(),
        }
    }

    fn entry(&mut self, topic: &str) -> &mut TopicStats {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| TopicStats::empty(topic))
    }

    /// Set the exact-pattern listener count, creating the entry if needed.
    pub(crate) fn set_listener_count(&mut self, topic: &str, count: usize) {
        self.entry(topic).listener_count = count;
    }

    /// Update the listener count of an existing entry only.
    pub(crate) fn refresh_listener_count(&mut self, topic: &str, count: usize) {
        if let Some(stats) = self.topics.get_mut(topic) {
            stats.listener_count = count;
        }
    }

    pub(crate) fn record_emit(&mut self, topic: &str, at: DateTime<Utc>) {
        let stats = self.entry(topic);
        stats.emit_count = stats.emit_count.saturating_add(1);
        stats.last_emitted = Some(at);
    }

    pub(crate) fn get(&self, topic: &str) -> TopicStats {
        self.topics
            .get(topic)
            .cloned()
            .unwrap_or_else(|| TopicStats::empty(topic))
    }

    /// Every tracked topic, sorted by key.
    pub(crate) fn all(&self) -> Vec<TopicStats> {
        let mut all: Vec<TopicStats> = self.topics.values().cloned().collect();
        all.sort_unstable_by(|left, right| left.topic.cmp(&right.topic));
        all
    }

    pub(crate) fn clear(&mut self) {
        self.topics.clear();
    }
}
