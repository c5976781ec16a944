//! Bounded per-topic history of delivered envelopes.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::payloads::EventEnvelope;

/// Ring buffers of past emissions, one per literal topic.
pub(crate) struct HistoryStore<T> {
    topics: HashMap<String, VecDeque<Arc<EventEnvelope<T>>>>,
}

impl<T> HistoryStore<T> {
    pub(crate) fn new() -> Self {
        Self {
            topics: HashMap::new(),
        }
    }

    /// Append `envelope`, evicting the oldest entries beyond `limit`.
    pub(crate) fn record(&mut self, topic: &str, envelope: Arc<EventEnvelope<T>>, limit: usize) {
        if limit == 0 {
            return;
        }
        let entries = self.topics.entry(topic.to_string()).or_default();
        while entries.len() >= limit {
            let _ = entries.pop_front();
        }
        entries.push_back(envelope);
    }

    /// Entries for `topic`, oldest first, keeping only the newest `limit`.
    pub(crate) fn entries(&self, topic: &str, limit: Option<usize>) -> Vec<Arc<EventEnvelope<T>>> {
        let Some(entries) = self.topics.get(topic) else {
            return Vec::new();
        };
        let skip = limit.map_or(0, |limit| entries.len().saturating_sub(limit));
        entries.iter().skip(skip).cloned().collect()
    }

    pub(crate) fn remove(&mut self, topic: &str) {
        self.topics.remove(topic);
    }

    pub(crate) fn clear(&mut self) {
        self.topics.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payloads::EventMetadata;
    use chrono::Utc;

    fn envelope(id: u64, payload: i32) -> Arc<EventEnvelope<i32>> {
        Arc::new(EventEnvelope {
            metadata: EventMetadata {
                id,
                timestamp: Utc::now(),
                topic: "n".to_string(),
                source: None,
            },
            payload,
        })
    }

    fn payloads(entries: &[Arc<EventEnvelope<i32>>]) -> Vec<i32> {
        entries.iter().map(|entry| entry.payload).collect()
    }

    #[test]
    fn ring_evicts_oldest_first() {
        let mut store = HistoryStore::new();
        for value in 1..=5 {
            store.record("n", envelope(u64::try_from(value).unwrap_or(0), value), 3);
        }
        assert_eq!(payloads(&store.entries("n", None)), vec![3, 4, 5]);
    }

    #[test]
    fn limit_keeps_most_recent() {
        let mut store = HistoryStore::new();
        for value in 1..=3 {
            store.record("n", envelope(1, value), 10);
        }
        assert_eq!(payloads(&store.entries("n", Some(2))), vec![2, 3]);
        assert_eq!(payloads(&store.entries("n", Some(10))), vec![1, 2, 3]);
        assert!(store.entries("n", Some(0)).is_empty());
        assert!(store.entries("other", None).is_empty());
    }

    #[test]
    fn zero_limit_records_nothing() {
        let mut store = HistoryStore::new();
        store.record("n", envelope(1, 1), 0);
        assert!(store.entries("n", None).is_empty());
    }

    #[test]
    fn remove_and_clear() {
        let mut store = HistoryStore::new();
        store.record("a", envelope(1, 1), 5);
        store.record("b", envelope(2, 2), 5);
        store.remove("a");
        assert!(store.entries("a", None).is_empty());
        assert_eq!(store.entries("b", None).len(), 1);
        store.clear();
        assert!(store.entries("b", None).is_empty());
    }
}
