//! Per-topic filter lists.
//!
//! Filters are keyed by the literal emitted topic and never take part in
//! wildcard resolution. Evaluation is all-or-nothing: one failing filter
//! suppresses the entire listener set for that emission.

use std::collections::HashMap;

use crate::listener::Filter;
use crate::payloads::EventMetadata;

pub(crate) struct FilterEngine<T> {
    filters: HashMap<String, Vec<Filter<T>>>,
}

impl<T> FilterEngine<T> {
    pub(crate) fn new() -> Self {
        Self {
            filters: HashMap::new(),
        }
    }

    pub(crate) fn add(&mut self, topic: &str, filter: Filter<T>) {
        self.filters
            .entry(topic.to_string())
            .or_default()
            .push(filter);
    }

    /// Clone the filters registered for `topic` so they can run unlocked.
    pub(crate) fn snapshot(&self, topic: &str) -> Vec<Filter<T>> {
        self.filters.get(topic).cloned().unwrap_or_default()
    }

    pub(crate) fn remove(&mut self, topic: &str) {
        self.filters.remove(topic);
    }

    pub(crate) fn clear(&mut self) {
        self.filters.clear();
    }
}

/// True when every filter accepts the payload; stops at the first rejection.
pub(crate) fn passes<T>(filters: &[Filter<T>], payload: &T, metadata: &EventMetadata) -> bool {
    filters.iter().all(|filter| filter.allows(payload, metadata))
}
