//! Subscription registry: pattern keys mapped to listener sets.

use std::collections::{HashMap, HashSet};

use crate::listener::{Listener, ListenerId};
use crate::topics::TopicPattern;

struct PatternEntry<T> {
    pattern: TopicPattern,
    listeners: Vec<Listener<T>>,
}

/// Listener sets keyed by the pattern they were registered under.
///
/// Sets are created on first subscription and dropped once empty, so the map
/// only ever holds live patterns.
pub(crate) struct Registry<T> {
    entries: HashMap<String, PatternEntry<T>>,
}

impl<T> Registry<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Add `listener` under `pattern` and return the resulting set size.
    ///
    /// A listener already present in the set is not added twice.
    pub(crate) fn add(&mut self, pattern: &str, listener: Listener<T>) -> usize {
        let entry = self
            .entries
            .entry(pattern.to_string())
            .or_insert_with(|| PatternEntry {
                pattern: TopicPattern::new(pattern),
                listeners: Vec::new(),
            });
        if !entry.listeners.iter().any(|known| known.id() == listener.id()) {
            entry.listeners.push(listener);
        }
        entry.listeners.len()
    }

    /// Remove `id` from `pattern`'s set. Returns whether anything was removed.
    pub(crate) fn remove(&mut self, pattern: &str, id: ListenerId) -> bool {
        let Some(entry) = self.entries.get_mut(pattern) else {
            return false;
        };
        let before = entry.listeners.len();
        entry.listeners.retain(|listener| listener.id() != id);
        let removed = entry.listeners.len() != before;
        if entry.listeners.is_empty() {
            self.entries.remove(pattern);
        }
        removed
    }

    pub(crate) fn contains(&self, pattern: &str, id: ListenerId) -> bool {
        self.entries
            .get(pattern)
            .is_some_and(|entry| entry.listeners.iter().any(|listener| listener.id() == id))
    }

    /// Drop the whole set for `pattern`, returning how many listeners it held.
    pub(crate) fn remove_pattern(&mut self, pattern: &str) -> usize {
        self.entries
            .remove(pattern)
            .map_or(0, |entry| entry.listeners.len())
    }

    pub(crate) fn count(&self, pattern: &str) -> usize {
        self.entries
            .get(pattern)
            .map_or(0, |entry| entry.listeners.len())
    }

    /// Registered pattern keys, sorted.
    pub(crate) fn patterns(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Every listener that should receive an emission on `topic`.
    ///
    /// The exact set comes first, followed by wildcard sets in key order.
    /// Each listener appears at most once.
    pub(crate) fn resolve(&self, topic: &str) -> Vec<Listener<T>> {
        let mut seen = HashSet::new();
        let mut resolved = Vec::new();

        if let Some(entry) = self.entries.get(topic) {
            for listener in &entry.listeners {
                if seen.insert(listener.id()) {
                    resolved.push(listener.clone());
                }
            }
        }

        let mut wildcards: Vec<&PatternEntry<T>> = self
            .entries
            .iter()
            .filter(|(key, entry)| key.as_str() != topic && entry.pattern.is_wildcard())
            .map(|(_, entry)| entry)
            .collect();
        wildcards.sort_unstable_by(|left, right| left.pattern.as_str().cmp(right.pattern.as_str()));

        for entry in wildcards {
            if !entry.pattern.matches(topic) {
                continue;
            }
            for listener in &entry.listeners {
                if seen.insert(listener.id()) {
                    resolved.push(listener.clone());
                }
            }
        }
        resolved
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
