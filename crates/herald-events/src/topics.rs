//! Topic pattern matching.
//!
//! # Design
//! - `*` matches zero or more of any character, including `.`; it is not
//!   limited to one dot-delimited segment.
//! - Every other character is literal. Patterns are escaped before the
//!   wildcard is expanded, so regex metacharacters never leak through.
//! - Matching is total: any pair of strings yields a boolean.

use regex::Regex;

/// Wildcard token recognised inside subscription patterns.
pub const WILDCARD: char = '*';

/// Whether `pattern` contains the wildcard token.
#[must_use]
pub fn is_wildcard(pattern: &str) -> bool {
    pattern.contains(WILDCARD)
}

/// Does `topic` match `pattern`?
#[must_use]
pub fn matches(pattern: &str, topic: &str) -> bool {
    if pattern == topic {
        return true;
    }
    if !is_wildcard(pattern) {
        return false;
    }
    TopicPattern::new(pattern).matches(topic)
}

/// A subscription pattern compiled once for repeated matching.
#[derive(Debug, Clone)]
pub struct TopicPattern {
    raw: String,
    compiled: Option<Regex>,
}

impl TopicPattern {
    /// Compile `pattern`. Exact patterns skip regex compilation entirely.
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let compiled = if is_wildcard(pattern) {
            Regex::new(&wildcard_regex(pattern)).ok()
        } else {
            None
        };
        Self {
            raw: pattern.to_string(),
            compiled,
        }
    }

    /// The pattern as registered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the pattern contains a wildcard.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        is_wildcard(&self.raw)
    }

    /// Does `topic` match this pattern?
    #[must_use]
    pub fn matches(&self, topic: &str) -> bool {
        if self.raw == topic {
            return true;
        }
        match &self.compiled {
            Some(regex) => regex.is_match(topic),
            None if self.is_wildcard() => wildcard_match(&self.raw, topic),
            None => false,
        }
    }
}

fn wildcard_regex(pattern: &str) -> String {
    let body = pattern
        .split(WILDCARD)
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    format!("(?s)^{body}$")
}

// Used only when the regex exceeds the compiled size limit.
fn wildcard_match(pattern: &str, topic: &str) -> bool {
    let mut parts = pattern.split(WILDCARD);
    let Some(first) = parts.next() else {
        return false;
    };
    let Some(mut rest) = topic.strip_prefix(first) else {
        return false;
    };
    let parts: Vec<&str> = parts.collect();
    let Some((last, middle)) = parts.split_last() else {
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(index) => rest = &rest[index + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}
