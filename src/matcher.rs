//! IOC tagging.
//!
//! Every scan of a record increments the counter of each pattern it matches.
//! A record that is scanned by two sections is therefore counted twice; the
//! summary reports occurrences per scan, not distinct records.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::models::NormalizedRecord;

/// A configured pattern and the number of scans it has matched so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IocEntry {
    pub pattern: String,
    pub hits: u64,
}

/// Outcome of scanning one record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagResult {
    pub matched: bool,
    /// Indices into the IOC list of every pattern that matched
    pub matched_patterns: BTreeSet<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct IndicatorMatcher {
    entries: Vec<IocEntry>,
}

impl IndicatorMatcher {
    /// Build from already case-folded patterns, keeping their order
    pub fn new(patterns: &[String]) -> Self {
        let entries = patterns
            .iter()
            .map(|pattern| IocEntry {
                pattern: pattern.to_lowercase(),
                hits: 0,
            })
            .collect();
        Self { entries }
    }

    /// Scan a record's joined field values
    pub fn tag(&mut self, record: &NormalizedRecord) -> TagResult {
        self.tag_text(&record.joined_text())
    }

    /// Scan free text, counting every matching pattern once
    pub fn tag_text(&mut self, text: &str) -> TagResult {
        let mut result = TagResult::default();
        if self.entries.is_empty() {
            return result;
        }

        let folded = text.to_lowercase();
        for (idx, entry) in self.entries.iter_mut().enumerate() {
            if folded.contains(entry.pattern.as_str()) {
                entry.hits += 1;
                result.matched_patterns.insert(idx);
            }
        }
        result.matched = !result.matched_patterns.is_empty();
        result
    }

    /// Check text without touching the counters, used when re-displaying
    /// values that were already counted
    pub fn matches(&self, text: &str) -> bool {
        let folded = text.to_lowercase();
        self.entries
            .iter()
            .any(|entry| folded.contains(entry.pattern.as_str()))
    }

    pub fn entries(&self) -> &[IocEntry] {
        &self.entries
    }

    /// Sum of all pattern counters
    pub fn total_hits(&self) -> u64 {
        self.entries.iter().map(|entry| entry.hits).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
