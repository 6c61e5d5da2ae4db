//! Bulk indicator collection.
//!
//! IP addresses, domains and hashes are gathered from every section, written
//! to flat side files for bulk threat-intel lookup, and reduced to unique
//! values for the dump sections at the end of the report.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::constants::{DOMAIN_SENTINELS, HASH_SENTINELS, IP_SENTINELS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IndicatorKind {
    Ip,
    Domain,
    Hash,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 3] = [IndicatorKind::Ip, IndicatorKind::Domain, IndicatorKind::Hash];

    /// Placeholder values that never count as an observation
    pub fn sentinels(&self) -> &'static [&'static str] {
        match self {
            IndicatorKind::Ip => IP_SENTINELS,
            IndicatorKind::Domain => DOMAIN_SENTINELS,
            IndicatorKind::Hash => HASH_SENTINELS,
        }
    }

    pub fn is_sentinel(&self, value: &str) -> bool {
        self.sentinels().contains(&value)
    }
}

/// Unique values with their duplicate counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FinalizedIndicators {
    /// `(value, duplicates)` in first-seen order
    pub values: Vec<(String, u64)>,
    /// Repeats of unique values plus every sentinel occurrence
    pub total_duplicates: u64,
}

impl FinalizedIndicators {
    pub fn unique_count(&self) -> usize {
        self.values.len()
    }
}

/// Append-only multiset of raw observed values
pub struct IndicatorAccumulator {
    kind: IndicatorKind,
    values: Vec<String>,
    side_file: Option<BufWriter<File>>,
}

impl std::fmt::Debug for IndicatorAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndicatorAccumulator")
            .field("kind", &self.kind)
            .field("values", &self.values.len())
            .field("side_file", &self.side_file.is_some())
            .finish()
    }
}

impl IndicatorAccumulator {
    pub fn new(kind: IndicatorKind) -> Self {
        Self {
            kind,
            values: Vec::new(),
            side_file: None,
        }
    }

    /// Mirror every accumulated value to `path`, one per line
    pub fn with_side_file(kind: IndicatorKind, path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create indicator file: {}", path.display()))?;
        Ok(Self {
            kind,
            values: Vec::new(),
            side_file: Some(BufWriter::new(file)),
        })
    }

    pub fn kind(&self) -> IndicatorKind {
        self.kind
    }

    /// Record one raw observation; no validation is applied
    pub fn accumulate(&mut self, value: &str) -> Result<()> {
        if let Some(writer) = self.side_file.as_mut() {
            writeln!(writer, "{}", value).context("Failed to write indicator file")?;
        }
        self.values.push(value.to_string());
        Ok(())
    }

    /// Number of raw observations so far
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Flush and close the side file, then reduce to unique values
    pub fn finalize(&mut self) -> Result<FinalizedIndicators> {
        if let Some(mut writer) = self.side_file.take() {
            writer.flush().context("Failed to flush indicator file")?;
        }

        let mut result = FinalizedIndicators::default();
        // Value to its position in `result.values`
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for value in &self.values {
            if self.kind.is_sentinel(value) {
                result.total_duplicates += 1;
                continue;
            }
            match seen.get(value.as_str()) {
                Some(&idx) => {
                    result.values[idx].1 += 1;
                    result.total_duplicates += 1;
                }
                None => {
                    seen.insert(value, result.values.len());
                    result.values.push((value.clone(), 0));
                }
            }
        }
        Ok(result)
    }
}
