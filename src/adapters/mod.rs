//! Schema adapters.
//!
//! Each upstream tool writes its own column layout. An adapter knows one
//! layout and turns its rows into [`NormalizedRecord`]s so the matching and
//! rendering code never sees backend-specific column numbers.
//!
//! - [`mft`]: both MFT parser dialects
//! - [`delimited`]: header-plus-rows CSV exports with a column projection
//! - [`text`]: line-oriented tool output (ipconfig, RBCmd, RegRipper, netstat, task XML)

pub mod delimited;
pub mod mft;
pub mod text;

use std::path::Path;

use anyhow::Result;
use csv::ReaderBuilder;
use log::debug;

use crate::models::{NormalizedRecord, SourceKind};
use crate::utils::files::read_lossy;

/// Converts one backend's raw rows into normalized records
pub trait SchemaAdapter {
    /// Record kind produced by this adapter
    fn kind(&self) -> SourceKind;

    /// Field delimiter of the upstream file
    fn delimiter(&self) -> u8;

    /// Rows shorter than this are malformed and dropped
    fn min_columns(&self) -> usize;

    /// Normalize a row that already satisfies `min_columns`.
    ///
    /// `None` means the row is valid but belongs to no stream.
    fn normalize(&self, row: &[String]) -> Option<NormalizedRecord>;

    /// Normalize a row, dropping it silently when it is too short
    fn adapt(&self, row: &[String]) -> Option<NormalizedRecord> {
        if row.len() < self.min_columns() {
            return None;
        }
        self.normalize(row)
    }

    /// Read and normalize every row of `path`
    fn load(&self, path: &Path) -> Result<Vec<NormalizedRecord>> {
        let rows = read_rows(path, self.delimiter())?;
        Ok(rows.iter().filter_map(|row| self.adapt(row)).collect())
    }
}

/// Split delimited text into rows of fields.
///
/// No header handling and no fixed width; rows keep whatever fields they have.
pub fn parse_rows(text: &str, delimiter: u8) -> Vec<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        match result {
            Ok(record) => rows.push(record.iter().map(str::to_string).collect()),
            Err(e) => debug!("Skipping unreadable row: {}", e),
        }
    }
    rows
}

/// Read a delimited tool output file as lossy UTF-8 with NUL bytes removed
pub fn read_rows(path: &Path, delimiter: u8) -> Result<Vec<Vec<String>>> {
    let text = read_lossy(path)?;
    Ok(parse_rows(&text, delimiter))
}
