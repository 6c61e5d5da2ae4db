//! MFT parser output.
//!
//! The two supported parsers disagree on delimiter, flag encoding and column
//! positions. [`MftSchema`] captures one dialect; [`MftAdapter`] applies it.

use std::path::Path;

use anyhow::Result;

use crate::adapters::{read_rows, SchemaAdapter};
use crate::constants::{LARGE_FILE_FLOOR, MEDIUM_FILE_FLOOR, SMALL_FILE_FLOOR};
use crate::locator::MftBackend;
use crate::models::{NormalizedRecord, SourceKind};

pub const FIELD_PATH: &str = "Full Path";
pub const FIELD_CREATED: &str = "Created";
pub const FIELD_ACCESSED: &str = "Accessed";
pub const FIELD_MODIFIED: &str = "Modified";
pub const FIELD_SIZE: &str = "Size";

/// Where a dialect keeps the full path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathColumns {
    /// Already joined by the parser
    Joined(usize),
    /// Directory and file name in separate columns
    Split { dir: usize, file: usize },
}

/// Column layout of one MFT parser dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MftSchema {
    pub delimiter: u8,
    pub flag_column: usize,
    pub active_flag: &'static str,
    pub deleted_flag: &'static str,
    pub size_column: usize,
    pub path: PathColumns,
    pub created_column: usize,
    pub accessed_column: usize,
    pub modified_column: usize,
    pub min_columns: usize,
    /// First row names the columns
    pub has_header: bool,
}

impl MftSchema {
    pub fn for_backend(backend: MftBackend) -> Self {
        match backend {
            MftBackend::MftDump => MftSchema {
                delimiter: b'\t',
                flag_column: 1,
                active_flag: "0",
                deleted_flag: "1",
                size_column: 10,
                path: PathColumns::Joined(13),
                created_column: 6,
                accessed_column: 7,
                modified_column: 8,
                min_columns: 14,
                has_header: false,
            },
            MftBackend::MftECmd => MftSchema {
                delimiter: b',',
                flag_column: 2,
                active_flag: "True",
                deleted_flag: "False",
                size_column: 8,
                path: PathColumns::Split { dir: 5, file: 6 },
                created_column: 19,
                accessed_column: 25,
                modified_column: 21,
                min_columns: 14,
                has_header: true,
            },
        }
    }
}

/// Size classes used by the deleted and active file sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SizeBucket {
    Small,
    Medium,
    Large,
}

impl SizeBucket {
    /// Bucket for a size in bytes, `None` for files of 1,000,000 bytes or less
    pub fn classify(size: u64) -> Option<SizeBucket> {
        if size >= LARGE_FILE_FLOOR {
            Some(SizeBucket::Large)
        } else if size >= MEDIUM_FILE_FLOOR {
            Some(SizeBucket::Medium)
        } else if size > SMALL_FILE_FLOOR {
            Some(SizeBucket::Small)
        } else {
            None
        }
    }
}

/// Parse a size column; short, non-numeric or overflowing values become 0
pub fn parse_size(raw: &str) -> u64 {
    let raw = raw.trim();
    if raw.len() < 2 {
        return 0;
    }
    raw.parse::<u64>().unwrap_or(0)
}

/// Join a directory and file name with a single Windows separator
pub fn join_windows_path(dir: &str, file: &str) -> String {
    let dir = dir.trim_end_matches('\\');
    let file = file.trim_start_matches('\\');
    if dir.is_empty() {
        file.to_string()
    } else {
        format!("{}\\{}", dir, file)
    }
}

/// Executables under any `\temp\` directory
pub fn is_temp_exe(path: &str) -> bool {
    let lower = path.to_lowercase();
    lower.contains("\\temp\\") && lower.contains(".exe")
}

/// Normalizes MFT rows of one dialect
#[derive(Debug, Clone, Copy)]
pub struct MftAdapter {
    schema: MftSchema,
}

impl MftAdapter {
    pub fn new(backend: MftBackend) -> Self {
        Self {
            schema: MftSchema::for_backend(backend),
        }
    }

    pub fn schema(&self) -> &MftSchema {
        &self.schema
    }

    fn full_path(&self, row: &[String]) -> String {
        match self.schema.path {
            PathColumns::Joined(col) => row[col].clone(),
            PathColumns::Split { dir, file } => join_windows_path(&row[dir], &row[file]),
        }
    }

    /// Record for a valid row whose flag matched neither sentinel.
    ///
    /// It joins no stream but is still scanned for indicators.
    pub fn unclassified(&self, row: &[String]) -> Option<NormalizedRecord> {
        if row.len() < self.schema.min_columns {
            return None;
        }
        Some(self.build(row, SourceKind::ActiveFile))
    }

    fn build(&self, row: &[String], kind: SourceKind) -> NormalizedRecord {
        // Timestamp columns may lie past the minimum width; absent ones are blank
        let cell = |idx: usize| row.get(idx).cloned().unwrap_or_default();
        let size = parse_size(&row[self.schema.size_column]);
        NormalizedRecord::new(kind)
            .with_field(FIELD_PATH, self.full_path(row))
            .with_field(FIELD_CREATED, cell(self.schema.created_column))
            .with_field(FIELD_ACCESSED, cell(self.schema.accessed_column))
            .with_field(FIELD_MODIFIED, cell(self.schema.modified_column))
            .with_field(FIELD_SIZE, size.to_string())
            .with_size(size)
    }

    /// Read a parser output file into deleted and active streams
    pub fn load_streams(&self, path: &Path) -> Result<MftStreams> {
        let rows = read_rows(path, self.schema.delimiter)?;
        Ok(self.split_rows(&rows))
    }

    pub fn split_rows(&self, rows: &[Vec<String>]) -> MftStreams {
        let mut streams = MftStreams::default();
        let body = match rows.split_first() {
            Some((_, rest)) if self.schema.has_header => rest,
            _ => rows,
        };
        for row in body {
            if row.len() < self.schema.min_columns {
                continue;
            }
            match self.normalize(row) {
                Some(record) if record.deleted == Some(true) => streams.deleted.push(record),
                Some(record) => streams.active.push(record),
                None => {
                    if let Some(record) = self.unclassified(row) {
                        streams.unclassified.push(record);
                    }
                }
            }
        }
        streams
    }
}

impl SchemaAdapter for MftAdapter {
    fn kind(&self) -> SourceKind {
        SourceKind::ActiveFile
    }

    fn delimiter(&self) -> u8 {
        self.schema.delimiter
    }

    fn min_columns(&self) -> usize {
        self.schema.min_columns
    }

    fn normalize(&self, row: &[String]) -> Option<NormalizedRecord> {
        let flag = row[self.schema.flag_column].as_str();
        if flag == self.schema.deleted_flag {
            Some(self.build(row, SourceKind::DeletedFile).with_deleted(true))
        } else if flag == self.schema.active_flag {
            Some(self.build(row, SourceKind::ActiveFile).with_deleted(false))
        } else {
            None
        }
    }
}

/// Normalized MFT rows split by allocation state
#[derive(Debug, Clone, Default)]
pub struct MftStreams {
    pub deleted: Vec<NormalizedRecord>,
    pub active: Vec<NormalizedRecord>,
    /// Rows whose flag matched neither sentinel
    pub unclassified: Vec<NormalizedRecord>,
}

impl MftStreams {
    /// Every valid row, deleted first
    pub fn all(&self) -> impl Iterator<Item = &NormalizedRecord> {
        self.deleted
            .iter()
            .chain(self.active.iter())
            .chain(self.unclassified.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.deleted.is_empty() && self.active.is_empty() && self.unclassified.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ecmd_row(in_use: &str, dir: &str, file: &str, size: &str) -> Vec<String> {
        let mut row = vec![String::new(); 26];
        row[2] = in_use.to_string();
        row[5] = dir.to_string();
        row[6] = file.to_string();
        row[8] = size.to_string();
        row[19] = "2024-01-01 10:00:00".to_string();
        row[21] = "2024-01-03 10:00:00".to_string();
        row[25] = "2024-01-02 10:00:00".to_string();
        row
    }

    fn dump_row(flag: &str, path: &str, size: &str) -> Vec<String> {
        let mut row = vec![String::new(); 14];
        row[1] = flag.to_string();
        row[6] = "c".to_string();
        row[7] = "a".to_string();
        row[8] = "m".to_string();
        row[10] = size.to_string();
        row[13] = path.to_string();
        row
    }

    #[test]
    fn test_mftecmd_active_small_file() {
        let adapter = MftAdapter::new(MftBackend::MftECmd);
        let record = adapter
            .adapt(&ecmd_row("True", ".\\Users\\bob", "notes.docx", "5000000"))
            .unwrap();
        assert_eq!(record.deleted, Some(false));
        assert_eq!(record.kind, SourceKind::ActiveFile);
        assert_eq!(record.field(FIELD_PATH), Some(".\\Users\\bob\\notes.docx"));
        assert_eq!(record.field(FIELD_CREATED), Some("2024-01-01 10:00:00"));
        assert_eq!(record.field(FIELD_ACCESSED), Some("2024-01-02 10:00:00"));
        assert_eq!(record.field(FIELD_MODIFIED), Some("2024-01-03 10:00:00"));
        assert_eq!(SizeBucket::classify(record.size.unwrap()), Some(SizeBucket::Small));
    }

    #[test]
    fn test_mftecmd_deleted_flag() {
        let adapter = MftAdapter::new(MftBackend::MftECmd);
        let record = adapter.adapt(&ecmd_row("False", "", "gone.exe", "12")).unwrap();
        assert_eq!(record.deleted, Some(true));
        assert_eq!(record.field(FIELD_PATH), Some("gone.exe"));
    }

    #[test]
    fn test_mftdump_columns() {
        let adapter = MftAdapter::new(MftBackend::MftDump);
        let record = adapter
            .adapt(&dump_row("1", "C:\\Temp\\x.exe", "20000000"))
            .unwrap();
        assert_eq!(record.deleted, Some(true));
        assert_eq!(record.field(FIELD_PATH), Some("C:\\Temp\\x.exe"));
        assert_eq!(record.size, Some(20_000_000));
        assert_eq!(adapter.delimiter(), b'\t');
    }

    #[test]
    fn test_unknown_flag_joins_no_stream() {
        let adapter = MftAdapter::new(MftBackend::MftDump);
        let rows = vec![dump_row("7", "C:\\odd.bin", "99")];
        let streams = adapter.split_rows(&rows);
        assert!(streams.deleted.is_empty());
        assert!(streams.active.is_empty());
        assert_eq!(streams.unclassified.len(), 1);
    }

    #[test]
    fn test_short_rows_are_dropped_everywhere() {
        let adapter = MftAdapter::new(MftBackend::MftECmd);
        let header = ecmd_row("InUse", "ParentPath", "FileName", "FileSize");
        let mut short = ecmd_row("True", "d", "f", "5000000");
        short.truncate(13);
        let streams = adapter.split_rows(&[header, short]);
        assert!(streams.is_empty());
    }

    #[test]
    fn test_mftecmd_header_is_not_a_record() {
        let adapter = MftAdapter::new(MftBackend::MftECmd);
        let header = ecmd_row("InUse", "ParentPath", "FileName", "FileSize");
        let rows = vec![header, ecmd_row("True", ".\\Data", "disk.vhd", "200000000")];

        let streams = adapter.split_rows(&rows);
        assert_eq!(streams.active.len(), 1);
        assert!(streams.deleted.is_empty());
        assert!(streams.unclassified.is_empty());
    }

    #[test]
    fn test_parse_size_coercions() {
        assert_eq!(parse_size("7"), 0);
        assert_eq!(parse_size("abc"), 0);
        assert_eq!(parse_size("99999999999999999999999"), 0);
        assert_eq!(parse_size("1024"), 1024);
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(SizeBucket::classify(1_000_000), None);
        assert_eq!(SizeBucket::classify(1_000_001), Some(SizeBucket::Small));
        assert_eq!(SizeBucket::classify(9_999_999), Some(SizeBucket::Small));
        assert_eq!(SizeBucket::classify(10_000_000), Some(SizeBucket::Medium));
        assert_eq!(SizeBucket::classify(99_999_999), Some(SizeBucket::Medium));
        assert_eq!(SizeBucket::classify(100_000_000), Some(SizeBucket::Large));
    }

    #[test]
    fn test_join_windows_path() {
        assert_eq!(join_windows_path("C:\\dir\\", "\\f.txt"), "C:\\dir\\f.txt");
        assert_eq!(join_windows_path("", "f.txt"), "f.txt");
        assert_eq!(join_windows_path(".", "f.txt"), ".\\f.txt");
    }

    #[test]
    fn test_temp_exe_filter() {
        assert!(is_temp_exe("C:\\Users\\x\\AppData\\Local\\TEMP\\a.EXE"));
        assert!(!is_temp_exe("C:\\Temp.exe"));
        assert!(!is_temp_exe("C:\\Windows\\Temp\\a.dll"));
    }

    proptest! {
        #[test]
        fn prop_every_bucketed_size_is_above_floor(size in 0u64..1_000_000_000) {
            match SizeBucket::classify(size) {
                Some(SizeBucket::Small) => prop_assert!(size > 1_000_000 && size < 10_000_000),
                Some(SizeBucket::Medium) => prop_assert!((10_000_000..100_000_000).contains(&size)),
                Some(SizeBucket::Large) => prop_assert!(size >= 100_000_000),
                None => prop_assert!(size <= 1_000_000),
            }
        }
    }
}
