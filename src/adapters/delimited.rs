use std::path::Path;

use anyhow::Result;

use crate::adapters::{read_rows, SchemaAdapter};
use crate::models::{NormalizedRecord, SourceKind};

/// Predicate deciding whether a raw row belongs to the table
pub type RowFilter = fn(&[String]) -> bool;

/// One projected output column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    At(usize),
    /// Two source columns shown as one, separated by a space
    Concat(usize, usize),
}

impl Column {
    fn value(&self, row: &[String]) -> String {
        let cell = |idx: usize| row.get(idx).map(String::as_str).unwrap_or("");
        match *self {
            Column::At(idx) => cell(idx).to_string(),
            Column::Concat(first, second) => {
                format!("{} {}", cell(first), cell(second)).trim().to_string()
            }
        }
    }

    fn label(&self, header: &[String]) -> String {
        let cell = |idx: usize| header.get(idx).map(String::as_str).unwrap_or("");
        match *self {
            Column::At(idx) => cell(idx).to_string(),
            Column::Concat(first, _) => cell(first).to_string(),
        }
    }
}

/// Projection of a delimited export onto a fixed column list
#[derive(Debug, Clone)]
pub struct ColumnAdapter {
    kind: SourceKind,
    delimiter: u8,
    min_columns: usize,
    /// Empty projection keeps every column of the row
    columns: Vec<Column>,
    labels: Vec<String>,
    has_header: bool,
    filter: Option<RowFilter>,
}

/// A loaded export: projected header plus normalized data rows
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub header: Vec<String>,
    pub records: Vec<NormalizedRecord>,
}

impl ColumnAdapter {
    /// Adapter for a file whose first row is a header
    pub fn new(kind: SourceKind, delimiter: u8, min_columns: usize, columns: &[usize]) -> Self {
        Self {
            kind,
            delimiter,
            min_columns,
            columns: columns.iter().map(|idx| Column::At(*idx)).collect(),
            labels: Vec::new(),
            has_header: true,
            filter: None,
        }
    }

    /// Replace the projection with explicit columns
    pub fn with_columns(mut self, columns: Vec<Column>) -> Self {
        self.columns = columns;
        self
    }

    /// Use fixed labels for a file without a header row
    pub fn headerless(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|label| label.to_string()).collect();
        self.has_header = false;
        self
    }

    pub fn with_filter(mut self, filter: RowFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    fn project(&self, row: &[String]) -> Vec<String> {
        if self.columns.is_empty() {
            row.to_vec()
        } else {
            self.columns.iter().map(|column| column.value(row)).collect()
        }
    }

    fn label_for(&self, header: &[String]) -> Vec<String> {
        if self.columns.is_empty() {
            header.to_vec()
        } else {
            self.columns.iter().map(|column| column.label(header)).collect()
        }
    }

    /// Split parsed rows into header and records.
    ///
    /// The header row is neither counted nor filtered.
    pub fn table_from_rows(&self, rows: &[Vec<String>]) -> Table {
        let (labels, body) = if self.has_header {
            match rows.split_first() {
                Some((header, rest)) => (self.label_for(header), rest),
                None => return Table::default(),
            }
        } else {
            (self.labels.clone(), rows)
        };

        let labeled = ColumnAdapter {
            labels: labels.clone(),
            ..self.clone()
        };
        let records = body.iter().filter_map(|row| labeled.adapt(row)).collect();

        Table {
            header: labels,
            records,
        }
    }

    /// Read `path` and build its table
    pub fn load_table(&self, path: &Path) -> Result<Table> {
        let rows = read_rows(path, self.delimiter)?;
        Ok(self.table_from_rows(&rows))
    }
}

impl SchemaAdapter for ColumnAdapter {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn delimiter(&self) -> u8 {
        self.delimiter
    }

    fn min_columns(&self) -> usize {
        self.min_columns
    }

    fn normalize(&self, row: &[String]) -> Option<NormalizedRecord> {
        if let Some(filter) = self.filter {
            if !filter(row) {
                return None;
            }
        }

        let values = self.project(row);
        let record = values
            .into_iter()
            .enumerate()
            .fold(NormalizedRecord::new(self.kind), |record, (idx, value)| {
                let name = self
                    .labels
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| format!("Column {}", idx + 1));
                record.with_field(name, value)
            });
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::parse_rows;

    #[test]
    fn test_projection_and_header() {
        let rows = parse_rows(
            "Date,Machine,LoginID,LoginMachine,LogonType,RemoteIP\n\
             2024-01-01,HOST,bob,WS1,10,203.0.113.9\n\
             short,row\n",
            b',',
        );
        let adapter = ColumnAdapter::new(SourceKind::LoginEvent, b',', 6, &[0, 2, 5]);
        let table = adapter.table_from_rows(&rows);

        assert_eq!(table.header, vec!["Date", "LoginID", "RemoteIP"]);
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].field("RemoteIP"), Some("203.0.113.9"));
    }

    #[test]
    fn test_empty_projection_keeps_all_columns() {
        let rows = parse_rows("a,b,c\n1,2,3\n", b',');
        let table = ColumnAdapter::new(SourceKind::Detection, b',', 2, &[]).table_from_rows(&rows);
        assert_eq!(table.header.len(), 3);
        assert_eq!(table.records[0].values().collect::<Vec<_>>(), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_filter_and_concat() {
        fn run_keys(row: &[String]) -> bool {
            row[1].to_lowercase().contains("currentversion\\run")
        }
        let rows = parse_rows(
            "Time,Entry Location,Entry,Launch,Args\n\
             t1,HKLM\\Software\\Microsoft\\Windows\\CurrentVersion\\Run,evil,c:\\evil.exe,-q\n\
             t2,HKLM\\System\\Services,svc,c:\\svc.exe,\n",
            b',',
        );
        let adapter = ColumnAdapter::new(SourceKind::AutoRunEntry, b',', 5, &[])
            .with_columns(vec![Column::At(2), Column::Concat(3, 4)])
            .with_filter(run_keys);
        let table = adapter.table_from_rows(&rows);

        assert_eq!(table.header, vec!["Entry", "Launch"]);
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].field("Launch"), Some("c:\\evil.exe -q"));
    }

    #[test]
    fn test_headerless_labels() {
        let rows = parse_rows("C:\\a.exe|2024-01-01 10:00:00\n", b'|');
        let adapter = ColumnAdapter::new(SourceKind::ProgramLaunch, b'|', 2, &[1, 0])
            .headerless(&["Executed", "Path"]);
        let table = adapter.table_from_rows(&rows);
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.records[0].field("Path"), Some("C:\\a.exe"));
    }

    #[test]
    fn test_empty_file_gives_empty_table() {
        let adapter = ColumnAdapter::new(SourceKind::Prefetch, b',', 8, &[0]);
        let table = adapter.table_from_rows(&[]);
        assert!(table.header.is_empty());
        assert!(table.records.is_empty());
    }
}
