use serde::{Deserialize, Serialize};

/// Artifact family a normalized record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    DeletedFile,
    ActiveFile,
    LoginEvent,
    Connection,
    AutoRunEntry,
    ScheduledTask,
    DnsRecord,
    ShellBagEntry,
    BrowserVisit,
    Download,
    Prefetch,
    ProgramLaunch,
    UserAssist,
    LinkFile,
    RecycledFile,
    ServiceInstall,
    Detection,
    AmCacheEntry,
    PowerShellLine,
    SystemInfo,
}

/// One row from an upstream tool, reduced to named string fields.
///
/// Records are built once by an adapter and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub kind: SourceKind,
    pub fields: Vec<(String, String)>,
    /// Numeric size for file records, zero when the source value was unusable
    pub size: Option<u64>,
    /// Deleted/active classification for MFT records
    pub deleted: Option<bool>,
}

impl NormalizedRecord {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            fields: Vec::new(),
            size: None,
            deleted: None,
        }
    }

    /// Append a named field
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_deleted(mut self, deleted: bool) -> Self {
        self.deleted = Some(deleted);
        self
    }

    /// Value of the first field called `name`
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    /// Field values in declaration order
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, value)| value.as_str())
    }

    /// Field names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// All values joined by a single space; this is what IOC patterns are tested against
    pub fn joined_text(&self) -> String {
        self.values().collect::<Vec<_>>().join(" ")
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_lookup() {
        let record = NormalizedRecord::new(SourceKind::Connection)
            .with_field("Process", "svchost.exe")
            .with_field("Remote IP", "10.0.0.5");
        assert_eq!(record.field("Remote IP"), Some("10.0.0.5"));
        assert_eq!(record.field("Missing"), None);
        assert_eq!(record.joined_text(), "svchost.exe 10.0.0.5");
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn test_typed_fields() {
        let record = NormalizedRecord::new(SourceKind::DeletedFile)
            .with_size(42)
            .with_deleted(true);
        assert_eq!(record.size, Some(42));
        assert_eq!(record.deleted, Some(true));
        assert!(record.is_empty());
    }
}
