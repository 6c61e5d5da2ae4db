//! Fatal error taxonomy.
//!
//! Only two conditions stop a run: a missing collection root and missing
//! mandatory tooling. Everything else degrades a single report section and is
//! carried as `anyhow::Error` with context.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriageError {
    /// The collection directory does not exist
    #[error("no valid triage extraction directory found: {0}")]
    MissingRoot(PathBuf),

    /// One or more required external tools or plugins are absent
    #[error("dependencies not met, missing: {}", .0.join(", "))]
    MissingMandatoryDependency(Vec<String>),
}

impl TriageError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> i32 {
        match self {
            TriageError::MissingRoot(_) => 1,
            TriageError::MissingMandatoryDependency(_) => 2,
        }
    }
}
