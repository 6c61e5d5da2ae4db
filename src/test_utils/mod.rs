//! Test utilities for triage_report
//!
//! Builds throwaway collection directories laid out the way a triage
//! collector leaves them, plus run contexts whose tool runner must never be
//! called.

#![cfg(test)]

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::command::MockToolRunner;
use crate::config::RunConfig;
use crate::context::RunContext;
use crate::locator::Layout;

/// A collection directory `<tmp>/<name>` whose tools root is `<tmp>`
pub struct CollectionFixture {
    _dir: TempDir,
    pub root: PathBuf,
}

impl CollectionFixture {
    pub fn new(name: &str) -> Result<Self> {
        let dir = TempDir::new()?;
        let root = dir.path().join(name);
        fs::create_dir_all(root.join("TriageReport"))?;
        Ok(Self { _dir: dir, root })
    }

    /// Write `contents` at `relative` inside the collection
    pub fn write(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn mkdir(&self, relative: &str) -> Result<PathBuf> {
        let path = self.root.join(relative);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> Result<Layout> {
        Ok(Layout::new(&self.root, None)?)
    }

    /// In-memory context for `directives`; running any tool fails the test
    pub fn context(&self, directives: &str) -> Result<RunContext> {
        let mut runner = MockToolRunner::new();
        runner.expect_run().never();
        Ok(RunContext::in_memory(
            RunConfig::from_directives(directives),
            self.layout()?,
            Box::new(runner),
        ))
    }
}

/// Test data generators for tool output
pub mod generators {
    /// One MFTECmd CSV row with the columns the adapter reads
    pub fn mftecmd_row(in_use: &str, dir: &str, file: &str, size: u64) -> String {
        let mut row = vec![String::new(); 26];
        row[2] = in_use.to_string();
        row[5] = dir.to_string();
        row[6] = file.to_string();
        row[8] = size.to_string();
        row[19] = "2024-01-01 10:00:00".to_string();
        row[21] = "2024-01-03 10:00:00".to_string();
        row[25] = "2024-01-02 10:00:00".to_string();
        row.join(",")
    }
}
