//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;

use triage_report::command::{CommandOutcome, ExternalCommand, ToolRunner};
use triage_report::pipeline::RunOptions;

/// `<tmp>/tools` as tools root and `<tmp>/<name>` as the collection
pub struct Case {
    _dir: TempDir,
    pub collection: PathBuf,
    pub tools_root: PathBuf,
    pub config: PathBuf,
}

impl Case {
    pub fn new(name: &str, directives: Option<&str>) -> Result<Self> {
        let dir = TempDir::new()?;
        let collection = dir.path().join(name);
        let tools_root = dir.path().join("tools");
        fs::create_dir_all(&collection)?;
        fs::create_dir_all(&tools_root)?;

        let config = dir.path().join("AChReport.cfg");
        if let Some(text) = directives {
            fs::write(&config, text)?;
        }

        Ok(Self {
            _dir: dir,
            collection,
            tools_root,
            config,
        })
    }

    pub fn write(&self, relative: &str, contents: &str) -> Result<PathBuf> {
        let path = self.collection.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Place an empty stand-in for a producer tool
    pub fn install_tool(&self, relative: &str) -> Result<()> {
        let path = self.tools_root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, "")?;
        Ok(())
    }

    pub fn options(&self) -> RunOptions {
        let mut options = RunOptions::new(&self.collection, &self.config);
        options.tools_root = Some(self.tools_root.clone());
        options.skip_preflight = true;
        options
    }

    pub fn work_dir(&self) -> PathBuf {
        self.collection.join("TriageReport")
    }

    pub fn report(&self) -> Result<String> {
        let name = self
            .collection
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(fs::read_to_string(self.work_dir().join(format!("{}.htm", name)))?)
    }
}

/// Runner that writes canned output for known tools
#[derive(Default)]
pub struct ScriptedRunner {
    /// Program file name to the text written at its expected output
    outputs: HashMap<String, String>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, program: &str, contents: &str) -> Self {
        self.outputs.insert(program.to_string(), contents.to_string());
        self
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl ToolRunner for ScriptedRunner {
    fn run(&self, command: &ExternalCommand) -> Result<CommandOutcome> {
        if let Some(contents) = self.outputs.get(&file_name(&command.program)) {
            if let Some(parent) = command.expected_output.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&command.expected_output, contents)?;
        }
        Ok(CommandOutcome::observe(&command.expected_output, Some(0), false))
    }
}
