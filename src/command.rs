//! External tool execution.
//!
//! Producer tools are opaque: the only contract is that a successful run
//! leaves its output at a known path. Exit codes are logged and otherwise
//! ignored, and every invocation is bounded by a timeout.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, warn};
use tokio::process::Command;
use tokio::runtime::{Builder, Runtime};

use crate::utils::files::remove_if_exists;

/// Where a tool's standard output goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdoutTarget {
    Discard,
    Truncate(PathBuf),
    Append(PathBuf),
}

/// One producer tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub stdout: StdoutTarget,
    /// File or directory whose existence means the tool succeeded
    pub expected_output: PathBuf,
    pub timeout: Duration,
    pub current_dir: Option<PathBuf>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<PathBuf>, expected_output: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdout: StdoutTarget::Discard,
            expected_output: expected_output.into(),
            timeout,
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdout(mut self, target: StdoutTarget) -> Self {
        self.stdout = target;
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    /// Short name for log lines
    pub fn display_name(&self) -> String {
        self.program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Redirected stdout is written to a sibling file until the tool has finished
    fn staged_stdout(&self) -> Option<(&Path, PathBuf)> {
        match &self.stdout {
            StdoutTarget::Discard => None,
            StdoutTarget::Truncate(path) | StdoutTarget::Append(path) => Some((path.as_path(), staging_path(path))),
        }
    }

    fn open_stdout(&self) -> Result<Stdio> {
        let Some((_, staging)) = self.staged_stdout() else {
            return Ok(Stdio::null());
        };
        let file = File::create(&staging)
            .with_context(|| format!("Failed to open tool output: {}", staging.display()))?;
        Ok(Stdio::from(file))
    }

    /// Move staged stdout onto its target; a killed tool leaves the target untouched
    fn settle_stdout(&self, timed_out: bool) -> Result<()> {
        let Some((target, staging)) = self.staged_stdout() else {
            return Ok(());
        };
        if timed_out {
            remove_if_exists(&staging)
                .with_context(|| format!("Failed to remove {}", staging.display()))?;
            return Ok(());
        }
        match &self.stdout {
            StdoutTarget::Append(_) => {
                let mut output = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(target)
                    .with_context(|| format!("Failed to open tool output: {}", target.display()))?;
                let mut staged = File::open(&staging)
                    .with_context(|| format!("Failed to read {}", staging.display()))?;
                io::copy(&mut staged, &mut output)
                    .with_context(|| format!("Failed to append to {}", target.display()))?;
                drop(staged);
                fs::remove_file(&staging)
                    .with_context(|| format!("Failed to remove {}", staging.display()))?;
            }
            _ => {
                fs::rename(&staging, target)
                    .with_context(|| format!("Failed to move output to {}", target.display()))?;
            }
        }
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

/// What happened when a command ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub exit_code: Option<i32>,
    pub expected_output: PathBuf,
    /// The expected output exists after the run
    pub produced: bool,
    pub timed_out: bool,
}

impl CommandOutcome {
    /// Outcome judged purely by the filesystem
    pub fn observe(expected_output: &Path, exit_code: Option<i32>, timed_out: bool) -> Self {
        Self {
            exit_code,
            expected_output: expected_output.to_path_buf(),
            produced: expected_output.exists(),
            timed_out,
        }
    }

    /// A killed tool never counts, whatever it left behind
    pub fn succeeded(&self) -> bool {
        self.produced && !self.timed_out
    }
}

/// Seam between the pipeline and process execution
#[cfg_attr(test, mockall::automock)]
pub trait ToolRunner {
    fn run(&self, command: &ExternalCommand) -> Result<CommandOutcome>;
}

/// Runs tools as child processes on a private current-thread runtime
pub struct TokioToolRunner {
    runtime: Runtime,
}

impl TokioToolRunner {
    pub fn new() -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create Tokio runtime")?;
        Ok(Self { runtime })
    }

    async fn execute(command: &ExternalCommand) -> Result<(Option<i32>, bool)> {
        let spawned = {
            let mut builder = Command::new(&command.program);
            builder
                .args(&command.args)
                .stdin(Stdio::null())
                .stdout(command.open_stdout()?)
                .stderr(Stdio::null())
                .kill_on_drop(true);
            if let Some(dir) = &command.current_dir {
                builder.current_dir(dir);
            }
            builder.spawn()
        };
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                command.settle_stdout(true)?;
                return Err(e).with_context(|| format!("Failed to start {}", command.program.display()));
            }
        };

        let waited = tokio::time::timeout(command.timeout, child.wait()).await;
        let (exit_code, timed_out) = match waited {
            Ok(status) => {
                let status = status.with_context(|| format!("Failed waiting on {}", command.display_name()))?;
                (status.code(), false)
            }
            Err(_) => {
                warn!(
                    "{} exceeded its {}s timeout, killing it",
                    command.display_name(),
                    command.timeout.as_secs()
                );
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill {}: {}", command.display_name(), e);
                }
                (None, true)
            }
        };
        drop(child);

        command.settle_stdout(timed_out)?;
        Ok((exit_code, timed_out))
    }
}

impl ToolRunner for TokioToolRunner {
    fn run(&self, command: &ExternalCommand) -> Result<CommandOutcome> {
        debug!("Running {} {:?}", command.program.display(), command.args);
        let (exit_code, timed_out) = self.runtime.block_on(Self::execute(command))?;
        debug!("{} exited with {:?}", command.display_name(), exit_code);

        let outcome = CommandOutcome::observe(&command.expected_output, exit_code, timed_out);
        if !outcome.produced && !timed_out {
            warn!(
                "{} produced no output at {}",
                command.display_name(),
                command.expected_output.display()
            );
        }
        Ok(outcome)
    }
}
