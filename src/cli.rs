use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::constants::{DEFAULT_CONFIG_NAME, DEFAULT_TOOL_TIMEOUT_SECS};

/// Command-line arguments for the triage report generator.
///
/// A report run needs `--dir`; the subcommands work without one.
#[derive(Parser, Debug)]
#[clap(name = "triage-report", about = "Build an HTML triage report from a DFIR collection", version)]
pub struct Args {
    /// Triage collection directory to report on
    #[clap(short, long)]
    pub dir: Option<PathBuf>,

    /// Directive file (missing file means run every section)
    #[clap(short, long, default_value = DEFAULT_CONFIG_NAME)]
    pub config: PathBuf,

    /// Directory holding the producer tools (default: parent of --dir)
    #[clap(long)]
    pub tools_root: Option<PathBuf>,

    /// Seconds before a producer tool is killed
    #[clap(long, default_value_t = DEFAULT_TOOL_TIMEOUT_SECS)]
    pub tool_timeout: u64,

    /// Keep AllIps.txt, AllDoms.txt and AllHash.txt after the run
    #[clap(long)]
    pub keep_indicator_files: bool,

    /// Do not check for RegRipper plugins and LogParser before the run
    #[clap(long)]
    pub skip_preflight: bool,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a commented default directive file
    InitConfig {
        /// Path where the directive file will be written
        #[clap(default_value = DEFAULT_CONFIG_NAME)]
        path: PathBuf,
    },

    /// Print the resolved configuration as YAML
    ShowConfig,
}
