use std::process;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{error, info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use triage_report::cli::{Args, Commands};
use triage_report::config::{create_default_config_file, parse_config};
use triage_report::error::TriageError;
use triage_report::pipeline::{self, RunOptions};

fn main() {
    // Parse arguments
    let args = Args::parse();

    if let Err(e) = initialize_logging(args.verbose) {
        eprintln!("{:#}", e);
    }

    if let Err(e) = run(&args) {
        error!("{:#}", e);
        let code = e
            .downcast_ref::<TriageError>()
            .map(TriageError::exit_code)
            .unwrap_or(1);
        process::exit(code);
    }
}

fn run(args: &Args) -> Result<()> {
    // Handle subcommands
    if let Some(cmd) = &args.command {
        return handle_subcommand(cmd, args);
    }

    let dir = args
        .dir
        .clone()
        .ok_or_else(|| anyhow!("--dir is required to generate a report"))?;

    info!("Starting triage report generation");

    let options = RunOptions {
        collection_dir: dir,
        config_path: args.config.clone(),
        tools_root: args.tools_root.clone(),
        tool_timeout: Duration::from_secs(args.tool_timeout),
        keep_indicator_files: args.keep_indicator_files,
        skip_preflight: args.skip_preflight,
    };
    let summary = pipeline::run(&options)?;

    info!(
        "Triage report completed: {} ({} IOC hits)",
        summary.report_path.display(),
        summary.total_ioc_hits
    );
    Ok(())
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ).context("Failed to initialize logger")?;
    Ok(())
}

/// Handle subcommands (init-config and show-config)
fn handle_subcommand(cmd: &Commands, args: &Args) -> Result<()> {
    match cmd {
        Commands::InitConfig { path } => {
            info!("Creating default configuration file at {}", path.display());
            create_default_config_file(path)?;
            info!("Configuration created successfully");
            Ok(())
        }
        Commands::ShowConfig => {
            let config = parse_config(&args.config)?;
            let yaml = serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
            println!("{}", yaml);
            Ok(())
        }
    }
}
