//! # triage_report
//!
//! Turns the artifacts of a Windows DFIR triage collection into a single
//! navigable HTML report.
//!
//! ## Overview
//!
//! A collection directory holds raw exports gathered from one endpoint:
//! registry hives, the raw $MFT, event logs, browser history, autoruns,
//! network state and more. triage_report runs the external parsers for each
//! artifact, normalizes their output, flags every record against an
//! analyst-supplied IOC list and streams the result section by section into
//! `<collection>/TriageReport/<collection>.htm`.
//!
//! Along the way every IP address, domain and hash that was seen is gathered
//! into de-duplicated lists for bulk threat-intel lookup.
//!
//! ## Usage
//!
//! ```no_run
//! use triage_report::pipeline::{run, RunOptions};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut options = RunOptions::new("/cases/HOST1", "AChReport.cfg");
//! options.keep_indicator_files = true;
//!
//! let summary = run(&options)?;
//! println!("Report: {}", summary.report_path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`config`]: Directive file parsing, section and source vocabularies
//! - [`locator`]: Source resolution, MFT backend probing and preflight
//! - [`adapters`]: Normalization of tool output into records
//! - [`matcher`] and [`accumulator`]: IOC tagging and indicator gathering
//! - [`report`]: Section catalog, collectors, rendering and composition
//! - [`pipeline`]: The run-level state machine

/// Indicator accumulation and de-duplication
pub mod accumulator;

/// Schema adapters for upstream tool output
pub mod adapters;

/// Command-line interface definitions and argument parsing
pub mod cli;

/// External tool execution with timeouts
pub mod command;

/// Directive file parsing and run configuration
pub mod config;

/// Application constants
pub mod constants;

/// Run-scoped state shared by all sections
pub mod context;

/// Fatal error taxonomy
pub mod error;

/// Source resolution and dependency preflight
pub mod locator;

/// Case-insensitive IOC matching
pub mod matcher;

/// Normalized record model
pub mod models;

/// Run-level orchestration
pub mod pipeline;

/// HTML report generation
pub mod report;

/// Producer tool command lines
pub mod tools;

/// Utility functions for files, hashing and the run summary
pub mod utils;

/// Test utilities and helpers
#[cfg(test)]
pub mod test_utils;
