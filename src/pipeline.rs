//! Run-level orchestration.
//!
//! One run walks `Init → ConfigResolved → SourcesLocated → SectionsProcessed →
//! Finalized → Done`. Only a missing collection root and failed preflight stop
//! it; every other problem degrades one section.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};

use crate::accumulator::{FinalizedIndicators, IndicatorKind};
use crate::command::{TokioToolRunner, ToolRunner};
use crate::config::{parse_config, SectionName, SourceKey};
use crate::constants::{
    CHAINSAW_DIR, DEFAULT_TOOL_TIMEOUT_SECS, HAYABUSA_DIR, SHELLBAG_DIR, USER_HIVE_PREFIX, WORK_FILE_LEFTOVERS,
};
use crate::context::{MftState, RunContext};
use crate::locator::{self, Layout};
use crate::report::catalog::navigation;
use crate::report::{ReportComposer, ReportSection, SectionBody, SectionContent, CATALOG};
use crate::utils::files::{remove_dir_if_exists, remove_if_exists};
use crate::utils::hash::sha256_file;
use crate::utils::summary::{create_run_summary, RunTotals};

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunState {
    Init,
    ConfigResolved,
    SourcesLocated,
    SectionsProcessed,
    Finalized,
    Done,
}

/// Options for one report run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub collection_dir: PathBuf,
    pub config_path: PathBuf,
    /// Defaults to the parent of the collection directory
    pub tools_root: Option<PathBuf>,
    pub tool_timeout: Duration,
    pub keep_indicator_files: bool,
    pub skip_preflight: bool,
}

impl RunOptions {
    pub fn new(collection_dir: impl Into<PathBuf>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            collection_dir: collection_dir.into(),
            config_path: config_path.into(),
            tools_root: None,
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            keep_indicator_files: false,
            skip_preflight: false,
        }
    }
}

/// Outcome of a finished run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub report_path: PathBuf,
    pub summary_path: PathBuf,
    pub sections: Vec<ReportSection>,
    pub total_ioc_hits: u64,
    pub state: RunState,
}

impl RunSummary {
    /// Summary of the section with `anchor`, if it was enabled or recorded
    pub fn section(&self, anchor: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|section| section.anchor == anchor)
    }
}

struct Progress {
    state: RunState,
}

impl Progress {
    fn advance(&mut self, next: RunState) {
        debug!("Run state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

/// Generate the report with the real process runner
pub fn run(options: &RunOptions) -> Result<RunSummary> {
    let runner = TokioToolRunner::new()?;
    run_with_runner(options, Box::new(runner))
}

/// Generate the report, running producer tools through `runner`
pub fn run_with_runner(options: &RunOptions, runner: Box<dyn ToolRunner>) -> Result<RunSummary> {
    let mut progress = Progress { state: RunState::Init };

    let layout = Layout::new(&options.collection_dir, options.tools_root.as_deref())?;
    info!("Triage collection directory: {}", layout.collection_dir.display());

    let config = parse_config(&options.config_path)?;
    progress.advance(RunState::ConfigResolved);

    fs::create_dir_all(&layout.work_dir)
        .with_context(|| format!("Failed to create work directory: {}", layout.work_dir.display()))?;
    clean_work_dir(&layout);

    if options.skip_preflight {
        warn!("Skipping dependency preflight");
    } else {
        locator::check_dependencies(&layout.tools_root)?;
        info!("All dependencies found");
    }

    let mut ctx = RunContext::new(config, layout, runner, options.tool_timeout)?;

    run_pre_conversion(&ctx);
    locate_sources(&mut ctx);
    progress.advance(RunState::SourcesLocated);

    let mut composer = ReportComposer::create(&ctx.layout.report_path)?;
    let nav = navigation(&ctx.config);
    composer.write_header(&ctx.layout.collection_name, ctx.config.branding.as_deref(), &nav)?;

    for descriptor in CATALOG.iter().filter(|descriptor| !descriptor.is_trailer()) {
        if !descriptor.is_enabled(&ctx.config) {
            info!("Bypassing {}...", descriptor.title);
            composer.record_disabled(descriptor);
            continue;
        }
        let SectionContent::Collected(collector) = descriptor.content else {
            continue;
        };

        info!("Generating {}...", descriptor.title);
        let body = match collector(&mut ctx) {
            Ok(body) => body,
            Err(e) => {
                warn!("Error generating {}: {:#}", descriptor.title, e);
                SectionBody::Unavailable
            }
        };
        let section = composer.write_section(descriptor, &body)?;
        debug!("{}: {:?}, {} records", section.anchor, section.state, section.count);
    }
    ctx.mft = MftState::Released;
    progress.advance(RunState::SectionsProcessed);

    let mut indicators: Vec<(IndicatorKind, FinalizedIndicators)> = Vec::new();
    for kind in IndicatorKind::ALL {
        indicators.push((kind, ctx.finalize(kind)?));
    }
    progress.advance(RunState::Finalized);

    for descriptor in CATALOG.iter().filter(|descriptor| descriptor.is_trailer()) {
        if !descriptor.is_enabled(&ctx.config) {
            info!("Bypassing {}...", descriptor.title);
            composer.record_disabled(descriptor);
            continue;
        }
        info!("Generating {}...", descriptor.title);
        match descriptor.content {
            SectionContent::Dump(kind) => {
                let finalized = indicators
                    .iter()
                    .find(|(seen, _)| *seen == kind)
                    .map(|(_, finalized)| finalized)
                    .ok_or_else(|| anyhow!("Indicators not finalized: {:?}", kind))?;
                composer.write_dump(descriptor, finalized, &ctx.matcher)?;
            }
            SectionContent::IocSummary => {
                composer.write_ioc_summary(descriptor, &ctx.matcher)?;
            }
            SectionContent::Collected(_) => {}
        }
    }

    let (writer, sections) = composer.finish()?;
    drop(writer);
    info!("Report written to {}", ctx.layout.report_path.display());

    let summary_path = write_run_summary(&ctx, &sections, &indicators)?;

    if !options.keep_indicator_files {
        for path in [&ctx.layout.ip_dump, &ctx.layout.domain_dump, &ctx.layout.hash_dump] {
            if let Err(e) = remove_if_exists(path) {
                warn!("Failed to remove {}: {}", path.display(), e);
            }
        }
    }
    progress.advance(RunState::Done);

    Ok(RunSummary {
        report_path: ctx.layout.report_path.clone(),
        summary_path,
        total_ioc_hits: ctx.matcher.total_hits(),
        sections,
        state: progress.state,
    })
}

/// Remove intermediates a failed earlier run left behind
fn clean_work_dir(layout: &Layout) {
    for name in WORK_FILE_LEFTOVERS {
        let path = layout.work_file(name);
        if let Err(e) = remove_if_exists(&path) {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
    for name in [CHAINSAW_DIR, SHELLBAG_DIR, HAYABUSA_DIR] {
        let path = layout.work_file(name);
        if let Err(e) = remove_dir_if_exists(&path) {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }

    let Ok(entries) = fs::read_dir(&layout.work_dir) else {
        return;
    };
    for entry in entries.filter_map(|entry| entry.ok()) {
        if entry.file_name().to_string_lossy().starts_with(USER_HIVE_PREFIX) {
            if let Err(e) = remove_if_exists(&entry.path()) {
                warn!("Failed to remove {}: {}", entry.path().display(), e);
            }
        }
    }
}

fn run_pre_conversion(ctx: &RunContext) {
    let Some(script) = ctx.config.pre_conversion.as_deref() else {
        return;
    };
    info!("Running pre-conversion: {}", script);
    if !ctx.run_tool(&ctx.tools().pre_conversion(script)) {
        warn!("Pre-conversion did not complete: {}", script);
    }
}

/// Resolve the sources shared by several sections
fn locate_sources(ctx: &mut RunContext) {
    if ctx.config.any_enabled(SectionName::MFT) {
        ctx.mft_source = Some(locator::resolve_mft(
            &ctx.config,
            &ctx.layout.collection_dir,
            &ctx.layout.tools_root,
        ));
    }

    if ctx.config.any_enabled(SectionName::EVENT_LOG) {
        let events = ctx.source(SourceKey::EvtDir1);
        match events.resolved() {
            Some(path) => info!("Event logs found: {}", path.display()),
            None => warn!("Event logs not found, event log sections will be empty"),
        }
    }
}

fn write_run_summary(
    ctx: &RunContext,
    sections: &[ReportSection],
    indicators: &[(IndicatorKind, FinalizedIndicators)],
) -> Result<PathBuf> {
    let hostname = hostname::get()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    let timestamp = chrono::Utc::now().to_rfc3339();

    let report_sha256 = match sha256_file(&ctx.layout.report_path) {
        Ok(digest) => digest,
        Err(e) => {
            warn!("Failed to hash report: {}", e);
            None
        }
    };
    let report_path = ctx.layout.report_path.display().to_string();

    let totals = RunTotals {
        collection_name: &ctx.layout.collection_name,
        report_path: &report_path,
        report_sha256: report_sha256.as_deref(),
        mft_backend: ctx.mft_backend(),
        sections,
        matcher: &ctx.matcher,
        indicators,
    };
    let summary_json = create_run_summary(&hostname, &timestamp, &totals)?;
    let summary_path = ctx.layout.summary_path.clone();
    fs::write(&summary_path, summary_json).context("Failed to write run summary")?;

    info!("Run summary written to {}", summary_path.display());
    Ok(summary_path)
}
