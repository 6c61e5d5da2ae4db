use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use log::warn;

use crate::accumulator::{FinalizedIndicators, IndicatorAccumulator, IndicatorKind};
use crate::adapters::mft::MftStreams;
use crate::command::{ExternalCommand, ToolRunner};
use crate::config::{RunConfig, SourceKey};
use crate::locator::{self, Layout, MftBackend, SourceDescriptor};
use crate::matcher::{IndicatorMatcher, TagResult};
use crate::models::NormalizedRecord;
use crate::tools::ToolCatalog;

/// All run-scoped state.
///
/// Built once after the configuration is resolved and handed to every
/// section by `&mut`; nothing else holds state between sections.
pub struct RunContext {
    pub config: RunConfig,
    pub layout: Layout,
    pub matcher: IndicatorMatcher,
    ips: IndicatorAccumulator,
    domains: IndicatorAccumulator,
    hashes: IndicatorAccumulator,
    runner: Box<dyn ToolRunner>,
    pub tool_timeout: Duration,
    /// Raw $MFT and the parser chosen for it, set once sources are located
    pub mft_source: Option<SourceDescriptor>,
    pub mft: MftState,
}

/// Lifecycle of the parsed $MFT shared by the MFT sections
#[derive(Debug, Clone, Default)]
pub enum MftState {
    /// Not parsed yet
    #[default]
    Pending,
    Loaded(Rc<MftStreams>),
    /// Parsing failed or was impossible; later sections do not retry
    Unavailable,
    /// Every MFT section has run and the rows were dropped
    Released,
}

impl RunContext {
    /// Context whose accumulators mirror into the layout's side files
    pub fn new(
        config: RunConfig,
        layout: Layout,
        runner: Box<dyn ToolRunner>,
        tool_timeout: Duration,
    ) -> Result<Self> {
        let ips = IndicatorAccumulator::with_side_file(IndicatorKind::Ip, &layout.ip_dump)?;
        let domains = IndicatorAccumulator::with_side_file(IndicatorKind::Domain, &layout.domain_dump)?;
        let hashes = IndicatorAccumulator::with_side_file(IndicatorKind::Hash, &layout.hash_dump)?;

        Ok(Self {
            matcher: IndicatorMatcher::new(&config.iocs),
            config,
            layout,
            ips,
            domains,
            hashes,
            runner,
            tool_timeout,
            mft_source: None,
            mft: MftState::Pending,
        })
    }

    /// Context without side files
    pub fn in_memory(config: RunConfig, layout: Layout, runner: Box<dyn ToolRunner>) -> Self {
        Self {
            matcher: IndicatorMatcher::new(&config.iocs),
            config,
            layout,
            ips: IndicatorAccumulator::new(IndicatorKind::Ip),
            domains: IndicatorAccumulator::new(IndicatorKind::Domain),
            hashes: IndicatorAccumulator::new(IndicatorKind::Hash),
            runner,
            tool_timeout: Duration::from_secs(crate::constants::DEFAULT_TOOL_TIMEOUT_SECS),
            mft_source: None,
            mft: MftState::Pending,
        }
    }

    /// Parser selected for the $MFT, if one was found
    pub fn mft_backend(&self) -> Option<MftBackend> {
        self.mft_source.as_ref().and_then(|source| source.backend)
    }

    pub fn tag(&mut self, record: &NormalizedRecord) -> TagResult {
        self.matcher.tag(record)
    }

    pub fn tag_text(&mut self, text: &str) -> TagResult {
        self.matcher.tag_text(text)
    }

    fn accumulator(&mut self, kind: IndicatorKind) -> &mut IndicatorAccumulator {
        match kind {
            IndicatorKind::Ip => &mut self.ips,
            IndicatorKind::Domain => &mut self.domains,
            IndicatorKind::Hash => &mut self.hashes,
        }
    }

    /// Record an observed indicator; side-file failures only warn
    pub fn accumulate(&mut self, kind: IndicatorKind, value: &str) {
        if let Err(e) = self.accumulator(kind).accumulate(value) {
            warn!("Failed to record {:?} indicator: {:#}", kind, e);
        }
    }

    pub fn finalize(&mut self, kind: IndicatorKind) -> Result<FinalizedIndicators> {
        self.accumulator(kind).finalize()
    }

    /// Resolve a logical source under the collection directory
    pub fn source(&self, key: SourceKey) -> SourceDescriptor {
        locator::resolve(key, &self.config, &self.layout.collection_dir)
    }

    pub fn tools(&self) -> ToolCatalog<'_> {
        ToolCatalog::new(&self.layout, self.tool_timeout)
    }

    /// Run a producer tool; `true` only when its output exists afterwards
    pub fn run_tool(&self, command: &ExternalCommand) -> bool {
        if !command.program.is_file() {
            warn!("{} not found, bypassing", command.program.display());
            return false;
        }
        match self.runner.run(command) {
            Ok(outcome) => outcome.succeeded(),
            Err(e) => {
                warn!("Error running {}: {:#}", command.display_name(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandOutcome, MockToolRunner};
    use crate::models::SourceKind;
    use tempfile::TempDir;

    fn layout(dir: &TempDir) -> Layout {
        let collection = dir.path().join("HOST1");
        std::fs::create_dir_all(collection.join("TriageReport")).unwrap();
        Layout::new(&collection, None).unwrap()
    }

    #[test]
    fn test_tag_counts_per_call_site() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::from_directives("IOC:TotallyLegit\n");
        let mut ctx = RunContext::in_memory(config, layout(&dir), Box::new(MockToolRunner::new()));

        let record = NormalizedRecord::new(SourceKind::Prefetch).with_field("Name", "TotallyLegit.exe");
        assert!(ctx.tag(&record).matched);
        assert!(ctx.tag(&record).matched);
        assert_eq!(ctx.matcher.entries()[0].hits, 2);
    }

    #[test]
    fn test_accumulate_writes_side_files() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        let ip_dump = layout.ip_dump.clone();
        let mut ctx = RunContext::new(
            RunConfig::default(),
            layout,
            Box::new(MockToolRunner::new()),
            Duration::from_secs(1),
        )
        .unwrap();

        ctx.accumulate(IndicatorKind::Ip, "8.8.8.8");
        ctx.accumulate(IndicatorKind::Ip, "8.8.8.8");
        ctx.accumulate(IndicatorKind::Ip, "0.0.0.0");
        let finalized = ctx.finalize(IndicatorKind::Ip).unwrap();

        assert_eq!(finalized.values, vec![("8.8.8.8".to_string(), 1)]);
        assert_eq!(finalized.total_duplicates, 2);
        assert_eq!(std::fs::read_to_string(ip_dump).unwrap().lines().count(), 3);
    }

    #[test]
    fn test_run_tool_skips_missing_program() {
        let dir = TempDir::new().unwrap();
        let mut runner = MockToolRunner::new();
        runner.expect_run().never();
        let ctx = RunContext::in_memory(RunConfig::default(), layout(&dir), Box::new(runner));

        let command = ExternalCommand::new(dir.path().join("missing.exe"), dir.path(), Duration::from_secs(1));
        assert!(!ctx.run_tool(&command));
    }

    #[test]
    fn test_run_tool_uses_output_existence() {
        let dir = TempDir::new().unwrap();
        let program = dir.path().join("tool.exe");
        std::fs::write(&program, "").unwrap();

        let mut runner = MockToolRunner::new();
        runner
            .expect_run()
            .returning(|cmd| Ok(CommandOutcome::observe(&cmd.expected_output, Some(0), false)));
        let ctx = RunContext::in_memory(RunConfig::default(), layout(&dir), Box::new(runner));

        let missing = ExternalCommand::new(&program, dir.path().join("absent.csv"), Duration::from_secs(1));
        assert!(!ctx.run_tool(&missing));

        let present = ExternalCommand::new(&program, dir.path(), Duration::from_secs(1));
        assert!(ctx.run_tool(&present));
    }
}
