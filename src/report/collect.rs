//! Section collectors.
//!
//! A collector runs whatever producer its section needs, normalizes the
//! output, tags and accumulates every displayed record, and removes its
//! intermediate files before returning. A missing source or a failed tool
//! yields [`SectionBody::Unavailable`]; it is never an error.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Result;
use chrono::Local;
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::accumulator::IndicatorKind;
use crate::adapters::delimited::{Column, ColumnAdapter, Table};
use crate::adapters::mft::{
    is_temp_exe, MftAdapter, MftStreams, SizeBucket, FIELD_ACCESSED, FIELD_CREATED, FIELD_MODIFIED, FIELD_PATH,
};
use crate::adapters::text::{
    self, DnsRecordType, AMCACHE_HASH, AMCACHE_LAST_WRITE, AMCACHE_NAME, DNS_NAME, DNS_REQUEST, DNS_RESOLUTION,
    DNS_TYPE, NETSTAT_LABELS, PSINFO_PREFIXES, RBCMD_LABELS, SYSINFO_PREFIXES, TASK_COMMAND_FIELD, TASK_FILE,
    TASK_URI_FIELD, TZ_PREFIXES,
};
use crate::config::SourceKey;
use crate::constants::{
    AMCACHE_FILE, ARCHIVE_EXTENSIONS, CHAINSAW_DIR, CHAINSAW_OUTPUTS, HAYABUSA_DIR, LNK_FILE, MFT_DUMP_FILE,
    RECYCLE_FILE, SHELLBAG_DIR, SYSINFO_FILE, TZINFO_FILE, USER_HIVE_PREFIX,
};
use crate::context::{MftState, RunContext};
use crate::models::{NormalizedRecord, SourceKind};
use crate::report::html::thousands;
use crate::report::renderer::{Block, Cell, Line, Row, SectionBody, TableBlock};
use crate::tools::EventQuery;
use crate::utils::files::{read_lossy, remove_dir_if_exists, remove_if_exists};

/// Where a displayed column feeds the indicator accumulators
#[derive(Debug, Clone, Copy)]
enum Extract {
    Field(usize, IndicatorKind),
    /// Host part of a URL, `url.split('/')[2]`
    UrlHost(usize),
}

/// How a normalized table is turned into report rows
#[derive(Debug, Clone, Copy, Default)]
struct RowSpec {
    extracts: &'static [Extract],
    /// Column rendered as a threat-intel link
    lookup: Option<usize>,
}

impl RowSpec {
    const PLAIN: RowSpec = RowSpec {
        extracts: &[],
        lookup: None,
    };
}

/// Tag, accumulate and convert records to rows
fn rows(ctx: &mut RunContext, records: &[NormalizedRecord], spec: RowSpec) -> Vec<Row> {
    records
        .iter()
        .map(|record| {
            let hit = ctx.tag(record).matched;
            let values: Vec<&str> = record.values().collect();
            for extract in spec.extracts {
                match *extract {
                    Extract::Field(idx, kind) => {
                        if let Some(value) = values.get(idx) {
                            ctx.accumulate(kind, value);
                        }
                    }
                    Extract::UrlHost(idx) => {
                        if let Some(host) = values.get(idx).and_then(|url| url.split('/').nth(2)) {
                            ctx.accumulate(IndicatorKind::Domain, host);
                        }
                    }
                }
            }
            let cells = values
                .iter()
                .enumerate()
                .map(|(idx, value)| {
                    if spec.lookup == Some(idx) {
                        Cell::Lookup(value.to_string())
                    } else {
                        Cell::Text(value.to_string())
                    }
                })
                .collect();
            Row { cells, hit }
        })
        .collect()
}

fn table_block(ctx: &mut RunContext, table: Table, spec: RowSpec) -> TableBlock {
    TableBlock {
        rows: rows(ctx, &table.records, spec),
        header: table.header,
    }
}

fn labeled_block(ctx: &mut RunContext, labels: &[&str], records: &[NormalizedRecord], spec: RowSpec) -> TableBlock {
    TableBlock {
        header: labels.iter().map(|label| label.to_string()).collect(),
        rows: rows(ctx, records, spec),
    }
}

fn tagged_lines(ctx: &mut RunContext, text: &str) -> Vec<Line> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| Line {
            text: line.to_string(),
            bold: false,
            hit: ctx.tag_text(line).matched,
        })
        .collect()
}

/// Resolved path of a source, logging when it is missing
fn source_path(ctx: &RunContext, key: SourceKey) -> Option<PathBuf> {
    let descriptor = ctx.source(key);
    match descriptor.resolved() {
        Some(path) => Some(path.to_path_buf()),
        None => {
            info!("{} not found, bypassing", key.description());
            None
        }
    }
}

/// Load a delimited source straight from the collection
fn collection_table(ctx: &mut RunContext, key: SourceKey, adapter: &ColumnAdapter, spec: RowSpec) -> Result<SectionBody> {
    let Some(path) = source_path(ctx, key) else {
        return Ok(SectionBody::Unavailable);
    };
    let table = adapter.load_table(&path)?;
    let block = table_block(ctx, table, spec);
    Ok(SectionBody::Blocks(vec![Block::Table(block)]))
}

fn discard(path: &Path) {
    if let Err(e) = remove_if_exists(path) {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
}

fn discard_dir(path: &Path) {
    if let Err(e) = remove_dir_if_exists(path) {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
}

/// Lines of `path` chosen by prefix, first one bold
fn picked_lines(path: &Path, prefixes: &[&str], stop: Option<&str>) -> Result<Vec<Line>> {
    let text = read_lossy(path)?;
    Ok(text::pick_lines(&text, prefixes, stop)
        .into_iter()
        .enumerate()
        .map(|(idx, line)| Line {
            text: line,
            bold: idx == 0,
            hit: false,
        })
        .collect())
}

pub fn system_info(ctx: &mut RunContext) -> Result<SectionBody> {
    let mut blocks = Vec::new();
    let psinfo = ctx.layout.collection_dir.join("info.dat");
    let sysinfo = ctx.layout.work_file(SYSINFO_FILE);
    let tzinfo = ctx.layout.work_file(TZINFO_FILE);
    let catalog = ctx.tools();

    if psinfo.is_file() {
        blocks.push(Block::Lines(picked_lines(&psinfo, PSINFO_PREFIXES, Some("Applications:"))?));
    } else {
        let software = source_path(ctx, SourceKey::RegSoft);
        let system = source_path(ctx, SourceKey::RegSyst);
        if let (Some(software), Some(system)) = (&software, &system) {
            let produced = ctx.run_tool(&catalog.regripper("source_os", software, &sysinfo, false))
                | ctx.run_tool(&catalog.regripper("winver", software, &sysinfo, true))
                | ctx.run_tool(&catalog.regripper("compname", system, &sysinfo, true));
            if produced {
                blocks.push(Block::Lines(picked_lines(&sysinfo, SYSINFO_PREFIXES, None)?));
            }
        }
    }

    if let Some(system) = source_path(ctx, SourceKey::RegSyst) {
        if ctx.run_tool(&catalog.regripper("timezone", &system, &tzinfo, false)) {
            blocks.push(Block::Lines(picked_lines(&tzinfo, TZ_PREFIXES, None)?));
            blocks.push(Block::Note(format!(
                "Note: TZ of the machine this report was created on is: UTC{}",
                Local::now().offset()
            )));
        }
    }

    discard(&sysinfo);
    discard(&tzinfo);

    if blocks.is_empty() {
        return Ok(SectionBody::Unavailable);
    }
    Ok(SectionBody::Blocks(blocks))
}

pub fn logons(ctx: &mut RunContext) -> Result<SectionBody> {
    let path = ctx.layout.collection_dir.join("Triage").join("Sys").join("Logon.dat");
    if !path.is_file() {
        info!("Logon information not found, bypassing");
        return Ok(SectionBody::Unavailable);
    }
    let text = read_lossy(&path)?;
    let lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(Line::plain)
        .collect();
    Ok(SectionBody::Blocks(vec![Block::Lines(lines)]))
}

/// Parse the $MFT once and share it between the MFT sections
fn mft_streams(ctx: &mut RunContext) -> Result<Option<Rc<MftStreams>>> {
    match &ctx.mft {
        MftState::Loaded(streams) => return Ok(Some(Rc::clone(streams))),
        MftState::Unavailable | MftState::Released => return Ok(None),
        MftState::Pending => {}
    }
    ctx.mft = MftState::Unavailable;

    let Some(source) = ctx.mft_source.clone() else {
        return Ok(None);
    };
    let (Some(mft_file), Some(backend)) = (source.resolved(), source.backend) else {
        return Ok(None);
    };

    info!("Parsing $MFT with {}...", backend.as_str());
    let output = ctx.layout.work_file(MFT_DUMP_FILE);
    if !ctx.run_tool(&ctx.tools().mft(backend, mft_file)) {
        return Ok(None);
    }

    let loaded = MftAdapter::new(backend).load_streams(&output);
    discard(&output);
    discard(&ctx.layout.work_file("MFTDump.log"));

    let streams = Rc::new(loaded?);
    debug!(
        "$MFT rows: {} deleted, {} active, {} unclassified",
        streams.deleted.len(),
        streams.active.len(),
        streams.unclassified.len()
    );
    ctx.mft = MftState::Loaded(Rc::clone(&streams));
    Ok(Some(streams))
}

const MFT_LABELS: &[&str] = &[FIELD_PATH, FIELD_CREATED, FIELD_ACCESSED, FIELD_MODIFIED, "Size"];

fn mft_row(record: &NormalizedRecord, hit: bool) -> Row {
    let field = |name: &str| Cell::Text(record.field(name).unwrap_or_default().to_string());
    Row {
        cells: vec![
            field(FIELD_PATH),
            field(FIELD_CREATED),
            field(FIELD_ACCESSED),
            field(FIELD_MODIFIED),
            Cell::Text(thousands(record.size.unwrap_or(0))),
        ],
        hit,
    }
}

fn mft_section(
    ctx: &mut RunContext,
    pick: fn(&MftStreams) -> &[NormalizedRecord],
    keep: fn(&NormalizedRecord) -> bool,
) -> Result<SectionBody> {
    let Some(streams) = mft_streams(ctx)? else {
        return Ok(SectionBody::Unavailable);
    };
    let rows = pick(&streams)
        .iter()
        .filter(|record| keep(record))
        .map(|record| {
            let hit = ctx.tag(record).matched;
            mft_row(record, hit)
        })
        .collect();
    Ok(SectionBody::Blocks(vec![Block::Table(TableBlock {
        header: MFT_LABELS.iter().map(|label| label.to_string()).collect(),
        rows,
    })]))
}

fn deleted(streams: &MftStreams) -> &[NormalizedRecord] {
    &streams.deleted
}

fn active(streams: &MftStreams) -> &[NormalizedRecord] {
    &streams.active
}

fn in_bucket(record: &NormalizedRecord, bucket: SizeBucket) -> bool {
    SizeBucket::classify(record.size.unwrap_or(0)) == Some(bucket)
}

fn temp_exe(record: &NormalizedRecord) -> bool {
    record.field(FIELD_PATH).is_some_and(is_temp_exe)
}

pub fn small_deleted(ctx: &mut RunContext) -> Result<SectionBody> {
    mft_section(ctx, deleted, |record| in_bucket(record, SizeBucket::Small))
}

pub fn medium_deleted(ctx: &mut RunContext) -> Result<SectionBody> {
    mft_section(ctx, deleted, |record| in_bucket(record, SizeBucket::Medium))
}

pub fn large_deleted(ctx: &mut RunContext) -> Result<SectionBody> {
    mft_section(ctx, deleted, |record| in_bucket(record, SizeBucket::Large))
}

pub fn large_active(ctx: &mut RunContext) -> Result<SectionBody> {
    mft_section(ctx, active, |record| in_bucket(record, SizeBucket::Large))
}

pub fn temp_active_exe(ctx: &mut RunContext) -> Result<SectionBody> {
    mft_section(ctx, active, temp_exe)
}

pub fn temp_deleted_exe(ctx: &mut RunContext) -> Result<SectionBody> {
    mft_section(ctx, deleted, temp_exe)
}

/// Every $MFT row that matches an IOC; releases the parsed $MFT afterwards
pub fn mft_ioc_matches(ctx: &mut RunContext) -> Result<SectionBody> {
    let Some(streams) = mft_streams(ctx)? else {
        return Ok(SectionBody::Unavailable);
    };

    let mut rows = Vec::new();
    if !ctx.matcher.is_empty() {
        for record in streams.all() {
            if ctx.tag(record).matched {
                let mut row = mft_row(record, true);
                let flag = if record.deleted == Some(true) { "1" } else { "0" };
                row.cells.push(Cell::Text(flag.to_string()));
                rows.push(row);
            }
        }
    }
    ctx.mft = MftState::Released;

    let mut header: Vec<String> = MFT_LABELS.iter().map(|label| label.to_string()).collect();
    header.push("Del".to_string());
    Ok(SectionBody::Blocks(vec![Block::Table(TableBlock { header, rows })]))
}

/// Run one event log query and load its CSV
fn event_table(ctx: &mut RunContext, query: EventQuery, adapter: &ColumnAdapter, spec: RowSpec) -> Result<SectionBody> {
    let Some(evt_dir) = source_path(ctx, SourceKey::EvtDir1) else {
        return Ok(SectionBody::Unavailable);
    };
    let output = ctx.layout.work_file(query.output_file());
    if !ctx.run_tool(&ctx.tools().event_query(query, &evt_dir)) {
        return Ok(SectionBody::Unavailable);
    }
    let table = adapter.load_table(&output);
    discard(&output);
    let block = table_block(ctx, table?, spec);
    Ok(SectionBody::Blocks(vec![Block::Table(block)]))
}

pub fn rdp_logons(ctx: &mut RunContext) -> Result<SectionBody> {
    let adapter = ColumnAdapter::new(SourceKind::LoginEvent, b',', 6, &[0, 1, 2, 3, 4, 5]);
    let spec = RowSpec {
        extracts: &[Extract::Field(5, IndicatorKind::Ip)],
        lookup: Some(5),
    };
    event_table(ctx, EventQuery::RdpLogons, &adapter, spec)
}

/// Failed logons per account, most attempted first
pub fn group_failed_logons(rows: &[Vec<String>]) -> Vec<(String, u64)> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for row in rows {
        if row.len() < 2 || row[0].to_lowercase() == "date" {
            continue;
        }
        *counts.entry(row[1].to_lowercase()).or_default() += 1;
    }
    let mut grouped: Vec<(String, u64)> = counts.into_iter().collect();
    grouped.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    grouped
}

pub fn failed_logons(ctx: &mut RunContext) -> Result<SectionBody> {
    let Some(evt_dir) = source_path(ctx, SourceKey::EvtDir1) else {
        return Ok(SectionBody::Unavailable);
    };
    let query = EventQuery::FailedLogons;
    let output = ctx.layout.work_file(query.output_file());
    if !ctx.run_tool(&ctx.tools().event_query(query, &evt_dir)) {
        return Ok(SectionBody::Unavailable);
    }
    let parsed = crate::adapters::read_rows(&output, b',');
    discard(&output);

    let records: Vec<NormalizedRecord> = group_failed_logons(&parsed?)
        .into_iter()
        .map(|(user, count)| {
            NormalizedRecord::new(SourceKind::LoginEvent)
                .with_field("Attempted UserId", user)
                .with_field("Count", count.to_string())
        })
        .collect();
    let block = labeled_block(ctx, &["Attempted UserId", "Count"], &records, RowSpec::PLAIN);
    Ok(SectionBody::Blocks(vec![Block::Table(block)]))
}

pub fn explicit_logons(ctx: &mut RunContext) -> Result<SectionBody> {
    let adapter = ColumnAdapter::new(SourceKind::LoginEvent, b',', 9, &[0, 1, 2, 3, 4, 5, 6, 7, 8]);
    let spec = RowSpec {
        extracts: &[Extract::Field(8, IndicatorKind::Ip)],
        lookup: Some(8),
    };
    event_table(ctx, EventQuery::ExplicitLogons, &adapter, spec)
}

fn is_file_url(row: &[String]) -> bool {
    row[0].starts_with("file:///")
}

fn is_archive_url(row: &[String]) -> bool {
    is_file_url(row) && ARCHIVE_EXTENSIONS.iter().any(|ext| row[0].contains(ext))
}

fn is_web_url(row: &[String]) -> bool {
    !is_file_url(row)
}

fn browser_history(ctx: &mut RunContext, filter: fn(&[String]) -> bool, spec: RowSpec) -> Result<SectionBody> {
    let adapter = ColumnAdapter::new(SourceKind::BrowserVisit, b',', 8, &[2, 3, 0, 6, 7]).with_filter(filter);
    collection_table(ctx, SourceKey::Browser, &adapter, spec)
}

pub fn browsed_archives(ctx: &mut RunContext) -> Result<SectionBody> {
    browser_history(ctx, is_archive_url, RowSpec::PLAIN)
}

pub fn browsed_files(ctx: &mut RunContext) -> Result<SectionBody> {
    browser_history(ctx, is_file_url, RowSpec::PLAIN)
}

pub fn browsed_sites(ctx: &mut RunContext) -> Result<SectionBody> {
    let spec = RowSpec {
        extracts: &[Extract::UrlHost(2)],
        lookup: None,
    };
    browser_history(ctx, is_web_url, spec)
}

pub fn browser_downloads(ctx: &mut RunContext) -> Result<SectionBody> {
    let adapter = ColumnAdapter::new(SourceKind::Download, b',', 15, &[14, 1, 5, 9, 8, 11]);
    let spec = RowSpec {
        extracts: &[Extract::UrlHost(1)],
        lookup: None,
    };
    collection_table(ctx, SourceKey::Downlod, &adapter, spec)
}

pub fn prefetch(ctx: &mut RunContext) -> Result<SectionBody> {
    let Some(prefetch_dir) = source_path(ctx, SourceKey::Prefetc) else {
        return Ok(SectionBody::Unavailable);
    };
    let command = ctx.tools().prefetch(&prefetch_dir);
    if !ctx.run_tool(&command) {
        return Ok(SectionBody::Unavailable);
    }
    let adapter = ColumnAdapter::new(SourceKind::Prefetch, b',', 8, &[0, 1, 2, 7, 6, 5]).headerless(&[
        "File Name",
        "Created",
        "Modified",
        "Last Run",
        "Run Count",
        "Process Path",
    ]);
    let table = adapter.load_table(&command.expected_output);
    discard(&command.expected_output);
    let block = table_block(ctx, table?, RowSpec::PLAIN);
    Ok(SectionBody::Blocks(vec![Block::Table(block)]))
}

pub fn compatibility_assistant(ctx: &mut RunContext) -> Result<SectionBody> {
    let Some(pca_dir) = source_path(ctx, SourceKey::PCAsist) else {
        return Ok(SectionBody::Unavailable);
    };
    let path = pca_dir.join("PcaAppLaunchDic.txt");
    if !path.is_file() {
        info!("No PCA input data, bypassing");
        return Ok(SectionBody::Unavailable);
    }
    let adapter = ColumnAdapter::new(SourceKind::ProgramLaunch, b'|', 2, &[1, 0]).headerless(&["Date", "Process Path"]);
    let table = adapter.load_table(&path)?;
    let block = table_block(ctx, table, RowSpec::PLAIN);
    Ok(SectionBody::Blocks(vec![Block::Table(block)]))
}

pub fn connections(ctx: &mut RunContext) -> Result<SectionBody> {
    let cports = source_path(ctx, SourceKey::IPConns);
    let netstat = source_path(ctx, SourceKey::IPConn2);
    if cports.is_none() && netstat.is_none() {
        return Ok(SectionBody::Unavailable);
    }

    let mut blocks = Vec::new();
    if let Some(path) = cports {
        let adapter = ColumnAdapter::new(SourceKind::Connection, b',', 12, &[0, 2, 5, 3, 8, 6, 9, 10, 11]);
        let mut table = adapter.load_table(&path)?;
        // Only AChoir collections carry a resolved remote host
        if !ctx.config.source_path(SourceKey::Collect).starts_with("AChoir") {
            for record in &mut table.records {
                if let Some(field) = record.fields.get_mut(6) {
                    field.1 = "Not Resolved".to_string();
                }
            }
        }
        let spec = RowSpec {
            extracts: &[Extract::Field(4, IndicatorKind::Ip)],
            lookup: Some(4),
        };
        blocks.push(Block::Heading("CurrPorts".to_string()));
        blocks.push(Block::Table(table_block(ctx, table, spec)));
    }
    if let Some(path) = netstat {
        let records = text::parse_netstat(&read_lossy(&path)?);
        let spec = RowSpec {
            extracts: &[Extract::Field(3, IndicatorKind::Ip)],
            lookup: Some(3),
        };
        blocks.push(Block::Heading("Netstat -abno".to_string()));
        blocks.push(Block::Table(labeled_block(ctx, NETSTAT_LABELS, &records, spec)));
    }
    Ok(SectionBody::Blocks(blocks))
}

pub fn amcache(ctx: &mut RunContext) -> Result<SectionBody> {
    let Some(hive) = source_path(ctx, SourceKey::AmCache) else {
        return Ok(SectionBody::Unavailable);
    };
    let output = ctx.layout.work_file(AMCACHE_FILE);
    if !ctx.run_tool(&ctx.tools().regripper("amcache", &hive, &output, false)) {
        return Ok(SectionBody::Unavailable);
    }
    let text = read_lossy(&output);
    discard(&output);

    let records = text::parse_amcache(&text?);
    let rows = records
        .iter()
        .map(|record| {
            let hit = ctx.tag(record).matched;
            let hash = record.field(AMCACHE_HASH).unwrap_or("Unknown");
            let hash_cell = if hash == "Unknown" {
                Cell::Text(hash.to_string())
            } else {
                ctx.accumulate(IndicatorKind::Hash, hash);
                Cell::Lookup(hash.to_string())
            };
            Row {
                cells: vec![
                    Cell::Text(record.field(AMCACHE_LAST_WRITE).unwrap_or_default().to_string()),
                    Cell::Text(record.field(AMCACHE_NAME).unwrap_or_default().to_string()),
                    hash_cell,
                ],
                hit,
            }
        })
        .collect();
    Ok(SectionBody::Blocks(vec![Block::Table(TableBlock {
        header: vec![AMCACHE_LAST_WRITE.into(), AMCACHE_NAME.into(), AMCACHE_HASH.into()],
        rows,
    })]))
}

pub fn user_assist(ctx: &mut RunContext) -> Result<SectionBody> {
    let adapter = ColumnAdapter::new(SourceKind::UserAssist, b',', 4, &[3, 2, 0]);
    collection_table(ctx, SourceKey::UsrAsst, &adapter, RowSpec::PLAIN)
}

fn is_user_hive(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_uppercase())
        .is_some_and(|name| name.starts_with("NTUSER") && name.ends_with(".DAT"))
}

/// RegRipper shell folder and UserAssist output for every NTUSER hive
pub fn user_hives(ctx: &mut RunContext) -> Result<SectionBody> {
    let Some(reg_dir) = source_path(ctx, SourceKey::RegUser) else {
        return Ok(SectionBody::Unavailable);
    };
    let hives: Vec<PathBuf> = WalkDir::new(&reg_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_user_hive(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    if hives.is_empty() {
        info!("No user registry hives found, bypassing");
        return Ok(SectionBody::Unavailable);
    }

    let mut blocks = Vec::new();
    let mut produced_any = false;
    for (idx, hive) in hives.iter().enumerate() {
        let output = ctx.layout.work_file(&format!("{}{}", USER_HIVE_PREFIX, idx));
        let (folders, assist) = {
            let catalog = ctx.tools();
            (
                catalog.regripper("shellfolders", hive, &output, false),
                catalog.regripper("userassist", hive, &output, true),
            )
        };
        let produced = ctx.run_tool(&folders) | ctx.run_tool(&assist);
        if !produced {
            continue;
        }
        produced_any = true;

        let text = read_lossy(&output);
        discard(&output);
        blocks.push(Block::Heading(format!("User Registry: {}", hive.display())));
        let mut lines = Vec::new();
        for line in text?.lines().map(str::trim).filter(|line| !line.is_empty()) {
            if line.starts_with("shellfolders ") || line.starts_with("UserAssist") {
                if !lines.is_empty() {
                    blocks.push(Block::Lines(std::mem::take(&mut lines)));
                }
                blocks.push(Block::Heading(line.to_string()));
            } else {
                lines.push(Line {
                    text: line.to_string(),
                    bold: false,
                    hit: ctx.tag_text(line).matched,
                });
            }
        }
        if !lines.is_empty() {
            blocks.push(Block::Lines(lines));
        }
    }

    if !produced_any {
        return Ok(SectionBody::Unavailable);
    }
    Ok(SectionBody::Blocks(blocks))
}

pub fn powershell_history(ctx: &mut RunContext) -> Result<SectionBody> {
    let Some(psh_dir) = source_path(ctx, SourceKey::Powersh) else {
        return Ok(SectionBody::Unavailable);
    };
    let mut blocks = Vec::new();
    for entry in WalkDir::new(&psh_dir).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
        let is_history = entry
            .file_name()
            .to_string_lossy()
            .to_uppercase()
            .starts_with("CONSOLEHOST_HISTORY.");
        if !entry.file_type().is_file() || !is_history {
            continue;
        }
        let text = match read_lossy(entry.path()) {
            Ok(text) => text,
            Err(e) => {
                warn!("{:#}", e);
                continue;
            }
        };
        blocks.push(Block::Heading(format!("Powershell Log: {}", entry.path().display())));
        blocks.push(Block::Lines(tagged_lines(ctx, &text)));
    }
    Ok(SectionBody::Blocks(blocks))
}

pub fn lnk_files(ctx: &mut RunContext) -> Result<SectionBody> {
    let Some(lnk_dir) = source_path(ctx, SourceKey::LNKFile) else {
        return Ok(SectionBody::Unavailable);
    };
    let output = ctx.layout.work_file(LNK_FILE);
    if !ctx.run_tool(&ctx.tools().lnk_files(&lnk_dir)) {
        return Ok(SectionBody::Unavailable);
    }
    let adapter = ColumnAdapter::new(SourceKind::LinkFile, b',', 19, &[0, 15, 18, 1, 2, 3, 4, 5, 6]);
    let table = adapter.load_table(&output);
    discard(&output);
    let block = table_block(ctx, table?, RowSpec::PLAIN);
    Ok(SectionBody::Blocks(vec![Block::Table(block)]))
}

fn is_run_key(row: &[String]) -> bool {
    row[1].to_lowercase().contains("currentversion\\run")
}

fn autorun_adapter() -> ColumnAdapter {
    ColumnAdapter::new(SourceKind::AutoRunEntry, b',', 11, &[]).with_columns(vec![
        Column::At(0),
        Column::At(1),
        Column::At(2),
        Column::Concat(8, 10),
        Column::At(11),
        Column::At(3),
    ])
}

pub fn run_keys(ctx: &mut RunContext) -> Result<SectionBody> {
    let adapter = autorun_adapter().with_filter(is_run_key);
    collection_table(ctx, SourceKey::AutoRun, &adapter, RowSpec::PLAIN)
}

pub fn all_autoruns(ctx: &mut RunContext) -> Result<SectionBody> {
    let spec = RowSpec {
        extracts: &[Extract::Field(4, IndicatorKind::Hash)],
        lookup: Some(4),
    };
    collection_table(ctx, SourceKey::AutoRun, &autorun_adapter(), spec)
}

pub fn installed_services(ctx: &mut RunContext) -> Result<SectionBody> {
    let adapter = ColumnAdapter::new(SourceKind::ServiceInstall, b',', 4, &[0, 1, 2, 3]);
    event_table(ctx, EventQuery::ServiceInstalls, &adapter, RowSpec::PLAIN)
}

/// Task creation events followed by every task definition on disk
pub fn scheduled_tasks(ctx: &mut RunContext) -> Result<SectionBody> {
    let adapter = ColumnAdapter::new(SourceKind::ScheduledTask, b',', 4, &[0, 1, 2, 3]);
    let events = event_table(ctx, EventQuery::TaskCreations, &adapter, RowSpec::PLAIN)?;
    let task_dir = source_path(ctx, SourceKey::SchTsk2);

    if task_dir.is_none() && events == SectionBody::Unavailable {
        return Ok(SectionBody::Unavailable);
    }

    let mut blocks = match events {
        SectionBody::Blocks(blocks) => blocks,
        SectionBody::Unavailable => Vec::new(),
    };

    if let Some(task_dir) = task_dir {
        let mut records = Vec::new();
        for entry in WalkDir::new(&task_dir).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry
                .path()
                .strip_prefix(&task_dir)
                .unwrap_or(entry.path())
                .display()
                .to_string();
            match read_lossy(entry.path()) {
                Ok(text) => records.push(text::parse_task_definition(&name, &text)),
                Err(e) => warn!("{:#}", e),
            }
        }
        blocks.push(Block::Heading(format!("Scheduled Tasks: {}", task_dir.display())));
        let block = labeled_block(
            ctx,
            &[TASK_FILE, TASK_URI_FIELD, TASK_COMMAND_FIELD],
            &records,
            RowSpec::PLAIN,
        );
        blocks.push(Block::Table(block));
    }
    Ok(SectionBody::Blocks(blocks))
}

/// ipconfig output when collected, the DNS cache CSV otherwise
pub fn dns_cache(ctx: &mut RunContext) -> Result<SectionBody> {
    if let Some(path) = source_path(ctx, SourceKey::DNSIpcf) {
        let records = text::parse_ipconfig_dns(&read_lossy(&path)?);
        for record in &records {
            if record.field(DNS_TYPE) == Some(DnsRecordType::Host.label()) {
                let ip = record.field(DNS_RESOLUTION).unwrap_or_default();
                let name = record.field(DNS_NAME).unwrap_or_default();
                ctx.accumulate(IndicatorKind::Ip, ip);
                ctx.accumulate(IndicatorKind::Domain, name);
            }
        }
        let block = labeled_block(
            ctx,
            &[DNS_REQUEST, DNS_NAME, DNS_RESOLUTION, DNS_TYPE],
            &records,
            RowSpec::PLAIN,
        );
        return Ok(SectionBody::Blocks(vec![Block::Table(block)]));
    }

    let adapter = ColumnAdapter::new(SourceKind::DnsRecord, b',', 5, &[0, 1, 2, 3, 4]);
    let spec = RowSpec {
        extracts: &[
            Extract::Field(0, IndicatorKind::Domain),
            Extract::Field(4, IndicatorKind::Ip),
        ],
        lookup: Some(4),
    };
    collection_table(ctx, SourceKey::DNSCach, &adapter, spec)
}

pub fn recycle_bin(ctx: &mut RunContext) -> Result<SectionBody> {
    let Some(recycle_dir) = source_path(ctx, SourceKey::Recycle) else {
        return Ok(SectionBody::Unavailable);
    };
    let output = ctx.layout.work_file(RECYCLE_FILE);
    if !ctx.run_tool(&ctx.tools().recycle_bin(&recycle_dir)) {
        return Ok(SectionBody::Unavailable);
    }
    let text = read_lossy(&output);
    discard(&output);
    let records = text::parse_rbcmd(&text?);
    let block = labeled_block(ctx, RBCMD_LABELS, &records, RowSpec::PLAIN);
    Ok(SectionBody::Blocks(vec![Block::Table(block)]))
}

fn csv_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
        })
        .map(|entry| entry.into_path())
        .collect()
}

pub fn shellbags(ctx: &mut RunContext) -> Result<SectionBody> {
    let Some(hive_dir) = source_path(ctx, SourceKey::ShelBag) else {
        return Ok(SectionBody::Unavailable);
    };
    let output = ctx.layout.work_file(SHELLBAG_DIR);
    if !ctx.run_tool(&ctx.tools().shellbags(&hive_dir)) {
        discard_dir(&output);
        return Ok(SectionBody::Unavailable);
    }

    let adapter = ColumnAdapter::new(SourceKind::ShellBagEntry, b',', 17, &[5, 4, 15, 16, 11]);
    let mut blocks = Vec::new();
    for path in csv_files(&output) {
        match adapter.load_table(&path) {
            Ok(table) => {
                let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
                blocks.push(Block::Heading(name));
                blocks.push(Block::Table(table_block(ctx, table, RowSpec::PLAIN)));
            }
            Err(e) => warn!("{:#}", e),
        }
    }
    discard_dir(&output);
    Ok(SectionBody::Blocks(blocks))
}

/// Chainsaw sigma rows that are noise without a matching detail column
pub fn is_relevant_sigma(row: &[String]) -> bool {
    let title = row[1].to_lowercase();
    let detail = row[3].to_lowercase();
    if title.contains("defender") && !detail.contains("defender") {
        return false;
    }
    if title.contains("sysmon") && !detail.contains("sysmon") {
        return false;
    }
    if title.contains("file was not allowed to run") && !detail.contains("applocker") {
        return false;
    }
    true
}

pub fn chainsaw(ctx: &mut RunContext) -> Result<SectionBody> {
    let Some(evt_dir) = source_path(ctx, SourceKey::EvtDir1) else {
        return Ok(SectionBody::Unavailable);
    };
    let output = ctx.layout.work_file(CHAINSAW_DIR);
    if !ctx.run_tool(&ctx.tools().chainsaw(&evt_dir)) {
        discard_dir(&output);
        return Ok(SectionBody::Unavailable);
    }

    let sigma = ColumnAdapter::new(SourceKind::Detection, b',', 9, &[0, 1, 3, 4, 5, 7, 8]).with_filter(is_relevant_sigma);
    let other = ColumnAdapter::new(SourceKind::Detection, b',', 2, &[]);
    let found = csv_files(&output);

    let mut blocks = Vec::new();
    for name in CHAINSAW_OUTPUTS {
        let Some(path) = found.iter().find(|path| path.file_name().is_some_and(|n| n == *name)) else {
            continue;
        };
        let adapter = if *name == "sigma.csv" { &sigma } else { &other };
        match adapter.load_table(path) {
            Ok(table) => {
                blocks.push(Block::Heading(format!("Chainsaw: {}", name.trim_end_matches(".csv"))));
                blocks.push(Block::Table(table_block(ctx, table, RowSpec::PLAIN)));
            }
            Err(e) => warn!("{:#}", e),
        }
    }
    discard_dir(&output);
    Ok(SectionBody::Blocks(blocks))
}

fn is_severe(row: &[String]) -> bool {
    let level = row[2].to_lowercase();
    level == "high" || level == "crit"
}

pub fn hayabusa(ctx: &mut RunContext) -> Result<SectionBody> {
    let Some(evt_dir) = source_path(ctx, SourceKey::EvtDir1) else {
        return Ok(SectionBody::Unavailable);
    };
    let output_dir = ctx.layout.work_file(HAYABUSA_DIR);
    if let Err(e) = fs::create_dir_all(&output_dir) {
        warn!("Failed to create {}: {}", output_dir.display(), e);
        return Ok(SectionBody::Unavailable);
    }
    let command = ctx.tools().hayabusa(&evt_dir);
    if !ctx.run_tool(&command) {
        discard_dir(&output_dir);
        return Ok(SectionBody::Unavailable);
    }

    let adapter = ColumnAdapter::new(SourceKind::Detection, b',', 8, &[0, 1, 2, 3, 4, 5, 6, 7]).with_filter(is_severe);
    let table = adapter.load_table(&command.expected_output);
    discard_dir(&output_dir);
    let block = table_block(ctx, table?, RowSpec::PLAIN);
    Ok(SectionBody::Blocks(vec![Block::Table(block)]))
}
