//! Source resolution and tool discovery.
//!
//! A collection directory is laid out by the collector that produced it, and
//! every logical source can be relocated by a directive. This module turns
//! the logical names into concrete paths, detects the MFT parser backends and
//! checks the tooling that every run needs.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::Serialize;

use crate::config::{join_collection_path, RunConfig, SourceKey};
use crate::constants::{
    DOMAIN_DUMP_NAME, HASH_DUMP_NAME, IP_DUMP_NAME, REPORT_EXTENSION, REQUIRED_LOGPARSER_FILES,
    REQUIRED_REGRIPPER_PLUGINS, RUN_SUMMARY_NAME, WORK_DIR_NAME,
};
use crate::error::TriageError;

/// MFT parser dialect found under the tools root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MftBackend {
    /// Malware Hunters MFTDump, tab separated
    MftDump,
    /// Eric Zimmerman MFTECmd, comma separated
    MftECmd,
}

impl MftBackend {
    /// Probe order, first existing executable wins
    pub const PRIORITY: [MftBackend; 2] = [MftBackend::MftDump, MftBackend::MftECmd];

    /// Executable location relative to the tools root
    pub fn executable(&self) -> &'static str {
        match self {
            MftBackend::MftDump => "DSK/MFTDump.exe",
            MftBackend::MftECmd => "DSK/MFTECmd.exe",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MftBackend::MftDump => "MFTDump",
            MftBackend::MftECmd => "MFTECmd",
        }
    }
}

/// Resolution of one logical source.
///
/// Built once during locating and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub key: SourceKey,
    /// Paths tried in order
    pub candidates: Vec<PathBuf>,
    pub backend: Option<MftBackend>,
    pub path: Option<PathBuf>,
    pub available: bool,
}

impl SourceDescriptor {
    /// Resolved path, if the source exists
    pub fn resolved(&self) -> Option<&Path> {
        self.path.as_deref().filter(|_| self.available)
    }
}

/// Keys tried for a logical source, in preference order
fn candidate_keys(key: SourceKey) -> &'static [SourceKey] {
    match key {
        SourceKey::EvtDir1 | SourceKey::EvtDir2 => &[SourceKey::EvtDir1, SourceKey::EvtDir2],
        SourceKey::SchTsk1 | SourceKey::SchTsk2 => &[SourceKey::SchTsk2, SourceKey::SchTsk1],
        SourceKey::MFTFile => &[SourceKey::MFTFile],
        SourceKey::RegSoft => &[SourceKey::RegSoft],
        SourceKey::RegSyst => &[SourceKey::RegSyst],
        SourceKey::AmCache => &[SourceKey::AmCache],
        SourceKey::Prefetc => &[SourceKey::Prefetc],
        SourceKey::RegUser => &[SourceKey::RegUser],
        SourceKey::Recycle => &[SourceKey::Recycle],
        SourceKey::Browser => &[SourceKey::Browser],
        SourceKey::Downlod => &[SourceKey::Downlod],
        SourceKey::Collect => &[SourceKey::Collect],
        SourceKey::IPConns => &[SourceKey::IPConns],
        SourceKey::IPConn2 => &[SourceKey::IPConn2],
        SourceKey::UsrAsst => &[SourceKey::UsrAsst],
        SourceKey::Powersh => &[SourceKey::Powersh],
        SourceKey::LNKFile => &[SourceKey::LNKFile],
        SourceKey::AutoRun => &[SourceKey::AutoRun],
        SourceKey::DNSIpcf => &[SourceKey::DNSIpcf],
        SourceKey::DNSCach => &[SourceKey::DNSCach],
        SourceKey::ShelBag => &[SourceKey::ShelBag],
        SourceKey::PCAsist => &[SourceKey::PCAsist],
        SourceKey::LastAct => &[SourceKey::LastAct],
        SourceKey::SrumDir => &[SourceKey::SrumDir],
        SourceKey::SysRegs => &[SourceKey::SysRegs],
    }
}

/// Resolve a logical source against the collection root.
///
/// A missing source is reported as unavailable, never as an error.
pub fn resolve(key: SourceKey, config: &RunConfig, root: &Path) -> SourceDescriptor {
    let candidates: Vec<PathBuf> = candidate_keys(key)
        .iter()
        .map(|candidate| join_collection_path(root, config.source_path(*candidate)))
        .collect();

    let found = candidates.iter().find(|path| path.exists()).cloned();
    match &found {
        Some(path) => debug!("{}: {}", key.description(), path.display()),
        None => debug!("{} not found in the collection", key.description()),
    }

    SourceDescriptor {
        key,
        available: found.is_some(),
        path: found,
        candidates,
        backend: None,
    }
}

/// First MFT parser present under `tools_root`
pub fn detect_mft_backend(tools_root: &Path) -> Option<MftBackend> {
    MftBackend::PRIORITY
        .iter()
        .copied()
        .find(|backend| tools_root.join(backend.executable()).is_file())
}

/// Resolve the raw $MFT together with the parser that will read it.
///
/// The source is only available when both the file and a backend exist.
pub fn resolve_mft(config: &RunConfig, root: &Path, tools_root: &Path) -> SourceDescriptor {
    let mut descriptor = resolve(SourceKey::MFTFile, config, root);

    match detect_mft_backend(tools_root) {
        Some(backend) => {
            info!("MFT parser found: {}", backend.as_str());
            descriptor.backend = Some(backend);
        }
        None => {
            warn!("MFT parser not found, bypassing $MFT sections");
            descriptor.available = false;
        }
    }

    if descriptor.path.is_none() {
        warn!("Error parsing $MFT (no MFT found)");
    }

    descriptor
}

/// Check RegRipper plugins and LogParser.
///
/// Every missing item is logged before the error is returned. A plugin
/// missing from `plugins/` is restored from the RegRipper distribution when
/// that copy exists.
pub fn check_dependencies(tools_root: &Path) -> Result<(), TriageError> {
    let mut missing = Vec::new();

    let plugin_dir = tools_root.join("plugins");
    let bundled_dir = tools_root.join("RRV").join("RegRipper3.0-master").join("plugins");

    for plugin in REQUIRED_REGRIPPER_PLUGINS {
        let target = plugin_dir.join(plugin);
        if target.is_file() {
            continue;
        }

        let bundled = bundled_dir.join(plugin);
        if bundled.is_file() && restore_plugin(&bundled, &target) {
            info!("Copied RegRipper plugin: {}", plugin);
            continue;
        }

        warn!("RegRipper plugin not found: plugins/{}", plugin);
        missing.push(format!("plugins/{}", plugin));
    }

    for file in REQUIRED_LOGPARSER_FILES {
        if !tools_root.join("SYS").join(file).is_file() {
            warn!("LogParser component not found: SYS/{}", file);
            missing.push(format!("SYS/{}", file));
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(TriageError::MissingMandatoryDependency(missing))
    }
}

fn restore_plugin(from: &Path, to: &Path) -> bool {
    let copied = to
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|_| fs::copy(from, to));
    match copied {
        Ok(_) => true,
        Err(e) => {
            warn!("Failed to copy RegRipper plugin {}: {}", from.display(), e);
            false
        }
    }
}

/// Every location a run reads from or writes to
#[derive(Debug, Clone)]
pub struct Layout {
    pub collection_dir: PathBuf,
    pub tools_root: PathBuf,
    pub work_dir: PathBuf,
    pub report_path: PathBuf,
    pub ip_dump: PathBuf,
    pub domain_dump: PathBuf,
    pub hash_dump: PathBuf,
    pub summary_path: PathBuf,
    /// Collection directory name, used in the report title
    pub collection_name: String,
}

impl Layout {
    /// Derive the layout from the collection directory.
    ///
    /// The tools root defaults to the parent of the collection directory.
    pub fn new(collection_dir: &Path, tools_root: Option<&Path>) -> Result<Self, TriageError> {
        if !collection_dir.is_dir() {
            return Err(TriageError::MissingRoot(collection_dir.to_path_buf()));
        }
        let collection_dir = fs::canonicalize(collection_dir)
            .map_err(|_| TriageError::MissingRoot(collection_dir.to_path_buf()))?;

        let tools_root = match tools_root {
            Some(root) => root.to_path_buf(),
            None => collection_dir
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| collection_dir.clone()),
        };

        let collection_name = collection_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Triage".to_string());

        let work_dir = collection_dir.join(WORK_DIR_NAME);
        let report_path = work_dir.join(format!("{}.{}", collection_name, REPORT_EXTENSION));

        Ok(Self {
            ip_dump: work_dir.join(IP_DUMP_NAME),
            domain_dump: work_dir.join(DOMAIN_DUMP_NAME),
            hash_dump: work_dir.join(HASH_DUMP_NAME),
            summary_path: work_dir.join(RUN_SUMMARY_NAME),
            report_path,
            work_dir,
            collection_dir,
            tools_root,
            collection_name,
        })
    }

    /// Path of an intermediate file in the work directory
    pub fn work_file(&self, name: &str) -> PathBuf {
        self.work_dir.join(name)
    }

    /// Path of a producer tool relative to the tools root
    pub fn tool(&self, relative: &str) -> PathBuf {
        join_collection_path(&self.tools_root, relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_source_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::default();
        let descriptor = resolve(SourceKey::IPConns, &config, dir.path());
        assert!(!descriptor.available);
        assert!(descriptor.resolved().is_none());
        assert_eq!(descriptor.candidates.len(), 1);
    }

    #[test]
    fn test_override_is_used() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("Other")).unwrap();
        fs::write(dir.path().join("Other").join("conns.csv"), "x").unwrap();

        let config = RunConfig::from_directives("IPConns:\\Other\\conns.csv\n");
        let descriptor = resolve(SourceKey::IPConns, &config, dir.path());
        assert!(descriptor.available);
        assert_eq!(
            descriptor.resolved(),
            Some(dir.path().join("Other").join("conns.csv").as_path())
        );
    }

    #[test]
    fn test_event_logs_fall_back_to_alternate() {
        let dir = TempDir::new().unwrap();
        let alt = join_collection_path(dir.path(), SourceKey::EvtDir2.default_path());
        fs::create_dir_all(&alt).unwrap();

        let descriptor = resolve(SourceKey::EvtDir1, &RunConfig::default(), dir.path());
        assert!(descriptor.available);
        assert_eq!(descriptor.path, Some(alt));
        assert_eq!(descriptor.candidates.len(), 2);
    }

    #[test]
    fn test_tasks_prefer_second_location() {
        let dir = TempDir::new().unwrap();
        let first = join_collection_path(dir.path(), SourceKey::SchTsk1.default_path());
        let second = join_collection_path(dir.path(), SourceKey::SchTsk2.default_path());
        fs::create_dir_all(&first).unwrap();
        fs::create_dir_all(&second).unwrap();

        let descriptor = resolve(SourceKey::SchTsk1, &RunConfig::default(), dir.path());
        assert_eq!(descriptor.path, Some(second));
    }

    #[test]
    fn test_mft_backend_priority() {
        let tools = TempDir::new().unwrap();
        assert_eq!(detect_mft_backend(tools.path()), None);

        fs::create_dir_all(tools.path().join("DSK")).unwrap();
        fs::write(tools.path().join("DSK").join("MFTECmd.exe"), "").unwrap();
        assert_eq!(detect_mft_backend(tools.path()), Some(MftBackend::MftECmd));

        fs::write(tools.path().join("DSK").join("MFTDump.exe"), "").unwrap();
        assert_eq!(detect_mft_backend(tools.path()), Some(MftBackend::MftDump));
    }

    #[test]
    fn test_mft_unavailable_without_backend() {
        let dir = TempDir::new().unwrap();
        let mft = join_collection_path(dir.path(), SourceKey::MFTFile.default_path());
        fs::create_dir_all(mft.parent().unwrap()).unwrap();
        fs::write(&mft, "raw").unwrap();

        let tools = TempDir::new().unwrap();
        let descriptor = resolve_mft(&RunConfig::default(), dir.path(), tools.path());
        assert!(!descriptor.available);
        assert_eq!(descriptor.backend, None);
    }

    #[test]
    fn test_check_dependencies_lists_every_missing_item() {
        let tools = TempDir::new().unwrap();
        match check_dependencies(tools.path()) {
            Err(TriageError::MissingMandatoryDependency(missing)) => {
                assert_eq!(
                    missing.len(),
                    REQUIRED_REGRIPPER_PLUGINS.len() + REQUIRED_LOGPARSER_FILES.len()
                );
                assert!(missing.contains(&"plugins/timezone.pl".to_string()));
                assert!(missing.contains(&"SYS/logparser.chm".to_string()));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_check_dependencies_restores_bundled_plugins() {
        let tools = TempDir::new().unwrap();
        let bundled = tools.path().join("RRV").join("RegRipper3.0-master").join("plugins");
        fs::create_dir_all(&bundled).unwrap();
        for plugin in REQUIRED_REGRIPPER_PLUGINS {
            fs::write(bundled.join(plugin), "# plugin").unwrap();
        }
        fs::create_dir_all(tools.path().join("SYS")).unwrap();
        for file in REQUIRED_LOGPARSER_FILES {
            fs::write(tools.path().join("SYS").join(file), "").unwrap();
        }

        check_dependencies(tools.path()).unwrap();
        assert!(tools.path().join("plugins").join("amcache.pl").is_file());
    }

    #[test]
    fn test_layout_paths() {
        let parent = TempDir::new().unwrap();
        let collection = parent.path().join("ACQ-IR-HOST1");
        fs::create_dir_all(&collection).unwrap();

        let layout = Layout::new(&collection, None).unwrap();
        assert_eq!(layout.collection_name, "ACQ-IR-HOST1");
        assert_eq!(layout.tools_root, fs::canonicalize(parent.path()).unwrap());
        assert!(layout.report_path.ends_with("TriageReport/ACQ-IR-HOST1.htm"));
        assert!(layout.ip_dump.ends_with("TriageReport/AllIps.txt"));
    }

    #[test]
    fn test_layout_missing_root() {
        let parent = TempDir::new().unwrap();
        let err = Layout::new(&parent.path().join("nope"), None).unwrap_err();
        assert!(matches!(err, TriageError::MissingRoot(_)));
    }
}
