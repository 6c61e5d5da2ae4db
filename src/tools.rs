//! Producer tool invocations.
//!
//! Every external program the report depends on is described here as an
//! [`ExternalCommand`] rooted at the tools directory. Nothing in this module
//! runs anything; the pipeline hands the commands to a `ToolRunner`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::command::{ExternalCommand, StdoutTarget};
use crate::constants::{
    CHAINSAW_DIR, EXPLICIT_LOGIN_FILE, FAILED_LOGIN_FILE, HAYABUSA_DIR, HAYABUSA_FILE, LNK_FILE,
    MFT_DUMP_FILE, NEW_TASK_FILE, PREFETCH_FILE, RDP_FILE, RECYCLE_FILE, SERVICE_FILE, SHELLBAG_DIR,
};
use crate::locator::{Layout, MftBackend};

pub const REGRIPPER: &str = "RRV/RegRipper3.0-master/rip.exe";
pub const WIN_PREFETCH_VIEW: &str = "SYS/WinPrefetchView.exe";
pub const LOG_PARSER: &str = "SYS/LogParser.exe";
pub const RBCMD: &str = "SYS/RBCmd.exe";
pub const LECMD: &str = "SYS/LECmd.exe";
pub const SBECMD: &str = "SYS/SBECmd.exe";
pub const CHAINSAW: &str = "chainsaw/chainsaw_x86_64-pc-windows-msvc.exe";
pub const HAYABUSA: &str = "hayabusa/hayabusa-2.15.0-win-x64.exe";

/// Timestamp format passed to the Zimmerman tools
const EZ_DATE_FORMAT: &str = "yyyy-MM-dd HH:mm:ss K";

/// Security and System event queries run through LogParser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventQuery {
    /// 4624 with logon type 10
    RdpLogons,
    /// 4625
    FailedLogons,
    /// 4648
    ExplicitLogons,
    /// 7045
    ServiceInstalls,
    /// 4698
    TaskCreations,
}

impl EventQuery {
    pub fn output_file(&self) -> &'static str {
        match self {
            EventQuery::RdpLogons => RDP_FILE,
            EventQuery::FailedLogons => FAILED_LOGIN_FILE,
            EventQuery::ExplicitLogons => EXPLICIT_LOGIN_FILE,
            EventQuery::ServiceInstalls => SERVICE_FILE,
            EventQuery::TaskCreations => NEW_TASK_FILE,
        }
    }

    fn log_name(&self) -> &'static str {
        match self {
            EventQuery::ServiceInstalls => "System.evtx",
            _ => "Security.evtx",
        }
    }

    /// LogParser SQL against the event log found in `evt_dir`
    pub fn sql(&self, evt_dir: &Path) -> String {
        let log = evt_dir.join(self.log_name());
        let log = log.display();
        match self {
            EventQuery::RdpLogons => format!(
                "Select to_utctime(Timegenerated) AS Date, \
                 EXTRACT_TOKEN(Strings, 1, '|') as Machine, \
                 EXTRACT_TOKEN(Strings, 5, '|') as LoginID, \
                 EXTRACT_TOKEN(Strings, 6, '|') as LoginMachine, \
                 EXTRACT_TOKEN(Strings, 8, '|') as LogonType, \
                 EXTRACT_TOKEN(Strings, 18, '|') as RemoteIP \
                 from {} where eventid=4624 AND LogonType='10'",
                log
            ),
            EventQuery::FailedLogons => format!(
                "Select to_utctime(Timegenerated) AS Date, \
                 EXTRACT_TOKEN(Strings, 5, '|') as LoginID \
                 from {} where eventid=4625",
                log
            ),
            EventQuery::ExplicitLogons => format!(
                "Select to_utctime(Timegenerated) AS Date, \
                 EXTRACT_TOKEN(strings, 1, '|') as accountname, \
                 EXTRACT_TOKEN(strings, 2, '|') as domain, \
                 EXTRACT_TOKEN(strings, 5, '|') as usedaccount, \
                 EXTRACT_TOKEN(strings, 6, '|') as useddomain, \
                 EXTRACT_TOKEN(strings, 8, '|') as targetserver, \
                 EXTRACT_TOKEN(strings, 9, '|') as extradata, \
                 EXTRACT_TOKEN(strings, 11, '|') as procname, \
                 EXTRACT_TOKEN(strings, 12, '|') as sourceip \
                 FROM {} WHERE EventID = 4648",
                log
            ),
            EventQuery::ServiceInstalls => format!(
                "Select to_utctime(Timegenerated) AS Date, \
                 EXTRACT_TOKEN(strings, 0, '|') AS ServiceName, \
                 EXTRACT_TOKEN(strings, 1, '|') AS ServicePath, \
                 EXTRACT_TOKEN(strings, 4, '|') AS ServiceUser \
                 FROM {} WHERE EventID = 7045",
                log
            ),
            EventQuery::TaskCreations => format!(
                "Select to_utctime(Timegenerated) AS Date, SourceName, EventCategoryName, Message \
                 FROM {} WHERE EventID = 4698",
                log
            ),
        }
    }
}

/// Builds producer commands for one run
#[derive(Debug, Clone, Copy)]
pub struct ToolCatalog<'a> {
    layout: &'a Layout,
    timeout: Duration,
}

impl<'a> ToolCatalog<'a> {
    pub fn new(layout: &'a Layout, timeout: Duration) -> Self {
        Self { layout, timeout }
    }

    fn command(&self, tool: &str, expected_output: PathBuf) -> ExternalCommand {
        ExternalCommand::new(self.layout.tool(tool), expected_output, self.timeout)
            .current_dir(&self.layout.tools_root)
    }

    /// `rip.exe -p <plugin> -r <hive>` with stdout into `output`
    pub fn regripper(&self, plugin: &str, hive: &Path, output: &Path, append: bool) -> ExternalCommand {
        let target = if append {
            StdoutTarget::Append(output.to_path_buf())
        } else {
            StdoutTarget::Truncate(output.to_path_buf())
        };
        self.command(REGRIPPER, output.to_path_buf())
            .args(["-p", plugin, "-r"])
            .arg(hive)
            .stdout(target)
    }

    pub fn prefetch(&self, prefetch_dir: &Path) -> ExternalCommand {
        let output = self.layout.work_file(PREFETCH_FILE);
        self.command(WIN_PREFETCH_VIEW, output.clone())
            .arg("/folder")
            .arg(prefetch_dir)
            .arg("/scomma")
            .arg(output)
    }

    pub fn event_query(&self, query: EventQuery, evt_dir: &Path) -> ExternalCommand {
        let output = self.layout.work_file(query.output_file());
        self.command(LOG_PARSER, output.clone())
            .arg(query.sql(evt_dir))
            .args(["-i:evt", "-o:csv", "-q"])
            .stdout(StdoutTarget::Truncate(output))
    }

    /// RBCmd prints its report, so every run appends to the same file
    pub fn recycle_bin(&self, recycle_dir: &Path) -> ExternalCommand {
        let output = self.layout.work_file(RECYCLE_FILE);
        self.command(RBCMD, output.clone())
            .args(["--dt", EZ_DATE_FORMAT, "-d"])
            .arg(recycle_dir)
            .stdout(StdoutTarget::Append(output))
    }

    pub fn mft(&self, backend: MftBackend, mft_file: &Path) -> ExternalCommand {
        let output = self.layout.work_file(MFT_DUMP_FILE);
        let command = self.command(backend.executable(), output.clone());
        match backend {
            MftBackend::MftDump => command
                .args(["/l", "/d", "/v"])
                .arg(format!("--output={}", output.display()))
                .arg(mft_file),
            MftBackend::MftECmd => command
                .arg("-f")
                .arg(mft_file)
                .arg("--csv")
                .arg(&self.layout.work_dir)
                .args(["--csvf", MFT_DUMP_FILE]),
        }
    }

    pub fn lnk_files(&self, lnk_dir: &Path) -> ExternalCommand {
        self.command(LECMD, self.layout.work_file(LNK_FILE))
            .arg("-q")
            .arg("-d")
            .arg(lnk_dir)
            .args(["--dt", EZ_DATE_FORMAT, "--csv"])
            .arg(&self.layout.work_dir)
            .args(["--csvf", LNK_FILE])
    }

    pub fn shellbags(&self, hive_dir: &Path) -> ExternalCommand {
        let output = self.layout.work_file(SHELLBAG_DIR);
        self.command(SBECMD, output.clone())
            .arg("-d")
            .arg(hive_dir)
            .arg("--csv")
            .arg(output)
            .args(["--nl", "--dt", EZ_DATE_FORMAT])
    }

    pub fn chainsaw(&self, evt_dir: &Path) -> ExternalCommand {
        let output = self.layout.work_file(CHAINSAW_DIR);
        let tools = &self.layout.tools_root;
        self.command(CHAINSAW, output.clone())
            .args(["hunt", "--skip-errors", "--timezone", "UTC", "--full", "--csv", "--output"])
            .arg(output)
            .arg("--mapping")
            .arg(tools.join("chainsaw/mappings/sigma-event-logs-all.yml"))
            .arg("--rule")
            .arg(tools.join("chainsaw/rules"))
            .arg("--sigma")
            .arg(tools.join("chainsaw/sigma"))
            .arg(evt_dir)
    }

    /// Hayabusa writes into a directory that must exist beforehand
    pub fn hayabusa(&self, evt_dir: &Path) -> ExternalCommand {
        let output = self.layout.work_file(HAYABUSA_DIR).join(HAYABUSA_FILE);
        self.command(HAYABUSA, output.clone())
            .args(["csv-timeline", "-w", "--UTC", "-d"])
            .arg(evt_dir)
            .arg("-o")
            .arg(output)
    }

    /// The configured pre-conversion script, run against the collection
    pub fn pre_conversion(&self, script: &str) -> ExternalCommand {
        let script = PathBuf::from(script);
        let program = if script.is_absolute() {
            script
        } else {
            self.layout.tools_root.join(script)
        };
        ExternalCommand::new(program, &self.layout.collection_dir, self.timeout)
            .arg(&self.layout.collection_dir)
            .current_dir(&self.layout.tools_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use tempfile::TempDir;

    fn layout(dir: &TempDir) -> Layout {
        let collection = dir.path().join("HOST1");
        std::fs::create_dir_all(&collection).unwrap();
        Layout::new(&collection, None).unwrap()
    }

    fn args(command: &ExternalCommand) -> Vec<String> {
        command.args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_event_query_targets_expected_log() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        let catalog = ToolCatalog::new(&layout, Duration::from_secs(5));
        let evt = Path::new("/case/Evt");

        let command = catalog.event_query(EventQuery::ServiceInstalls, evt);
        assert!(command.args[0].to_string_lossy().contains("System.evtx"));
        assert!(command.args[0].to_string_lossy().contains("EventID = 7045"));
        assert_eq!(command.stdout, StdoutTarget::Truncate(layout.work_file(SERVICE_FILE)));
        assert_eq!(command.expected_output, layout.work_file(SERVICE_FILE));

        let rdp = EventQuery::RdpLogons.sql(evt);
        assert!(rdp.contains("Security.evtx"));
        assert!(rdp.contains("LogonType='10'"));
    }

    #[test]
    fn test_mft_commands_per_backend() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        let catalog = ToolCatalog::new(&layout, Duration::from_secs(5));
        let mft = Path::new("/case/RawData/MFT-C");

        let dump = catalog.mft(MftBackend::MftDump, mft);
        assert!(dump.program.ends_with("DSK/MFTDump.exe"));
        assert_eq!(&args(&dump)[..3], ["/l", "/d", "/v"]);

        let ecmd = catalog.mft(MftBackend::MftECmd, mft);
        assert!(ecmd.program.ends_with("DSK/MFTECmd.exe"));
        assert_eq!(ecmd.args[1], OsString::from("/case/RawData/MFT-C"));
        assert_eq!(ecmd.expected_output, layout.work_file(MFT_DUMP_FILE));
    }

    #[test]
    fn test_regripper_append_and_truncate() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        let catalog = ToolCatalog::new(&layout, Duration::from_secs(5));
        let out = layout.work_file("SysInfo.dat");

        let first = catalog.regripper("source_os", Path::new("/case/Reg/SOFTWARE"), &out, false);
        let second = catalog.regripper("winver", Path::new("/case/Reg/SOFTWARE"), &out, true);
        assert_eq!(first.stdout, StdoutTarget::Truncate(out.clone()));
        assert_eq!(second.stdout, StdoutTarget::Append(out));
        assert_eq!(&args(&second)[..3], ["-p", "winver", "-r"]);
    }

    #[test]
    fn test_pre_conversion_relative_to_tools_root() {
        let dir = TempDir::new().unwrap();
        let layout = layout(&dir);
        let catalog = ToolCatalog::new(&layout, Duration::from_secs(5));

        let command = catalog.pre_conversion("PreConv.bat");
        assert_eq!(command.program, layout.tools_root.join("PreConv.bat"));
        assert_eq!(command.args, vec![OsString::from(layout.collection_dir.as_os_str())]);
    }
}
