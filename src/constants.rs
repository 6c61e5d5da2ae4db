//! Global constants for the triage report generator.
//!
//! File names, size thresholds and literal markers live here so that the
//! adapters, the renderer and the pipeline agree on them.

// Report layout
/// Report version shown in the document heading
pub const REPORT_VERSION: &str = "v1.51";

/// Default directive file name, resolved relative to the working directory
pub const DEFAULT_CONFIG_NAME: &str = "AChReport.cfg";

/// Work directory created inside the collection directory
pub const WORK_DIR_NAME: &str = "TriageReport";

/// Report file extension
pub const REPORT_EXTENSION: &str = "htm";

/// Side-channel indicator files
pub const IP_DUMP_NAME: &str = "AllIps.txt";
pub const DOMAIN_DUMP_NAME: &str = "AllDoms.txt";
pub const HASH_DUMP_NAME: &str = "AllHash.txt";

/// Machine-readable run summary written next to the report
pub const RUN_SUMMARY_NAME: &str = "run_summary.json";

// Size buckets (bytes, decimal megabytes as the upstream tools report them)
/// Lower exclusive bound of the small bucket
pub const SMALL_FILE_FLOOR: u64 = 1_000_000;

/// Inclusive lower bound of the medium bucket
pub const MEDIUM_FILE_FLOOR: u64 = 10_000_000;

/// Inclusive lower bound of the large bucket
pub const LARGE_FILE_FLOOR: u64 = 100_000_000;

// External tools
/// Default timeout for one external tool invocation
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 600;

/// RegRipper plugins that must be present before a run starts
pub const REQUIRED_REGRIPPER_PLUGINS: &[&str] = &[
    "compname.pl",
    "shellfolders.pl",
    "userassist.pl",
    "source_os.pl",
    "winver.pl",
    "amcache.pl",
    "timezone.pl",
];

/// LogParser components that must be present before a run starts
pub const REQUIRED_LOGPARSER_FILES: &[&str] = &["logparser.exe", "logparser.dll", "logparser.chm"];

// Intermediate files produced in the work directory
pub const SYSINFO_FILE: &str = "SysInfo.dat";
pub const TZINFO_FILE: &str = "TZInfo.dat";
pub const MFT_DUMP_FILE: &str = "MFTDump.csv";
pub const RDP_FILE: &str = "RDPGood.csv";
pub const FAILED_LOGIN_FILE: &str = "SecEvt4625.csv";
pub const EXPLICIT_LOGIN_FILE: &str = "SecEvt4648.csv";
pub const SERVICE_FILE: &str = "SysEvt7045.csv";
pub const NEW_TASK_FILE: &str = "SecEvt4698.csv";
pub const PREFETCH_FILE: &str = "WinPrefetchView.csv";
pub const AMCACHE_FILE: &str = "AmCache.dat";
pub const RECYCLE_FILE: &str = "RBin.dat";
pub const LNK_FILE: &str = "LNKFiles.csv";
pub const SHELLBAG_DIR: &str = "ShellBags";
pub const CHAINSAW_DIR: &str = "ChainCSV";
pub const HAYABUSA_DIR: &str = "Hayabusa";
pub const HAYABUSA_FILE: &str = "Hayabusa.csv";
pub const USER_HIVE_PREFIX: &str = "shlasst.";

/// Leftovers from a failed run that are removed before a new one starts
pub const WORK_FILE_LEFTOVERS: &[&str] = &[
    SYSINFO_FILE,
    TZINFO_FILE,
    MFT_DUMP_FILE,
    "MFTDump.log",
    RDP_FILE,
    FAILED_LOGIN_FILE,
    EXPLICIT_LOGIN_FILE,
    SERVICE_FILE,
    NEW_TASK_FILE,
    PREFETCH_FILE,
    AMCACHE_FILE,
    RECYCLE_FILE,
    LNK_FILE,
];

/// Chainsaw hunt outputs, in report order
pub const CHAINSAW_OUTPUTS: &[&str] = &[
    "log_tampering.csv",
    "account_tampering.csv",
    "login_attacks.csv",
    "antivirus.csv",
    "lateral_movement.csv",
    "powershell_script.csv",
    "rdp_attacks.csv",
    "rdp_events.csv",
    "service_installation.csv",
    "sigma.csv",
];

/// Archive extensions flagged in the file-browse section
pub const ARCHIVE_EXTENSIONS: &[&str] = &[".rar", ".tgz", ".gz", ".tar", ".cab", ".zip", ".arc", ".7z"];

// Indicator sentinels
pub const IP_SENTINELS: &[&str] = &["", "0.0.0.0", "::"];
pub const DOMAIN_SENTINELS: &[&str] = &["", "MD5"];
pub const HASH_SENTINELS: &[&str] = &["", "MD5"];

// Report markers
pub const NO_DATA_BANNER: &str = "No Data Found!";
pub const NO_INPUT_BANNER: &str = "No Input Data Found!";
pub const HIGHLIGHT_OPEN: &str = "<b><font color=red>";
pub const HIGHLIGHT_CLOSE: &str = "</font></b>";

/// Lookup link prefix used for hashes, domains and addresses
pub const LOOKUP_URL: &str = "https://www.virustotal.com/#/search/";
