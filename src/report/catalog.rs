//! The report's section catalog.
//!
//! Order here is report order. Each entry says which `Run:` directive
//! switches it on and how its body is produced; the pipeline walks the list
//! and never special-cases a section.

use anyhow::Result;

use crate::accumulator::IndicatorKind;
use crate::config::{RunConfig, SectionName};
use crate::context::RunContext;
use crate::report::collect;
use crate::report::renderer::SectionBody;

/// Builds a section body from the run context
pub type Collector = fn(&mut RunContext) -> Result<SectionBody>;

/// Which directive enables a section
#[derive(Debug, Clone, Copy)]
pub enum Enablement {
    Always,
    Section(SectionName),
    AnyOf(&'static [SectionName]),
    /// Present only when the configuration lists IOCs
    IocList,
}

#[derive(Debug, Clone, Copy)]
pub enum SectionContent {
    Collected(Collector),
    /// De-duplicated indicator list, written after every collected section
    Dump(IndicatorKind),
    IocSummary,
}

#[derive(Debug, Clone, Copy)]
pub struct SectionDescriptor {
    pub anchor: &'static str,
    /// Short label in the navigation strip
    pub nav_label: &'static str,
    pub title: &'static str,
    /// Analyst guidance shown under the heading (trusted HTML)
    pub help: &'static str,
    pub enabled_by: Enablement,
    pub content: SectionContent,
}

impl SectionDescriptor {
    pub fn is_enabled(&self, config: &RunConfig) -> bool {
        match self.enabled_by {
            Enablement::Always => true,
            Enablement::Section(name) => config.is_enabled(name),
            Enablement::AnyOf(names) => config.any_enabled(names),
            Enablement::IocList => config.has_iocs(),
        }
    }

    pub fn is_trailer(&self) -> bool {
        !matches!(self.content, SectionContent::Collected(_))
    }
}

const MFT_SOURCE: &str = "<font color=gray size=-1><br><br>Source: Parsed $MFT, TZ is UTC</font>";

/// Every section in report order
pub static CATALOG: [SectionDescriptor; 37] = [
    SectionDescriptor {
        anchor: "SysInfo",
        nav_label: "Info",
        title: "Basic Endpoint Information",
        help: "Operating system version, install date and registered owner of the endpoint, \
               followed by its time zone settings.",
        enabled_by: Enablement::Always,
        content: SectionContent::Collected(collect::system_info),
    },
    SectionDescriptor {
        anchor: "Logon",
        nav_label: "Logon",
        title: "Logon Information",
        help: "Users logged on to the endpoint when it was collected.",
        enabled_by: Enablement::Always,
        content: SectionContent::Collected(collect::logons),
    },
    SectionDescriptor {
        anchor: "Deleted",
        nav_label: "Deltd",
        title: "Small Deleted Files (Between 1 Meg and 10 meg)",
        help: "Deleted files between 1 and 10 megabytes. Small files created for staging and \
               then deleted can indicate exfiltration.",
        enabled_by: Enablement::Section(SectionName::SmallDeleted),
        content: SectionContent::Collected(collect::small_deleted),
    },
    SectionDescriptor {
        anchor: "MedDeleted",
        nav_label: "MedDel",
        title: "Medium Deleted Files (Between 10 Meg and 100 meg)",
        help: "Deleted files between 10 and 100 megabytes.",
        enabled_by: Enablement::Section(SectionName::MediumDeleted),
        content: SectionContent::Collected(collect::medium_deleted),
    },
    SectionDescriptor {
        anchor: "LrgDeleted",
        nav_label: "LrgDel",
        title: "Large Deleted Files (Over 100 Meg)",
        help: "Deleted files over 100 megabytes. Large archives that were deleted are worth a close look.",
        enabled_by: Enablement::Section(SectionName::LargeDeleted),
        content: SectionContent::Collected(collect::large_deleted),
    },
    SectionDescriptor {
        anchor: "Active",
        nav_label: "Activ",
        title: "Large Active Files (Over 100 Meg)",
        help: "Active files over 100 megabytes.",
        enabled_by: Enablement::Section(SectionName::LargeActive),
        content: SectionContent::Collected(collect::large_active),
    },
    SectionDescriptor {
        anchor: "ExeTemp",
        nav_label: "Temp",
        title: "Active Executable Files in Temp Directories",
        help: "Executables that still exist in Temp directories. Randomly named executables here \
               are a common malware trait.",
        enabled_by: Enablement::Section(SectionName::TempActiveExe),
        content: SectionContent::Collected(collect::temp_active_exe),
    },
    SectionDescriptor {
        anchor: "DelExeTemp",
        nav_label: "DelTmp",
        title: "Deleted Executable Files in Temp Directories",
        help: "Executables that were deleted from Temp directories.",
        enabled_by: Enablement::Section(SectionName::TempDeletedExe),
        content: SectionContent::Collected(collect::temp_deleted_exe),
    },
    SectionDescriptor {
        anchor: "MFTIOCMatch",
        nav_label: "MFTIOC",
        title: "IOC Matches Found in the $MFT",
        help: "Every $MFT entry, deleted or active, that matched a configured IOC.",
        enabled_by: Enablement::AnyOf(SectionName::MFT),
        content: SectionContent::Collected(collect::mft_ioc_matches),
    },
    SectionDescriptor {
        anchor: "RDP",
        nav_label: "RDP",
        title: "Successful RDP Logins",
        help: "Remote Desktop logons (event 4624, logon type 10). Check the source addresses \
               and accounts for anything unexpected.",
        enabled_by: Enablement::Section(SectionName::SuccessRDP),
        content: SectionContent::Collected(collect::rdp_logons),
    },
    SectionDescriptor {
        anchor: "Logins",
        nav_label: "FaiLgn",
        title: "Failed Logins",
        help: "Failed logons (event 4625) grouped by account. Many failures against one account \
               suggest password guessing.",
        enabled_by: Enablement::Section(SectionName::FailedLogins),
        content: SectionContent::Collected(collect::failed_logons),
    },
    SectionDescriptor {
        anchor: "AttLogin",
        nav_label: "AttLgn",
        title: "Attempted Explicit Logins",
        help: "Logons with explicit credentials (event 4648), often seen in lateral movement.",
        enabled_by: Enablement::Section(SectionName::FailedLogins),
        content: SectionContent::Collected(collect::explicit_logons),
    },
    SectionDescriptor {
        anchor: "Browser",
        nav_label: "Brwsr",
        title: "File Browse (Archive files) History Information",
        help: "Archive files opened through a browser. Attackers often stage data in archives \
               before exfiltration.",
        enabled_by: Enablement::Section(SectionName::FileBrowseArchive),
        content: SectionContent::Collected(collect::browsed_archives),
    },
    SectionDescriptor {
        anchor: "BrwFilHist",
        nav_label: "BrwFil",
        title: "File Browse History Information",
        help: "Local files opened through a browser.",
        enabled_by: Enablement::Section(SectionName::FileBrowseHistory),
        content: SectionContent::Collected(collect::browsed_files),
    },
    SectionDescriptor {
        anchor: "BrwHist",
        nav_label: "BrwHst",
        title: "Internet Browse History Information",
        help: "Web sites visited from the endpoint.",
        enabled_by: Enablement::Section(SectionName::InetBrowseHistory),
        content: SectionContent::Collected(collect::browsed_sites),
    },
    SectionDescriptor {
        anchor: "BrwDown",
        nav_label: "BrwDwn",
        title: "Internet Browser Downloads Information",
        help: "Files downloaded through a browser.",
        enabled_by: Enablement::Section(SectionName::InetBrowseHistory),
        content: SectionContent::Collected(collect::browser_downloads),
    },
    SectionDescriptor {
        anchor: "Prefetch",
        nav_label: "Pref",
        title: "Prefetch History Information",
        help: "Programs executed on the endpoint, from Prefetch. Look for unusual names or \
               programs run from unusual locations.",
        enabled_by: Enablement::Section(SectionName::PrefetchHistory),
        content: SectionContent::Collected(collect::prefetch),
    },
    SectionDescriptor {
        anchor: "PCAsist",
        nav_label: "PCA",
        title: "Windows 11 Program Compatibility Assistant Information",
        help: "Program launches recorded by the Program Compatibility Assistant (Windows 11 only).",
        enabled_by: Enablement::Section(SectionName::PCAssist),
        content: SectionContent::Collected(collect::compatibility_assistant),
    },
    SectionDescriptor {
        anchor: "IPConn",
        nav_label: "IPCon",
        title: "IP Connections Information",
        help: "TCP and UDP connections open at collection time. Remote addresses link to a \
               threat-intel lookup.",
        enabled_by: Enablement::Section(SectionName::IPConnectionInfo),
        content: SectionContent::Collected(collect::connections),
    },
    SectionDescriptor {
        anchor: "AmCache",
        nav_label: "AmCsh",
        title: "AmCache Hive Information",
        help: "Executables recorded in the AmCache hive with their hashes.",
        enabled_by: Enablement::Section(SectionName::AmCache),
        content: SectionContent::Collected(collect::amcache),
    },
    SectionDescriptor {
        anchor: "UserAssist",
        nav_label: "UsrAst",
        title: "HKCU User Assist Information",
        help: "Programs launched by the collecting user, from UserAssist.",
        enabled_by: Enablement::Section(SectionName::UserAssist),
        content: SectionContent::Collected(collect::user_assist),
    },
    SectionDescriptor {
        anchor: "MoreUsrAst",
        nav_label: "MoreUA",
        title: "Other User Assist Information",
        help: "Shell folders and UserAssist entries from every user registry hive.",
        enabled_by: Enablement::Section(SectionName::UserAssist),
        content: SectionContent::Collected(collect::user_hives),
    },
    SectionDescriptor {
        anchor: "PShell",
        nav_label: "Pshl",
        title: "PowerShell Logs",
        help: "PowerShell console history of every profile.",
        enabled_by: Enablement::Section(SectionName::PShelLog),
        content: SectionContent::Collected(collect::powershell_history),
    },
    SectionDescriptor {
        anchor: "LNKFiles",
        nav_label: "LNK",
        title: "Desktop and Recent LNK Files",
        help: "Shortcut files from desktops and recent items, showing files and locations users opened.",
        enabled_by: Enablement::Section(SectionName::LnkParse),
        content: SectionContent::Collected(collect::lnk_files),
    },
    SectionDescriptor {
        anchor: "AutoRun",
        nav_label: "AutRun",
        title: "AutoRun Information (Run And RunOnce)",
        help: "Programs started from the Run and RunOnce keys, the most common persistence location.",
        enabled_by: Enablement::Section(SectionName::AutoRuns),
        content: SectionContent::Collected(collect::run_keys),
    },
    SectionDescriptor {
        anchor: "AllAutoRun",
        nav_label: "AllRun",
        title: "AutoRun Information (All)",
        help: "Every autostart location with executable hashes.",
        enabled_by: Enablement::Section(SectionName::AutoRuns),
        content: SectionContent::Collected(collect::all_autoruns),
    },
    SectionDescriptor {
        anchor: "InstSvc",
        nav_label: "EVTx",
        title: "Installed Services",
        help: "Services installed on the endpoint (event 7045).",
        enabled_by: Enablement::Section(SectionName::Services),
        content: SectionContent::Collected(collect::installed_services),
    },
    SectionDescriptor {
        anchor: "NewTask",
        nav_label: "Tasks",
        title: "New Scheduled Tasks",
        help: "Scheduled tasks created on the endpoint (event 4698), then every task definition found.",
        enabled_by: Enablement::Section(SectionName::ScheduledTasks),
        content: SectionContent::Collected(collect::scheduled_tasks),
    },
    SectionDescriptor {
        anchor: "DNSCache",
        nav_label: "DNS",
        title: "DNS Cache (IPConfig /displaydns)",
        help: "Names resolved recently by the endpoint.",
        enabled_by: Enablement::Section(SectionName::DNSCache),
        content: SectionContent::Collected(collect::dns_cache),
    },
    SectionDescriptor {
        anchor: "RBin",
        nav_label: "RBin",
        title: "Recycle Bin ($Recycle.Bin) Information",
        help: "Files sitting in the Recycle Bin.",
        enabled_by: Enablement::Section(SectionName::RecycleBin),
        content: SectionContent::Collected(collect::recycle_bin),
    },
    SectionDescriptor {
        anchor: "ShellBags",
        nav_label: "ShlBg",
        title: "Shell Bags Output",
        help: "Folders each user browsed in Explorer.",
        enabled_by: Enablement::Section(SectionName::ShellBags),
        content: SectionContent::Collected(collect::shellbags),
    },
    SectionDescriptor {
        anchor: "ChainSaw",
        nav_label: "ChSw",
        title: "ChainSaw Output",
        help: "Chainsaw detections over the event logs, grouped by hunt.",
        enabled_by: Enablement::Section(SectionName::Chainsaw),
        content: SectionContent::Collected(collect::chainsaw),
    },
    SectionDescriptor {
        anchor: "Hayabusa",
        nav_label: "Haya",
        title: "Hayabusa Output",
        help: "High and critical Hayabusa detections over the event logs.",
        enabled_by: Enablement::Section(SectionName::Hayabusa),
        content: SectionContent::Collected(collect::hayabusa),
    },
    SectionDescriptor {
        anchor: "BulkIPs",
        nav_label: "IPs",
        title: "Indicators: IP Address Data",
        help: "De-duplicated IP addresses seen in other sections, for bulk threat-intel lookup. \
               <b>Only sections that ran contribute.</b>",
        enabled_by: Enablement::Section(SectionName::IndicatorsIP),
        content: SectionContent::Dump(IndicatorKind::Ip),
    },
    SectionDescriptor {
        anchor: "BulkHash",
        nav_label: "Hash",
        title: "Indicators: File Hash Data",
        help: "De-duplicated file hashes seen in other sections, for bulk threat-intel lookup. \
               <b>Only sections that ran contribute.</b>",
        enabled_by: Enablement::Section(SectionName::IndicatorsHash),
        content: SectionContent::Dump(IndicatorKind::Hash),
    },
    SectionDescriptor {
        anchor: "BulkDoms",
        nav_label: "Doms",
        title: "Indicators: Domain Data",
        help: "De-duplicated domains seen in other sections, for bulk threat-intel lookup. \
               <b>Only sections that ran contribute.</b>",
        enabled_by: Enablement::Section(SectionName::IndicatorsDomain),
        content: SectionContent::Dump(IndicatorKind::Domain),
    },
    SectionDescriptor {
        anchor: "IOCList",
        nav_label: "IOC",
        title: "IOCs to Search For",
        help: "Configured IOCs with the number of matches found. Matches are highlighted in red \
               throughout the report; click an IOC to search for it.",
        enabled_by: Enablement::IocList,
        content: SectionContent::IocSummary,
    },
];

/// Help text for MFT sections carries the source note
pub fn help_with_source(descriptor: &SectionDescriptor) -> String {
    let reads_mft = match descriptor.enabled_by {
        Enablement::Section(name) => SectionName::MFT.contains(&name),
        Enablement::AnyOf(names) => names == SectionName::MFT,
        _ => false,
    };
    if reads_mft {
        format!("{}{}", descriptor.help, MFT_SOURCE)
    } else {
        descriptor.help.to_string()
    }
}

/// Navigation entries for the sections `config` enables
pub fn navigation(config: &RunConfig) -> Vec<(&'static str, &'static str)> {
    CATALOG
        .iter()
        .filter(|descriptor| descriptor.is_enabled(config))
        .map(|descriptor| (descriptor.anchor, descriptor.nav_label))
        .collect()
}
