use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Logical artifact sources inside a collection directory.
///
/// Each key is also the directive prefix used to override its location
/// (`MFTFile:RawData\MFT-D`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceKey {
    MFTFile,
    RegSoft,
    RegSyst,
    AmCache,
    Prefetc,
    RegUser,
    EvtDir1,
    EvtDir2,
    Recycle,
    Browser,
    Downlod,
    Collect,
    IPConns,
    IPConn2,
    UsrAsst,
    Powersh,
    LNKFile,
    AutoRun,
    SchTsk1,
    SchTsk2,
    DNSIpcf,
    DNSCach,
    ShelBag,
    PCAsist,
    LastAct,
    SrumDir,
    SysRegs,
}

impl SourceKey {
    pub const ALL: &'static [SourceKey] = &[
        SourceKey::MFTFile,
        SourceKey::RegSoft,
        SourceKey::RegSyst,
        SourceKey::AmCache,
        SourceKey::Prefetc,
        SourceKey::RegUser,
        SourceKey::EvtDir1,
        SourceKey::EvtDir2,
        SourceKey::Recycle,
        SourceKey::Browser,
        SourceKey::Downlod,
        SourceKey::Collect,
        SourceKey::IPConns,
        SourceKey::IPConn2,
        SourceKey::UsrAsst,
        SourceKey::Powersh,
        SourceKey::LNKFile,
        SourceKey::AutoRun,
        SourceKey::SchTsk1,
        SourceKey::SchTsk2,
        SourceKey::DNSIpcf,
        SourceKey::DNSCach,
        SourceKey::ShelBag,
        SourceKey::PCAsist,
        SourceKey::LastAct,
        SourceKey::SrumDir,
        SourceKey::SysRegs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKey::MFTFile => "MFTFile",
            SourceKey::RegSoft => "RegSoft",
            SourceKey::RegSyst => "RegSyst",
            SourceKey::AmCache => "AmCache",
            SourceKey::Prefetc => "Prefetc",
            SourceKey::RegUser => "RegUser",
            SourceKey::EvtDir1 => "EvtDir1",
            SourceKey::EvtDir2 => "EvtDir2",
            SourceKey::Recycle => "Recycle",
            SourceKey::Browser => "Browser",
            SourceKey::Downlod => "Downlod",
            SourceKey::Collect => "Collect",
            SourceKey::IPConns => "IPConns",
            SourceKey::IPConn2 => "IPConn2",
            SourceKey::UsrAsst => "UsrAsst",
            SourceKey::Powersh => "Powersh",
            SourceKey::LNKFile => "LNKFile",
            SourceKey::AutoRun => "AutoRun",
            SourceKey::SchTsk1 => "SchTsk1",
            SourceKey::SchTsk2 => "SchTsk2",
            SourceKey::DNSIpcf => "DNSIpcf",
            SourceKey::DNSCach => "DNSCach",
            SourceKey::ShelBag => "ShelBag",
            SourceKey::PCAsist => "PCAsist",
            SourceKey::LastAct => "LastAct",
            SourceKey::SrumDir => "SrumDir",
            SourceKey::SysRegs => "SysRegs",
        }
    }

    /// Location relative to the collection directory when not overridden
    pub fn default_path(&self) -> &'static str {
        match self {
            SourceKey::MFTFile => "RawData/MFT-C",
            SourceKey::RegSoft => "Reg/SOFTWARE",
            SourceKey::RegSyst => "Reg/SYSTEM",
            SourceKey::AmCache => "Reg/AmCache.hve",
            SourceKey::Prefetc => "Prf",
            SourceKey::RegUser => "Reg",
            SourceKey::EvtDir1 => "Evt/WINDOWS/System32/winevt/Logs",
            SourceKey::EvtDir2 => "WINDOWS/Native/winevt/Logs",
            SourceKey::Recycle => "RBin",
            SourceKey::Browser => "Brw/BrowseHist.csv",
            SourceKey::Downlod => "Brw/BrowseDown.csv",
            SourceKey::Collect => "AChoirX",
            SourceKey::IPConns => "Sys/Cports.csv",
            SourceKey::IPConn2 => "Sys/Netstat-abno.dat",
            SourceKey::UsrAsst => "Sys/UserAssist.csv",
            SourceKey::Powersh => "Psh",
            SourceKey::LNKFile => "Lnk",
            SourceKey::AutoRun => "Arn/AutoRun.dat",
            SourceKey::SchTsk1 => "Sch",
            SourceKey::SchTsk2 => "C/Windows/System32/Tasks",
            SourceKey::DNSIpcf => "Sys/IPCfgDNS.dat",
            SourceKey::DNSCach => "Sys/DNSCache.csv",
            SourceKey::ShelBag => "Reg",
            SourceKey::PCAsist => "PCA",
            SourceKey::LastAct => "Sys/LastActivity.csv",
            SourceKey::SrumDir => "Sys/Sys32/sru",
            SourceKey::SysRegs => "Reg/Config",
        }
    }

    /// Human description used in progress logging
    pub fn description(&self) -> &'static str {
        match self {
            SourceKey::MFTFile => "MFT Source File",
            SourceKey::RegSoft => "Software Registry Source File",
            SourceKey::RegSyst => "System Registry Source File",
            SourceKey::AmCache => "AmCache Registry Source File",
            SourceKey::Prefetc => "Prefetch Directory",
            SourceKey::RegUser => "User Profiles Directory",
            SourceKey::EvtDir1 => "Event Logs Directory 1",
            SourceKey::EvtDir2 => "Event Logs Directory 2 (Alternate)",
            SourceKey::Recycle => "Recycle Bin",
            SourceKey::Browser => "Browser History",
            SourceKey::Downlod => "Browser Downloads",
            SourceKey::Collect => "Triage Collector Data",
            SourceKey::IPConns => "IP Connection Data",
            SourceKey::IPConn2 => "Netstat -abno IP Connection Data",
            SourceKey::UsrAsst => "User Assist Data",
            SourceKey::Powersh => "User Powershell Logs",
            SourceKey::LNKFile => "User LNK Files",
            SourceKey::AutoRun => "Collected AutoRuns",
            SourceKey::SchTsk1 => "Scheduled Tasks Directory",
            SourceKey::SchTsk2 => "Scheduled Tasks Directory 2 (Alternate)",
            SourceKey::DNSIpcf => "DNS IPConfig Data",
            SourceKey::DNSCach => "DNS Cache Data",
            SourceKey::ShelBag => "Shell Bags Directory",
            SourceKey::PCAsist => "Program Compatibility Assist Directory",
            SourceKey::LastAct => "Last Activity Data",
            SourceKey::SrumDir => "SRUM Directory",
            SourceKey::SysRegs => "System Registry Directory",
        }
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SourceKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        SourceKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| anyhow!("Unknown source key: {}", s))
    }
}

/// Turn a configured relative location into a path under `root`.
///
/// Directive files are usually written on Windows, so both separators are
/// accepted and a leading separator does not make the value absolute.
pub fn join_collection_path(root: &Path, relative: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for part in relative.split(['\\', '/']).filter(|p| !p.is_empty()) {
        path.push(part);
    }
    path
}
