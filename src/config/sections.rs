use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Report areas that can be switched on with a `Run:<Name>` directive.
///
/// One name may enable several report sections (for example `FailedLogins`
/// covers both failed and explicit-credential logins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SectionName {
    SmallDeleted,
    MediumDeleted,
    LargeDeleted,
    LargeActive,
    TempActiveExe,
    TempDeletedExe,
    SuccessRDP,
    FailedLogins,
    FileBrowseArchive,
    FileBrowseHistory,
    InetBrowseHistory,
    PrefetchHistory,
    IPConnectionInfo,
    UserAssist,
    AmCache,
    AutoRuns,
    Services,
    ScheduledTasks,
    DNSCache,
    RecycleBin,
    Chainsaw,
    Hayabusa,
    IndicatorsIP,
    IndicatorsHash,
    IndicatorsDomain,
    LnkParse,
    PShelLog,
    ShellBags,
    PCAssist,
}

impl SectionName {
    /// Every directive name, in the order they are documented
    pub const ALL: &'static [SectionName] = &[
        SectionName::SmallDeleted,
        SectionName::MediumDeleted,
        SectionName::LargeDeleted,
        SectionName::LargeActive,
        SectionName::TempActiveExe,
        SectionName::TempDeletedExe,
        SectionName::SuccessRDP,
        SectionName::FailedLogins,
        SectionName::FileBrowseArchive,
        SectionName::FileBrowseHistory,
        SectionName::InetBrowseHistory,
        SectionName::PrefetchHistory,
        SectionName::IPConnectionInfo,
        SectionName::UserAssist,
        SectionName::AmCache,
        SectionName::AutoRuns,
        SectionName::Services,
        SectionName::ScheduledTasks,
        SectionName::DNSCache,
        SectionName::RecycleBin,
        SectionName::Chainsaw,
        SectionName::Hayabusa,
        SectionName::IndicatorsIP,
        SectionName::IndicatorsHash,
        SectionName::IndicatorsDomain,
        SectionName::LnkParse,
        SectionName::PShelLog,
        SectionName::ShellBags,
        SectionName::PCAssist,
    ];

    /// Sections that read the parsed $MFT
    pub const MFT: &'static [SectionName] = &[
        SectionName::SmallDeleted,
        SectionName::MediumDeleted,
        SectionName::LargeDeleted,
        SectionName::LargeActive,
        SectionName::TempActiveExe,
        SectionName::TempDeletedExe,
    ];

    /// Sections that read the Security and System event logs
    pub const EVENT_LOG: &'static [SectionName] = &[
        SectionName::SuccessRDP,
        SectionName::FailedLogins,
        SectionName::Services,
        SectionName::ScheduledTasks,
    ];

    /// The directive spelling, e.g. `SuccessRDP`
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionName::SmallDeleted => "SmallDeleted",
            SectionName::MediumDeleted => "MediumDeleted",
            SectionName::LargeDeleted => "LargeDeleted",
            SectionName::LargeActive => "LargeActive",
            SectionName::TempActiveExe => "TempActiveExe",
            SectionName::TempDeletedExe => "TempDeletedExe",
            SectionName::SuccessRDP => "SuccessRDP",
            SectionName::FailedLogins => "FailedLogins",
            SectionName::FileBrowseArchive => "FileBrowseArchive",
            SectionName::FileBrowseHistory => "FileBrowseHistory",
            SectionName::InetBrowseHistory => "InetBrowseHistory",
            SectionName::PrefetchHistory => "PrefetchHistory",
            SectionName::IPConnectionInfo => "IPConnectionInfo",
            SectionName::UserAssist => "UserAssist",
            SectionName::AmCache => "AmCache",
            SectionName::AutoRuns => "AutoRuns",
            SectionName::Services => "Services",
            SectionName::ScheduledTasks => "ScheduledTasks",
            SectionName::DNSCache => "DNSCache",
            SectionName::RecycleBin => "RecycleBin",
            SectionName::Chainsaw => "Chainsaw",
            SectionName::Hayabusa => "Hayabusa",
            SectionName::IndicatorsIP => "IndicatorsIP",
            SectionName::IndicatorsHash => "IndicatorsHash",
            SectionName::IndicatorsDomain => "IndicatorsDomain",
            SectionName::LnkParse => "LnkParse",
            SectionName::PShelLog => "PShelLog",
            SectionName::ShellBags => "ShellBags",
            SectionName::PCAssist => "PCAssist",
        }
    }
}

impl fmt::Display for SectionName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SectionName {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        SectionName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| anyhow!("Unknown report section: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_name_round_trips_through_from_str() {
        for name in SectionName::ALL {
            assert_eq!(name.as_str().parse::<SectionName>().unwrap(), *name);
        }
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        assert!("AllAll".parse::<SectionName>().is_err());
        assert!("successrdp".parse::<SectionName>().is_err());
    }

    #[test]
    fn test_mft_group_is_subset_of_all() {
        for name in SectionName::MFT {
            assert!(SectionName::ALL.contains(name));
        }
    }
}
