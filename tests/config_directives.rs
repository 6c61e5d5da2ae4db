//! Directive file handling as seen from outside the crate

use std::fs;

use anyhow::Result;
use tempfile::TempDir;

use triage_report::config::{
    create_default_config_file, parse_config, render_default_config, RunConfig, SectionName, SourceKey,
};

#[test]
fn test_missing_config_runs_everything() -> Result<()> {
    let dir = TempDir::new()?;
    let config = parse_config(&dir.path().join("AChReport.cfg"))?;

    assert!(config.run_all);
    assert!(config.iocs.is_empty());
    assert!(config.is_enabled(SectionName::Hayabusa));
    assert_eq!(config.source_path(SourceKey::MFTFile), "RawData/MFT-C");
    Ok(())
}

#[test]
fn test_default_file_round_trips_to_defaults() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("cfg").join("AChReport.cfg");
    create_default_config_file(&path)?;

    let written = fs::read_to_string(&path)?;
    assert_eq!(written, render_default_config());

    let config = parse_config(&path)?;
    assert!(config.run_all);
    assert!(config.overrides.is_empty());
    assert!(config.iocs.is_empty());
    assert_eq!(config.pre_conversion, None);
    Ok(())
}

#[test]
fn test_narrowed_run_and_overrides() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("AChReport.cfg");
    fs::write(
        &path,
        "* narrowed run\r\n\
         Run:SuccessRDP\r\n\
         Run:DNSCache\r\n\
         MFTFile:RawData\\MFT-D\r\n\
         MFTFile:RawData\\MFT-E\r\n\
         Browser:Brw\\Other.csv\r\n\
         IOC:Evil.EXE\r\n\
         IOC:10.0.0.5\r\n",
    )?;

    let config = parse_config(&path)?;
    assert!(!config.run_all);
    assert!(config.is_enabled(SectionName::SuccessRDP));
    assert!(config.is_enabled(SectionName::DNSCache));
    assert!(!config.is_enabled(SectionName::SmallDeleted));

    // Last override wins
    assert_eq!(config.source_path(SourceKey::MFTFile), "RawData\\MFT-E");
    // Downloads follow the history file
    assert_eq!(config.source_path(SourceKey::Browser), "Brw\\Other.csv");
    assert_eq!(config.source_path(SourceKey::Downlod), "Brw\\BrowseDown.csv");

    assert_eq!(config.iocs, vec!["evil.exe".to_string(), "10.0.0.5".to_string()]);
    Ok(())
}

#[test]
fn test_unknown_directives_are_ignored() {
    let config = RunConfig::from_directives("Run:NoSuchSection\nBogus:value\nnot a directive\n");

    assert!(!config.run_all);
    assert!(config.enabled.is_empty());
    assert!(config.overrides.is_empty());
}

#[test]
fn test_branding_and_pre_conversion() {
    let config = RunConfig::from_directives("Brander:<b>ACME IR</b>\nPreConv:convert.bat\n");

    assert!(config.run_all);
    assert_eq!(config.branding.as_deref(), Some("<b>ACME IR</b>"));
    assert_eq!(config.pre_conversion.as_deref(), Some("convert.bat"));
}
