//! End-to-end report runs against scripted collections

mod common;

use std::fs;

use anyhow::Result;
use serde_json::Value;

use common::{Case, ScriptedRunner};
use triage_report::pipeline::{run_with_runner, RunState};
use triage_report::report::SectionState;

const USER_ASSIST: &str = "Count,Focus,LastExecuted,Program\n\
                           5,1,2024-01-01 10:00:00,C:\\Users\\bob\\evil.exe\n";

const AUTORUNS: &str = "Time,Entry Location,Entry,Enabled,Category,Profile,Desc,Company,Image Path,Version,Launch String,SHA-256\n\
                        20240101,HKLM\\SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Run,Updater,enabled,Logon,System,Updater,ACME,c:\\acme\\upd.exe,1.0,-silent,abcdef0123\n";

const DNS_CACHE: &str = "Entry,Name,Type,TTL,Data\n\
                         example.com,example.com,1,300,93.184.216.34\n\
                         www.example.com,www.example.com,1,300,93.184.216.34\n";

const BROWSE_HISTORY: &str = "URL,Title,Visit Time,Visit Count,Visited From,Visit Type,Web Browser,User Profile\n\
                              https://evil.example.net/payload,Payload,2024-01-02 09:00:00,1,,Link,Chrome,bob\n\
                              file:///C:/Users/bob/Downloads/loot.zip,,2024-01-02 09:05:00,1,,Link,Edge,bob\n";

fn populated(case: &Case) -> Result<()> {
    case.write("Sys/UserAssist.csv", USER_ASSIST)?;
    case.write("Arn/AutoRun.dat", AUTORUNS)?;
    case.write("Sys/DNSCache.csv", DNS_CACHE)?;
    case.write("Brw/BrowseHist.csv", BROWSE_HISTORY)?;
    Ok(())
}

fn state_of(summary: &triage_report::pipeline::RunSummary, anchor: &str) -> Option<SectionState> {
    summary.section(anchor).map(|section| section.state)
}

#[test]
fn test_default_run_renders_available_sources() -> Result<()> {
    let case = Case::new("HOST1", None)?;
    populated(&case)?;

    let summary = run_with_runner(&case.options(), Box::new(ScriptedRunner::new()))?;
    assert_eq!(summary.state, RunState::Done);
    assert_eq!(summary.sections.len(), 37);

    assert_eq!(state_of(&summary, "UserAssist"), Some(SectionState::EnabledWithData));
    assert_eq!(state_of(&summary, "AutoRun"), Some(SectionState::EnabledWithData));
    assert_eq!(state_of(&summary, "AllAutoRun"), Some(SectionState::EnabledWithData));
    assert_eq!(state_of(&summary, "DNSCache"), Some(SectionState::EnabledWithData));
    assert_eq!(state_of(&summary, "BrwHist"), Some(SectionState::EnabledWithData));
    assert_eq!(state_of(&summary, "BrwFilHist"), Some(SectionState::EnabledWithData));
    assert_eq!(state_of(&summary, "Browser"), Some(SectionState::EnabledWithData));

    // Nothing to read for these
    assert_eq!(state_of(&summary, "Deleted"), Some(SectionState::EnabledNoData));
    assert_eq!(state_of(&summary, "RDP"), Some(SectionState::EnabledNoData));
    // No IOC directives
    assert_eq!(state_of(&summary, "IOCList"), Some(SectionState::Disabled));

    let html = case.report()?;
    assert!(html.contains("<a name=UserAssist></a>"));
    assert!(html.contains("No Input Data Found!"));
    assert!(!html.contains("<a name=IOCList></a>"));
    Ok(())
}

#[test]
fn test_indicator_dumps_and_ioc_summary() -> Result<()> {
    let case = Case::new("HOST1", Some("Run:AllAll\nIOC:Evil\n"))?;
    populated(&case)?;

    let summary = run_with_runner(&case.options(), Box::new(ScriptedRunner::new()))?;
    // One UserAssist record and one visited site
    assert_eq!(summary.total_ioc_hits, 2);

    let ips = summary.section("BulkIPs").map(|section| section.count);
    let domains = summary.section("BulkDoms").map(|section| section.count);
    let hashes = summary.section("BulkHash").map(|section| section.count);
    assert_eq!(ips, Some(1));
    assert_eq!(domains, Some(3));
    assert_eq!(hashes, Some(1));

    let html = case.report()?;
    assert!(html.contains("Records Found: 1<br>\nDuplicates Found: 1"));
    assert!(html.contains("Records Found: 3<br>\nDuplicates Found: 0"));
    assert!(html.contains("<A HREF='javascript:searchIOC(\"evil\")'> evil</A> (2)<br>"));
    assert!(html.contains("Total IOC Hits: 2"));
    assert!(html.contains("<b><font color=red>"));

    // The IOC list closes the report
    let ioc_list = html.find("<a name=IOCList></a>");
    let bulk_ips = html.find("<a name=BulkIPs></a>");
    assert!(bulk_ips.is_some() && bulk_ips < ioc_list);
    Ok(())
}

#[test]
fn test_narrowed_run_omits_disabled_sections() -> Result<()> {
    let case = Case::new("HOST1", Some("Run:UserAssist\n"))?;
    case.write("Sys/UserAssist.csv", "Count,Focus,LastExecuted,Program\n")?;

    let summary = run_with_runner(&case.options(), Box::new(ScriptedRunner::new()))?;
    assert_eq!(state_of(&summary, "UserAssist"), Some(SectionState::EnabledNoData));
    assert_eq!(state_of(&summary, "DNSCache"), Some(SectionState::Disabled));
    assert_eq!(state_of(&summary, "SysInfo"), Some(SectionState::EnabledNoData));

    let html = case.report()?;
    assert!(html.contains("<a name=UserAssist></a>"));
    assert!(html.contains("No Data Found!"));
    assert!(!html.contains("<a name=DNSCache></a>"));
    assert!(!html.contains("<a name=Deleted></a>"));
    assert!(!html.contains("<a name=BulkIPs></a>"));
    Ok(())
}

#[test]
fn test_rdp_logons_from_event_query() -> Result<()> {
    let case = Case::new("HOST1", Some("Run:SuccessRDP\n"))?;
    case.install_tool("SYS/LogParser.exe")?;
    fs::create_dir_all(case.collection.join("Evt/WINDOWS/System32/winevt/Logs"))?;

    let runner = ScriptedRunner::new().with_output(
        "LogParser.exe",
        "Date,LoginID,Domain,Workstation,LogonType,RemoteIP\n\
         2024-01-01 10:00:00,bob,CORP,WS1,10,10.1.2.3\n\
         2024-01-01 11:00:00,bob,CORP,WS1,10,10.1.2.3\n",
    );

    let mut options = case.options();
    options.keep_indicator_files = true;
    let summary = run_with_runner(&options, Box::new(runner))?;

    let rdp = summary.section("RDP").map(|section| (section.state, section.count));
    assert_eq!(rdp, Some((SectionState::EnabledWithData, 2)));
    assert_eq!(state_of(&summary, "Logins"), Some(SectionState::Disabled));

    let html = case.report()?;
    assert!(html.contains("<a name=RDP></a>"));
    assert!(html.contains("10.1.2.3"));
    assert!(!html.contains("<a name=Deleted></a>"));

    // The query output is removed once rendered
    assert!(!case.work_dir().join("RDPGood.csv").exists());

    let ips = fs::read_to_string(case.work_dir().join("AllIps.txt"))?;
    assert_eq!(ips.lines().collect::<Vec<_>>(), vec!["10.1.2.3", "10.1.2.3"]);
    Ok(())
}

#[test]
fn test_side_files_removed_by_default() -> Result<()> {
    let case = Case::new("HOST1", None)?;
    populated(&case)?;

    run_with_runner(&case.options(), Box::new(ScriptedRunner::new()))?;

    assert!(!case.work_dir().join("AllIps.txt").exists());
    assert!(!case.work_dir().join("AllDoms.txt").exists());
    assert!(!case.work_dir().join("AllHash.txt").exists());
    Ok(())
}

#[test]
fn test_run_summary_json() -> Result<()> {
    let case = Case::new("HOST1", Some("Run:AllAll\nIOC:evil\n"))?;
    populated(&case)?;

    let summary = run_with_runner(&case.options(), Box::new(ScriptedRunner::new()))?;
    let json: Value = serde_json::from_str(&fs::read_to_string(&summary.summary_path)?)?;

    assert_eq!(json["collection"], "HOST1");
    assert_eq!(json["total_ioc_hits"], 2);
    assert_eq!(json["iocs"][0]["pattern"], "evil");
    assert_eq!(json["iocs"][0]["hits"], 2);
    assert_eq!(json["indicators"]["ip"]["unique"], 1);
    assert_eq!(json["indicators"]["ip"]["duplicates"], 1);
    assert_eq!(json["indicators"]["domain"]["unique"], 3);
    assert_eq!(json["indicators"]["hash"]["unique"], 1);
    assert!(json["mft_backend"].is_null());
    assert_eq!(json["sections"].as_array().map(Vec::len), Some(37));
    assert_eq!(json["report_sha256"].as_str().map(str::len), Some(64));
    Ok(())
}
