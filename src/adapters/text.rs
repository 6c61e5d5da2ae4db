//! Line-oriented tool output.
//!
//! These tools print human-readable reports rather than delimited rows, so
//! each parser walks the lines and assembles records from labelled values.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{NormalizedRecord, SourceKind};

lazy_static! {
    /// `ipconfig /displaydns` labelled value, e.g. `    A (Host) Record . . . : 1.2.3.4`
    static ref DNS_FIELD: Regex =
        Regex::new(r"^\s*(Record Name|A \(Host\) Record|SRV Record|PTR Record)[\s.]*:\s?(.*)$").unwrap();

    /// `netstat -abno` connection line
    static ref NETSTAT_CONN: Regex = Regex::new(r"^  (TCP|UDP) ").unwrap();

    /// Task XML elements carrying the task name and the launched command
    static ref TASK_URI: Regex = Regex::new(r"<URI>(.*?)(</URI>|$)").unwrap();
    static ref TASK_COMMAND: Regex = Regex::new(r"<Command>(.*?)(</Command>|$)").unwrap();
}

pub const DNS_REQUEST: &str = "DNS Request";
pub const DNS_NAME: &str = "Record Name";
pub const DNS_RESOLUTION: &str = "Resolution";
pub const DNS_TYPE: &str = "Record Type";

/// Resolution type of an ipconfig DNS record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsRecordType {
    Host,
    Srv,
    Ptr,
    NotFound,
}

impl DnsRecordType {
    pub fn label(&self) -> &'static str {
        match self {
            DnsRecordType::Host => "A (Host)",
            DnsRecordType::Srv => "SRV Record",
            DnsRecordType::Ptr => "PTR Record",
            DnsRecordType::NotFound => "NA",
        }
    }
}

/// Parse `ipconfig /displaydns` output.
///
/// The line above a dashed separator names the request; each resolution
/// below it becomes one record.
pub fn parse_ipconfig_dns(text: &str) -> Vec<NormalizedRecord> {
    let mut records = Vec::new();
    let mut request = String::new();
    let mut last_line = String::new();
    let mut name = String::new();

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("----------") {
            request = last_line.clone();
        } else if trimmed.starts_with("Name does not exist.") {
            records.push(dns_record(&request, "NA", "Does Not Exist", DnsRecordType::NotFound));
        } else if let Some(caps) = DNS_FIELD.captures(line) {
            let value = caps[2].trim().to_string();
            let record_type = match &caps[1] {
                "Record Name" => {
                    name = value.clone();
                    None
                }
                "A (Host) Record" => Some(DnsRecordType::Host),
                "SRV Record" => Some(DnsRecordType::Srv),
                _ => Some(DnsRecordType::Ptr),
            };
            if let Some(record_type) = record_type {
                records.push(dns_record(&request, &name, &value, record_type));
            }
        }

        if !trimmed.is_empty() {
            last_line = trimmed.to_string();
        }
    }

    records
}

fn dns_record(request: &str, name: &str, resolution: &str, kind: DnsRecordType) -> NormalizedRecord {
    NormalizedRecord::new(SourceKind::DnsRecord)
        .with_field(DNS_REQUEST, request)
        .with_field(DNS_NAME, name)
        .with_field(DNS_RESOLUTION, resolution)
        .with_field(DNS_TYPE, kind.label())
}

/// RBCmd labels in the order they appear for one recycled file
pub const RBCMD_LABELS: &[&str] = &["Source file", "Version", "File size", "File name", "Deleted on"];

/// Parse RBCmd console output; `Source file:` opens a new entry
pub fn parse_rbcmd(text: &str) -> Vec<NormalizedRecord> {
    let mut records = Vec::new();
    let mut current: Option<NormalizedRecord> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        let Some(label) = RBCMD_LABELS
            .iter()
            .find(|label| trimmed.starts_with(&format!("{}:", label)))
        else {
            continue;
        };
        let value = trimmed[label.len() + 1..].trim();

        if *label == "Source file" {
            if let Some(done) = current.take() {
                records.push(done);
            }
            current = Some(NormalizedRecord::new(SourceKind::RecycledFile).with_field(*label, value));
        } else if let Some(record) = current.take() {
            current = Some(record.with_field(*label, value));
        }
    }

    records.extend(current);
    records
}

pub const AMCACHE_LAST_WRITE: &str = "Last Write";
pub const AMCACHE_NAME: &str = "Name";
pub const AMCACHE_HASH: &str = "Hash";

/// Parse the RegRipper `amcache` plugin report.
///
/// A `LastWrite` line names the entry and a later `Hash:` line completes it.
pub fn parse_amcache(text: &str) -> Vec<NormalizedRecord> {
    let mut records = Vec::new();
    let mut name = String::new();
    let mut last_write = String::new();

    for line in text.lines() {
        if let Some(idx) = line.find("LastWrite").filter(|idx| *idx > 0) {
            name = line[..idx].trim().to_string();
            last_write = line[idx + "LastWrite".len()..]
                .trim_start_matches(':')
                .trim()
                .to_string();
        } else if let Some(hash) = line.strip_prefix("Hash: ") {
            let hash = hash.trim();
            let hash = if !hash.is_empty() && hash.chars().all(|c| c.is_ascii_hexdigit()) {
                hash
            } else {
                "Unknown"
            };
            records.push(
                NormalizedRecord::new(SourceKind::AmCacheEntry)
                    .with_field(AMCACHE_LAST_WRITE, last_write.as_str())
                    .with_field(AMCACHE_NAME, name.as_str())
                    .with_field(AMCACHE_HASH, hash),
            );
            name.clear();
            last_write.clear();
        }
    }

    records
}

pub const NETSTAT_LABELS: &[&str] = &[
    "Prot.",
    "Local IP",
    "Local Port",
    "Remote IP",
    "Remote Port",
    "State",
    "PID",
    "Process",
];

fn split_endpoint(endpoint: &str) -> (String, String) {
    match endpoint.rsplit_once(':') {
        Some((addr, port)) => (addr.to_string(), port.to_string()),
        None => (endpoint.to_string(), String::new()),
    }
}

/// Parse `netstat -abno`.
///
/// TCP lines carry a state, UDP lines do not. Lines after a connection name
/// the owning component and process.
pub fn parse_netstat(text: &str) -> Vec<NormalizedRecord> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut owners: Vec<Vec<String>> = Vec::new();

    for line in text.lines() {
        if NETSTAT_CONN.is_match(line) {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let (state, pid) = match tokens.len() {
                5 => (tokens[3].to_string(), tokens[4].to_string()),
                4 => ("-".to_string(), tokens[3].to_string()),
                _ => continue,
            };
            let (local_ip, local_port) = split_endpoint(tokens[1]);
            let (remote_ip, remote_port) = split_endpoint(tokens[2]);
            rows.push(vec![
                tokens[0].to_string(),
                local_ip,
                local_port,
                remote_ip,
                remote_port,
                state,
                pid,
            ]);
            owners.push(Vec::new());
        } else if let Some(owner) = owners.last_mut() {
            let trimmed = line.trim();
            if !trimmed.is_empty() && !trimmed.starts_with("Proto") {
                owner.push(trimmed.to_string());
            }
        }
    }

    rows.into_iter()
        .zip(owners)
        .map(|(row, owner)| {
            row.into_iter()
                .chain(std::iter::once(owner.join(" ")))
                .zip(NETSTAT_LABELS.iter())
                .fold(NormalizedRecord::new(SourceKind::Connection), |record, (value, label)| {
                    record.with_field(*label, value)
                })
        })
        .collect()
}

pub const TASK_FILE: &str = "File";
pub const TASK_URI_FIELD: &str = "URI";
pub const TASK_COMMAND_FIELD: &str = "Command";

/// One scheduled task definition, XML or `schtasks /v` text
pub fn parse_task_definition(file_name: &str, text: &str) -> NormalizedRecord {
    let mut uri = String::new();
    let mut command = String::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(caps) = TASK_URI.captures(trimmed) {
            uri = caps[1].trim().to_string();
        } else if let Some(caps) = TASK_COMMAND.captures(trimmed) {
            command = caps[1].trim().to_string();
        } else if let Some(value) = trimmed.strip_prefix("TaskName:") {
            uri = value.trim().to_string();
        } else if let Some(value) = trimmed.strip_prefix("Task To Run:") {
            command = value.trim().to_string();
        }
    }

    NormalizedRecord::new(SourceKind::ScheduledTask)
        .with_field(TASK_FILE, file_name)
        .with_field(TASK_URI_FIELD, uri)
        .with_field(TASK_COMMAND_FIELD, command)
}

/// PSInfo `info.dat` lines shown in the endpoint summary
pub const PSINFO_PREFIXES: &[&str] = &[
    "System information ",
    "Uptime:",
    "Kernel version:",
    "Product type:",
    "Product version:",
    "Service pack:",
    "Kernel build number:",
    "Registered organization:",
    "Registered owner:",
];

/// RegRipper system information lines
pub const SYSINFO_PREFIXES: &[&str] = &[
    "ComputerName ",
    "TCP/IP Hostname ",
    "ProductName ",
    "ReleaseID",
    "RegisteredOwner",
    "InstallDate ",
];

/// RegRipper time zone lines
pub const TZ_PREFIXES: &[&str] = &[
    "TimeZoneInformation",
    "ControlSet",
    "  StandardName",
    "  DaylightName",
    "  Bias",
    "  ActiveTimeBias",
    "  TimeZoneKeyName",
];

/// Trimmed lines starting with any of `prefixes`, stopping at `stop`
pub fn pick_lines(text: &str, prefixes: &[&str], stop: Option<&str>) -> Vec<String> {
    let mut picked = Vec::new();
    for line in text.lines() {
        if stop.is_some_and(|stop| line.starts_with(stop)) {
            break;
        }
        if prefixes.iter().any(|prefix| line.starts_with(prefix)) {
            picked.push(line.trim().to_string());
        }
    }
    picked
}
