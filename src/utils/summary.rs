use serde_json::json;
use uuid::Uuid;
use anyhow::{Result, Context};

use crate::accumulator::{FinalizedIndicators, IndicatorKind};
use crate::locator::MftBackend;
use crate::matcher::IndicatorMatcher;
use crate::report::ReportSection;

/// Everything the run summary reports besides host and time
pub struct RunTotals<'a> {
    pub collection_name: &'a str,
    pub report_path: &'a str,
    pub report_sha256: Option<&'a str>,
    pub mft_backend: Option<MftBackend>,
    pub sections: &'a [ReportSection],
    pub matcher: &'a IndicatorMatcher,
    pub indicators: &'a [(IndicatorKind, FinalizedIndicators)],
}

/// Create the JSON run summary written next to the report.
///
/// The summary records which sections produced data, how often each IOC
/// matched and how many indicators were gathered, so a batch of reports can
/// be triaged without opening each one.
///
/// # Example Output
///
/// ```json
/// {
///   "run_id": "550e8400-e29b-41d4-a716-446655440000",
///   "hostname": "analysis-01",
///   "run_time": "2024-01-15T14:30:52Z",
///   "collection": "HOST1",
///   "sections": [{"anchor": "SysInfo", "state": "EnabledWithData", ...}],
///   "iocs": [{"pattern": "evil.exe", "hits": 3}],
///   "indicators": {"ip": {"unique": 12, "duplicates": 40}, ...}
/// }
/// ```
pub fn create_run_summary(hostname: &str, timestamp: &str, totals: &RunTotals<'_>) -> Result<String> {
    let iocs: Vec<_> = totals
        .matcher
        .entries()
        .iter()
        .map(|entry| json!({ "pattern": entry.pattern, "hits": entry.hits }))
        .collect();

    let mut indicators = serde_json::Map::new();
    for (kind, finalized) in totals.indicators {
        indicators.insert(
            kind_key(*kind).to_string(),
            json!({
                "unique": finalized.unique_count(),
                "duplicates": finalized.total_duplicates,
            }),
        );
    }

    let summary = json!({
        "run_id": Uuid::new_v4().to_string(),
        "hostname": hostname,
        "run_time": timestamp,
        "report_version": env!("CARGO_PKG_VERSION"),
        "collection": totals.collection_name,
        "report": totals.report_path,
        "report_sha256": totals.report_sha256,
        "mft_backend": totals.mft_backend.map(|backend| backend.as_str()),
        "sections": totals.sections,
        "iocs": iocs,
        "total_ioc_hits": totals.matcher.total_hits(),
        "indicators": indicators,
    });

    serde_json::to_string_pretty(&summary).context("Failed to serialize run summary")
}

fn kind_key(kind: IndicatorKind) -> &'static str {
    match kind {
        IndicatorKind::Ip => "ip",
        IndicatorKind::Domain => "domain",
        IndicatorKind::Hash => "hash",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::SectionState;

    #[test]
    fn test_summary_fields() {
        let mut matcher = IndicatorMatcher::new(&["evil".to_string()]);
        matcher.tag_text("EVIL.exe");
        let sections = vec![ReportSection {
            title: "Successful RDP Logins".to_string(),
            anchor: "RDP".to_string(),
            state: SectionState::EnabledWithData,
            count: 4,
        }];
        let indicators = vec![(
            IndicatorKind::Ip,
            FinalizedIndicators {
                values: vec![("8.8.8.8".to_string(), 1)],
                total_duplicates: 2,
            },
        )];
        let totals = RunTotals {
            collection_name: "HOST1",
            report_path: "/cases/HOST1/TriageReport/HOST1.htm",
            report_sha256: Some("abc"),
            mft_backend: Some(MftBackend::MftECmd),
            sections: &sections,
            matcher: &matcher,
            indicators: &indicators,
        };

        let text = create_run_summary("analysis-01", "2024-01-15T14:30:52Z", &totals).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["hostname"], "analysis-01");
        assert_eq!(value["collection"], "HOST1");
        assert_eq!(value["mft_backend"], "MFTECmd");
        assert_eq!(value["sections"][0]["state"], "EnabledWithData");
        assert_eq!(value["sections"][0]["count"], 4);
        assert_eq!(value["iocs"][0]["hits"], 1);
        assert_eq!(value["total_ioc_hits"], 1);
        assert_eq!(value["indicators"]["ip"]["unique"], 1);
        assert_eq!(value["indicators"]["ip"]["duplicates"], 2);
        assert!(Uuid::parse_str(value["run_id"].as_str().unwrap()).is_ok());
    }
}
