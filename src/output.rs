//! Output formatting for one-shot feed checks.

use std::collections::BTreeSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::lines::LineId;

/// Result of a single fetch-and-parse, as printed by `check`.
#[derive(Debug, Serialize)]
pub struct CheckReport<'a> {
    pub checked_at: DateTime<Utc>,
    pub source: &'a str,
    pub delayed: &'a BTreeSet<LineId>,
}

/// Renders the delayed lines as one comma-separated line of text.
pub fn format_delayed(delayed: &BTreeSet<LineId>) -> String {
    if delayed.is_empty() {
        return "No lines delayed".to_string();
    }
    let codes: Vec<&str> = delayed.iter().map(LineId::as_str).collect();
    format!("Delayed: {}", codes.join(", "))
}

/// Logs the report as text, or prints it as pretty JSON on stdout.
pub fn print_report(report: &CheckReport<'_>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        info!(source = report.source, delayed = report.delayed.len(), "{}", format_delayed(report.delayed));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lines::LineCatalog;

    #[test]
    fn test_format_delayed() {
        let catalog = LineCatalog::default();
        let delayed: BTreeSet<LineId> = ["Q", "2", "SIR"].iter().map(|c| catalog.resolve(c).unwrap()).collect();
        assert_eq!(format_delayed(&delayed), "Delayed: 2, Q, SI");
        assert_eq!(format_delayed(&BTreeSet::new()), "No lines delayed");
    }

    #[test]
    fn test_report_serializes_codes() {
        let catalog = LineCatalog::default();
        let delayed: BTreeSet<LineId> = [catalog.resolve("a").unwrap()].into_iter().collect();
        let report = CheckReport {
            checked_at: Utc::now(),
            source: "status.xml",
            delayed: &delayed,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["delayed"], serde_json::json!(["A"]));
        assert_eq!(json["source"], "status.xml");
    }
}
