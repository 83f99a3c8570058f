//! Report exporters
//!
//! Each reporting cycle produces exactly one line on the output.
//! Provides the plain text format and a JSON-lines format.

use crate::{
    error::MonitorError,
    types::{Snapshot, UserCounterEntry},
};
use serde::Serialize;
use std::io::Write;

/// Trait for report exporters
pub trait ReportExporter {
    /// Write one report line for `snapshot`, including the trailing newline
    fn export(&self, snapshot: &Snapshot, out: &mut dyn Write) -> Result<(), MonitorError>;
}

/// Export format type
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ExporterType {
    /// `ID <uid>: <count>` segments joined by ", "
    Text,
    /// One JSON object per line
    Json,
}

impl ExporterType {
    /// Build the exporter for this format
    pub fn exporter(self) -> Box<dyn ReportExporter + Send> {
        match self {
            ExporterType::Text => Box::new(TextExporter),
            ExporterType::Json => Box::new(JsonExporter),
        }
    }
}

/// Plain text exporter
///
/// `ID 200: 1, ID 500: 1`; an empty snapshot yields an empty line.
pub struct TextExporter;

impl ReportExporter for TextExporter {
    fn export(&self, snapshot: &Snapshot, out: &mut dyn Write) -> Result<(), MonitorError> {
        writeln!(out, "{}", format_report(snapshot.entries()))?;
        Ok(())
    }
}

/// Render entries in the order given
pub fn format_report(entries: &[UserCounterEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("ID {}: {}", e.uid, e.count))
        .collect::<Vec<_>>()
        .join(", ")
}

/// JSON-lines exporter
pub struct JsonExporter;

#[derive(Serialize)]
struct JsonReport<'a> {
    /// RFC 3339 timestamp of the map read
    timestamp: String,
    /// Sum of all counts
    total: u64,
    /// Entries in ascending uid order
    users: &'a [UserCounterEntry],
}

impl ReportExporter for JsonExporter {
    fn export(&self, snapshot: &Snapshot, out: &mut dyn Write) -> Result<(), MonitorError> {
        let report = JsonReport {
            timestamp: snapshot.taken_at().to_rfc3339(),
            total: snapshot.total(),
            users: snapshot.entries(),
        };

        let line = serde_json::to_string(&report).map_err(std::io::Error::from)?;
        writeln!(out, "{}", line)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn create_test_snapshot() -> Snapshot {
        Snapshot::at(
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            vec![UserCounterEntry::new(500, 1), UserCounterEntry::new(200, 1)],
        )
    }

    fn render(exporter: &dyn ReportExporter, snapshot: &Snapshot) -> String {
        let mut out = Vec::new();
        exporter.export(snapshot, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_text_format() {
        let text = render(&TextExporter, &create_test_snapshot());
        assert_eq!(text, "ID 200: 1, ID 500: 1\n");
    }

    #[test]
    fn test_text_single_user() {
        let snapshot = Snapshot::from_entries(vec![UserCounterEntry::new(1000, 3)]);
        assert_eq!(render(&TextExporter, &snapshot), "ID 1000: 3\n");
    }

    #[test]
    fn test_text_empty_line() {
        let snapshot = Snapshot::from_entries(Vec::new());
        assert_eq!(render(&TextExporter, &snapshot), "\n");
    }

    #[test]
    fn test_json_format() {
        let json = render(&JsonExporter, &create_test_snapshot());
        assert!(json.ends_with('\n'));
        assert_eq!(json.lines().count(), 1);

        let value: serde_json::Value = serde_json::from_str(json.trim_end()).unwrap();
        assert_eq!(value["timestamp"], "2025-01-01T00:00:00+00:00");
        assert_eq!(value["total"], 2);
        assert_eq!(value["users"][0]["uid"], 200);
        assert_eq!(value["users"][1]["uid"], 500);
        assert_eq!(value["users"][1]["count"], 1);
    }

    #[test]
    fn test_json_empty() {
        let snapshot = Snapshot::from_entries(Vec::new());
        let json = render(&JsonExporter, &snapshot);

        let value: serde_json::Value = serde_json::from_str(json.trim_end()).unwrap();
        assert_eq!(value["total"], 0);
        assert_eq!(value["users"].as_array().map(Vec::len), Some(0));
    }

    #[test]
    fn test_exporter_type_dispatch() {
        let snapshot = create_test_snapshot();
        let text = render(ExporterType::Text.exporter().as_ref(), &snapshot);
        let json = render(ExporterType::Json.exporter().as_ref(), &snapshot);

        assert!(text.starts_with("ID 200"));
        assert!(json.starts_with('{'));
    }
}
