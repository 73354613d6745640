//! Flat CSV export, one row per finding.

use serde::Serialize;

use crate::export::{ArtifactKind, Exporter, RenderError, RunMetadata};
use crate::model::AuditModel;

#[derive(Serialize)]
struct Row<'a> {
    #[serde(rename = "Segment")]
    segment: String,
    #[serde(rename = "IP")]
    ip: String,
    #[serde(rename = "Port")]
    port: u16,
    #[serde(rename = "Service")]
    service: &'a str,
    #[serde(rename = "Category")]
    category: &'a str,
    #[serde(rename = "Timestamp")]
    timestamp: &'a str,
}

/// Rows are grouped by category in report order, sorted inside each group.
pub struct CsvExporter;

impl Exporter for CsvExporter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Csv
    }

    fn render(&self, model: &AuditModel, meta: &RunMetadata) -> Result<Vec<u8>, RenderError> {
        let timestamp = meta.timestamp();
        let mut writer = ::csv::Writer::from_writer(Vec::new());

        for (category, findings) in model.categories() {
            for finding in findings {
                writer.serialize(Row {
                    segment: finding.segment.to_string(),
                    ip: finding.ip.to_string(),
                    port: finding.port,
                    service: finding.service,
                    category: category.as_str(),
                    timestamp: &timestamp,
                })?;
            }
        }

        // An empty model still gets a header row.
        if model.stats().total_findings == 0 {
            writer.write_record(["Segment", "IP", "Port", "Service", "Category", "Timestamp"])?;
        }

        writer
            .into_inner()
            .map_err(|e| RenderError::Io(e.into_error()))
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
