//! Renders a frozen [`AuditModel`] into the audit's output artifacts.
//!
//! Each [`Exporter`] is a pure function of the model and the run metadata.
//! Exporters share no state, so one failing never affects the others:
//! [`export_all`] records the failure and moves on.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use segmentor_common::config::ExportSelection;
use thiserror::Error;
use tracing::{debug, error};

use crate::model::AuditModel;

pub mod csv;
pub mod dashboard;
pub mod json;
pub mod markdown;
pub mod summary;

pub use self::csv::CsvExporter;
pub use self::dashboard::DashboardExporter;
pub use self::json::JsonExporter;
pub use self::markdown::MarkdownExporter;
pub use self::summary::SummaryExporter;

pub const TOOL_NAME: &str = concat!("Segmentor v", env!("CARGO_PKG_VERSION"));

/// Facts about the run that are not part of the model itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMetadata {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Time spent inside the external scanner.
    pub scan_duration: Duration,
}

impl RunMetadata {
    pub fn new(started_at: DateTime<Utc>, finished_at: DateTime<Utc>, scan_duration: Duration) -> Self {
        Self {
            started_at,
            finished_at,
            scan_duration,
        }
    }

    pub fn total_duration(&self) -> Duration {
        (self.finished_at - self.started_at).to_std().unwrap_or_default()
    }

    /// RFC 3339 start time, second precision.
    pub fn timestamp(&self) -> String {
        self.started_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Human readable start time.
    pub fn display_time(&self) -> String {
        self.started_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    }

    /// Stamp used in artifact file names.
    pub fn file_stamp(&self) -> String {
        self.started_at.format("%Y%m%d_%H%M%S").to_string()
    }
}

/// Formats a duration as `1h 2m 3s`, `2m 3s` or `3s`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Csv,
    Json,
    Markdown,
    Dashboard,
    Summary,
}

impl ArtifactKind {
    pub fn file_name(&self, stamp: &str) -> String {
        match self {
            ArtifactKind::Csv => format!("audit_results_{stamp}.csv"),
            ArtifactKind::Json => format!("audit_results_{stamp}.json"),
            ArtifactKind::Markdown => format!("audit_report_{stamp}.md"),
            ArtifactKind::Dashboard => format!("audit_dashboard_{stamp}.html"),
            ArtifactKind::Summary => format!("audit_summary_{stamp}.txt"),
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ArtifactKind::Csv => "CSV export",
            ArtifactKind::Json => "JSON export",
            ArtifactKind::Markdown => "Markdown report",
            ArtifactKind::Dashboard => "HTML dashboard",
            ArtifactKind::Summary => "text summary",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Csv(#[from] ::csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Format(#[from] std::fmt::Error),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{kind} could not be rendered: {source}")]
    Render {
        kind: ArtifactKind,
        #[source]
        source: RenderError,
    },

    #[error("{kind} could not be written: {source}")]
    Write {
        kind: ArtifactKind,
        #[source]
        source: io::Error,
    },
}

impl ExportError {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            ExportError::Render { kind, .. } | ExportError::Write { kind, .. } => *kind,
        }
    }
}

pub trait Exporter {
    fn kind(&self) -> ArtifactKind;

    fn render(&self, model: &AuditModel, meta: &RunMetadata) -> Result<Vec<u8>, RenderError>;
}

/// Destination for rendered artifacts.
pub trait ArtifactSink {
    /// Stores `bytes` under `name` and returns where they ended up.
    fn write(&mut self, name: &str, bytes: &[u8]) -> io::Result<PathBuf>;
}

/// Outcome of one export pass.
#[derive(Debug, Default)]
pub struct ExportReport {
    pub written: Vec<(ArtifactKind, PathBuf)>,
    pub failed: Vec<ExportError>,
}

impl ExportReport {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn path_of(&self, kind: ArtifactKind) -> Option<&PathBuf> {
        self.written.iter().find(|(k, _)| *k == kind).map(|(_, p)| p)
    }

    pub fn merge(&mut self, other: ExportReport) {
        self.written.extend(other.written);
        self.failed.extend(other.failed);
    }
}

/// Exporters for the selected formats, dashboard last.
pub fn exporters_for(selection: ExportSelection, dashboard: bool) -> Vec<Box<dyn Exporter>> {
    let mut exporters: Vec<Box<dyn Exporter>> = Vec::new();
    if selection.csv() {
        exporters.push(Box::new(CsvExporter));
    }
    if selection.json() {
        exporters.push(Box::new(JsonExporter));
    }
    if selection.markdown() {
        exporters.push(Box::new(MarkdownExporter));
    }
    if dashboard {
        exporters.push(Box::new(DashboardExporter));
    }
    exporters
}

/// Renders and writes one artifact.
pub fn export_one(
    exporter: &dyn Exporter,
    model: &AuditModel,
    meta: &RunMetadata,
    sink: &mut dyn ArtifactSink,
) -> Result<PathBuf, ExportError> {
    let kind = exporter.kind();
    let bytes = exporter
        .render(model, meta)
        .map_err(|source| ExportError::Render { kind, source })?;
    let name = kind.file_name(&meta.file_stamp());
    let path = sink
        .write(&name, &bytes)
        .map_err(|source| ExportError::Write { kind, source })?;
    debug!("{kind} written to {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

/// Runs every exporter. A failure is recorded and the remaining exporters still run.
pub fn export_all(
    exporters: &[Box<dyn Exporter>],
    model: &AuditModel,
    meta: &RunMetadata,
    sink: &mut dyn ArtifactSink,
) -> ExportReport {
    let mut report = ExportReport::default();

    for exporter in exporters {
        match export_one(exporter.as_ref(), model, meta, sink) {
            Ok(path) => report.written.push((exporter.kind(), path)),
            Err(e) => {
                error!("{e}");
                report.failed.push(e);
            }
        }
    }

    report
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
