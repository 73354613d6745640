//! Structured JSON export.
//!
//! ```json
//! {
//!   "auditInfo": { "timestamp": "...", "durationSeconds": 300, ... },
//!   "segments": [ { "network": "10.0.0.0/24", "hosts": [ { "ip": "...", "openPorts": [...] } ] } ],
//!   "serviceCategories": [ { "category": "WEB", "count": 3 } ]
//! }
//! ```

use std::net::Ipv4Addr;

use serde::Serialize;

use crate::criticality::Criticality;
use crate::export::{ArtifactKind, Exporter, RenderError, RunMetadata, TOOL_NAME};
use crate::finding::SegmentKey;
use crate::knowledge_base::Category;
use crate::model::{AuditModel, Host, OpenPort, Segment};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AuditInfo {
    pub timestamp: String,
    pub end_time: String,
    pub duration_seconds: u64,
    pub total_duration_seconds: u64,
    pub total_segments_scanned: usize,
    pub active_segments: usize,
    pub active_hosts: usize,
    pub total_findings: usize,
    /// Percent of scanned segments with at least one host.
    pub activity_rate: f64,
    pub tool: &'static str,
}

impl AuditInfo {
    pub(crate) fn new(model: &AuditModel, meta: &RunMetadata) -> Self {
        let stats = model.stats();
        Self {
            timestamp: meta.timestamp(),
            end_time: meta
                .finished_at
                .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            duration_seconds: meta.scan_duration.as_secs(),
            total_duration_seconds: meta.total_duration().as_secs(),
            total_segments_scanned: stats.total_segments_scanned,
            active_segments: stats.active_segments,
            active_hosts: stats.active_hosts,
            total_findings: stats.total_findings,
            activity_rate: stats.activity_percent(),
            tool: TOOL_NAME,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonPort {
    port: u16,
    service: &'static str,
    category: Category,
}

impl From<&OpenPort> for JsonPort {
    fn from(p: &OpenPort) -> Self {
        Self {
            port: p.port,
            service: p.service,
            category: p.category,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonHost {
    ip: Ipv4Addr,
    open_ports: Vec<JsonPort>,
}

impl From<&Host> for JsonHost {
    fn from(host: &Host) -> Self {
        Self {
            ip: host.ip,
            open_ports: host.ports.iter().map(JsonPort::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonSegment {
    network: SegmentKey,
    host_count: usize,
    criticality: Criticality,
    hosts: Vec<JsonHost>,
}

impl From<&Segment> for JsonSegment {
    fn from(segment: &Segment) -> Self {
        Self {
            network: segment.network,
            host_count: segment.host_count(),
            criticality: segment.criticality(),
            hosts: segment.hosts.iter().map(JsonHost::from).collect(),
        }
    }
}

#[derive(Serialize)]
struct CategoryCount {
    category: Category,
    count: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport {
    audit_info: AuditInfo,
    segments: Vec<JsonSegment>,
    service_categories: Vec<CategoryCount>,
}

pub struct JsonExporter;

impl Exporter for JsonExporter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Json
    }

    fn render(&self, model: &AuditModel, meta: &RunMetadata) -> Result<Vec<u8>, RenderError> {
        let report = JsonReport {
            audit_info: AuditInfo::new(model, meta),
            segments: model.segments().iter().map(JsonSegment::from).collect(),
            service_categories: model
                .stats()
                .category_counts
                .iter()
                .map(|(category, count)| CategoryCount {
                    category: *category,
                    count: *count,
                })
                .collect(),
        };

        let mut bytes = serde_json::to_vec_pretty(&report)?;
        bytes.push(b'\n');
        Ok(bytes)
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
