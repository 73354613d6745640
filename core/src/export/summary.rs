//! Plain text summary, always written at the end of a successful audit.

use std::fmt::{self, Write};

use crate::export::{ArtifactKind, Exporter, RenderError, RunMetadata, TOOL_NAME, format_duration};
use crate::model::AuditModel;

const RULE_WIDTH: usize = 60;

pub struct SummaryExporter;

impl Exporter for SummaryExporter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Summary
    }

    fn render(&self, model: &AuditModel, meta: &RunMetadata) -> Result<Vec<u8>, RenderError> {
        Ok(render_summary(model, meta)?.into_bytes())
    }
}

fn render_summary(model: &AuditModel, meta: &RunMetadata) -> Result<String, fmt::Error> {
    let stats = model.stats();
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    writeln!(out, "{rule}")?;
    writeln!(out, "RESUMEN DE AUDITORÍA DE SEGMENTACIÓN")?;
    writeln!(out, "{rule}")?;
    writeln!(out, "Herramienta:           {TOOL_NAME}")?;
    writeln!(out, "Inicio:                {}", meta.display_time())?;
    writeln!(out, "Duración del escaneo:  {}", format_duration(meta.scan_duration))?;
    writeln!(out, "Duración total:        {}", format_duration(meta.total_duration()))?;
    writeln!(out, "Segmentos escaneados:  {}", stats.total_segments_scanned)?;
    writeln!(out, "Segmentos activos:     {}", stats.active_segments)?;
    writeln!(out, "Hosts activos:         {}", stats.active_hosts)?;
    writeln!(out, "Servicios expuestos:   {}", stats.total_findings)?;
    writeln!(out, "Tasa de actividad:     {:.2}%", stats.activity_percent())?;
    writeln!(out)?;

    writeln!(out, "SEGMENTOS ACTIVOS")?;
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
    for segment in model.segments() {
        writeln!(
            out,
            "{} ({} hosts activos, {})",
            segment.network,
            segment.host_count(),
            segment.criticality()
        )?;
        for host in &segment.hosts {
            let services = host
                .ports
                .iter()
                .map(|p| format!("{}({})", p.port, p.service))
                .collect::<Vec<String>>()
                .join(", ");
            writeln!(out, "  ├── {:<15} [{services}]", host.ip.to_string())?;
        }
    }
    writeln!(out)?;

    writeln!(out, "SERVICIOS POR CATEGORÍA")?;
    writeln!(out, "{}", "-".repeat(RULE_WIDTH))?;
    for (category, count) in &stats.category_counts {
        if *count > 0 {
            writeln!(out, "{:<18} {count}", category.as_str())?;
        }
    }
    writeln!(out, "{rule}")?;

    Ok(out)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
