//! Markdown audit report, written for the people who read audits.

use crate::export::{ArtifactKind, Exporter, RenderError, RunMetadata, TOOL_NAME, format_duration};
use crate::model::{AuditModel, Host};

pub struct MarkdownExporter;

impl Exporter for MarkdownExporter {
    fn kind(&self) -> ArtifactKind {
        ArtifactKind::Markdown
    }

    fn render(&self, model: &AuditModel, meta: &RunMetadata) -> Result<Vec<u8>, RenderError> {
        Ok(render_report(model, meta).into_bytes())
    }
}

fn ports_cell(host: &Host) -> String {
    host.ports
        .iter()
        .map(|p| p.port.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

fn services_cell(host: &Host) -> String {
    host.ports
        .iter()
        .map(|p| format!("{}({})", p.port, p.service))
        .collect::<Vec<String>>()
        .join(", ")
}

fn render_report(model: &AuditModel, meta: &RunMetadata) -> String {
    let stats = model.stats();
    let mut md = String::new();

    md.push_str("# Reporte de Auditoría de Segmentación de Red\n\n");
    md.push_str(&format!("**Fecha:** {}  \n", meta.display_time()));
    md.push_str(&format!(
        "**Duración del escaneo:** {}  \n",
        format_duration(meta.scan_duration)
    ));
    md.push_str(&format!(
        "**Duración total:** {}  \n",
        format_duration(meta.total_duration())
    ));
    md.push_str(&format!("**Herramienta:** {TOOL_NAME}\n\n"));

    md.push_str("## Resumen Ejecutivo\n\n");
    md.push_str("| Métrica | Valor |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Segmentos escaneados | {} |\n", stats.total_segments_scanned));
    md.push_str(&format!("| Segmentos activos | {} |\n", stats.active_segments));
    md.push_str(&format!("| Hosts activos | {} |\n", stats.active_hosts));
    md.push_str(&format!("| Servicios expuestos | {} |\n", stats.total_findings));
    md.push_str(&format!("| Tasa de actividad | {:.2}% |\n\n", stats.activity_percent()));

    md.push_str("## Detalles por Segmento\n\n");
    if model.is_empty() {
        md.push_str("_No se encontraron hosts con servicios críticos expuestos._\n\n");
    }
    for segment in model.segments() {
        md.push_str(&format!(
            "### {} ({} hosts, criticidad {})\n\n",
            segment.network,
            segment.host_count(),
            segment.criticality()
        ));
        md.push_str("| IP | Puertos Abiertos | Servicios |\n");
        md.push_str("|----|------------------|-----------|\n");
        for host in &segment.hosts {
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                host.ip,
                ports_cell(host),
                services_cell(host)
            ));
        }
        md.push('\n');
    }

    md.push_str("## Análisis por Categoría de Servicios\n\n");
    for (category, findings) in model.categories() {
        if findings.is_empty() {
            continue;
        }
        md.push_str(&format!("### {category} ({} servicios)\n\n", findings.len()));
        md.push_str("| IP | Puerto | Servicio | Segmento |\n");
        md.push_str("|----|--------|----------|----------|\n");
        for f in findings {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                f.ip, f.port, f.service, f.segment
            ));
        }
        md.push('\n');
    }

    md
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
