use colored::*;
use segmentor_common::config::Config;
use segmentor_core::audit::AuditReport;
use segmentor_core::criticality::Criticality;
use segmentor_core::export::{ExportReport, format_duration};
use segmentor_core::knowledge_base::{self, Category};
use segmentor_core::model::{AuditModel, Host, Segment};

use crate::mprint;
use crate::terminal::{colors, print};

pub fn criticality(level: Criticality) -> ColoredString {
    let label = level.label();
    match level {
        Criticality::Critical => label.red().bold(),
        Criticality::High => label.bright_red(),
        Criticality::Medium => label.yellow(),
        Criticality::Low => label.green(),
        Criticality::None => label.dimmed(),
    }
}

fn services(host: &Host) -> String {
    host.ports
        .iter()
        .map(|p| format!("{}({})", p.port, p.service.color(colors::SERVICE)))
        .collect::<Vec<String>>()
        .join(", ")
}

fn segment_line(segment: &Segment) -> String {
    format!(
        "{} ({} hosts activos, {})",
        segment.network.to_string().color(colors::PRIMARY).bold(),
        segment.host_count().to_string().color(colors::ACCENT),
        criticality(segment.criticality())
    )
}

pub fn print_segments(model: &AuditModel, cfg: &Config) {
    print::header("segmentos activos", cfg.quiet);

    for segment in model.segments() {
        if cfg.simple || cfg.quiet > 1 {
            print::print_status(segment_line(segment));
            continue;
        }

        print(&segment_line(segment));
        for (idx, host) in segment.hosts.iter().enumerate() {
            let branch = if idx + 1 == segment.hosts.len() { "└──" } else { "├──" };
            print(&format!(
                "  {} {} [{}]",
                branch.color(colors::SEPARATOR),
                format!("{:<15}", host.ip.to_string()).color(colors::IPV4_ADDR),
                services(host)
            ));
        }
        mprint!();
    }
}

pub fn print_categories(model: &AuditModel, cfg: &Config) {
    if cfg.quiet > 1 {
        return;
    }
    print::header("servicios por categoría", cfg.quiet);

    for (category, findings) in model.categories() {
        if findings.is_empty() {
            continue;
        }
        print(&format!(
            "[{}] ({} servicios encontrados)",
            category.as_str().color(colors::PRIMARY).bold(),
            findings.len().to_string().color(colors::ACCENT)
        ));
        if cfg.simple {
            continue;
        }
        for f in findings {
            print(&format!(
                "  {} {}:{} ({}) - {}",
                "├──".color(colors::SEPARATOR),
                f.ip.to_string().color(colors::IPV4_ADDR),
                f.port,
                f.service.color(colors::SERVICE),
                f.segment
            ));
        }
    }
}

pub fn print_artifacts(exports: &ExportReport, cfg: &Config) {
    print::header("artefactos", cfg.quiet);

    for (kind, path) in &exports.written {
        print::print_status(format!("{} {}", kind.to_string().color(colors::PRIMARY), path.display()));
    }
    for failure in &exports.failed {
        print::print_status(format!("{} {}", "FAILED".red().bold(), failure));
    }
}

pub fn print_summary(report: &AuditReport, cfg: &Config) {
    let stats = report.model.stats();
    let keys = [
        "Segmentos escaneados",
        "Segmentos activos",
        "Hosts activos",
        "Servicios expuestos",
        "Tasa de actividad",
        "Duración",
    ];

    if cfg.quiet == 0 {
        print::fat_separator();
        print::set_key_width(&keys);
        print::aligned_line(keys[0], stats.total_segments_scanned.to_string());
        print::aligned_line(keys[1], stats.active_segments.to_string().green().bold());
        print::aligned_line(keys[2], stats.active_hosts.to_string().green().bold());
        print::aligned_line(keys[3], stats.total_findings.to_string());
        print::aligned_line(keys[4], format!("{:.2}%", stats.activity_percent()));
        print::aligned_line(keys[5], format_duration(report.meta.total_duration()));
    }

    let line = format!(
        "Audit complete: {} active hosts in {} of {} segments",
        stats.active_hosts.to_string().green().bold(),
        stats.active_segments.to_string().green().bold(),
        stats.total_segments_scanned
    );
    if report.exports.is_partial() {
        tracing::warn!("{line} (some artifacts could not be written)");
    } else if cfg.quiet == 0 {
        print::fat_separator();
        print::centerln(&line);
        print::end_of_program();
    } else {
        segmentor_common::success!("{line}");
    }
}

/// Prints the port knowledge base grouped by category.
pub fn print_port_table(cfg: &Config) {
    for category in Category::ALL {
        let ports: Vec<String> = knowledge_base::PORTS
            .iter()
            .filter(|info| info.category == category)
            .map(|info| format!("{}({})", info.port, info.service.color(colors::SERVICE)))
            .collect();
        if ports.is_empty() {
            continue;
        }
        print::header(category.as_str(), cfg.quiet);
        print(&format!("  {}", ports.join(", ")));
    }
    if cfg.quiet > 0 {
        print(&knowledge_base::target_ports());
    }
}

fn print(msg: &str) {
    print::print(msg);
}
