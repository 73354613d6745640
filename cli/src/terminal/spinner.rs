use colored::*;
use indicatif::ProgressStyle;
use segmentor_core::audit::AuditStage;
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

const TICKS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
];

/// Span that owns the audit spinner. Without a terminal it is a plain span.
pub fn audit_span(interactive: bool) -> Span {
    if !interactive {
        return info_span!("audit");
    }

    let span = info_span!("audit", indicatif.pb_show = true);
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg} {elapsed:.dim}") {
        span.pb_set_style(&style.tick_strings(TICKS));
    }
    span.pb_set_message("Preparing audit...");
    span
}

fn stage_message(stage: AuditStage, segments: usize) -> Option<String> {
    let msg = match stage {
        AuditStage::ScanRunning => format!(
            "Sweeping {} for critical services...",
            format!("{segments} segments").green().bold()
        ),
        AuditStage::ScanDone => "Scan complete, collecting results...".to_string(),
        AuditStage::Parsing => "Parsing scanner output...".to_string(),
        AuditStage::ModelReady => "Building segment model...".to_string(),
        AuditStage::Exporting => "Writing reports...".to_string(),
        _ => return None,
    };
    Some(msg)
}

/// Stage callback that mirrors progress on the spinner.
pub fn stage_reporter(span: Span, segments: usize) -> impl Fn(AuditStage) + Send + Sync + 'static {
    move |stage| {
        if let Some(msg) = stage_message(stage, segments) {
            span.pb_set_message(&msg);
        }
    }
}
