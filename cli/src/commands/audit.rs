use std::sync::Arc;

use anyhow::Context;
use segmentor_common::config::Config;
use segmentor_core::audit::{AuditOutcome, Auditor, ExitStatus};
use segmentor_core::error::AuditError;
use segmentor_core::knowledge_base;
use segmentor_core::scanner::NmapRunner;
use tracing::Instrument;

use crate::commands::AuditArgs;
use crate::output::DirectorySink;
use crate::terminal::{format, print, spinner};

/// Attaches the failed stage to a fatal audit error.
pub fn with_stage(err: AuditError) -> anyhow::Error {
    let stage = err.stage();
    anyhow::Error::new(err).context(format!("audit failed during {stage}"))
}

pub async fn audit(args: &AuditArgs, cfg: &Config) -> anyhow::Result<ExitStatus> {
    print::header("planning audit", cfg.quiet);

    let span = spinner::audit_span(!cfg.no_interactive);
    let mut auditor = Auditor::new(cfg);
    let plan = auditor.plan(args.file.as_deref()).map_err(with_stage)?;

    let keys = ["Segments", "Ranges", "Ports", "Profile", "Jobs", "Timeout"];
    print::set_key_width(&keys);
    if cfg.quiet == 0 {
        print::aligned_line(keys[0], plan.total_segments.to_string());
        print::aligned_line(keys[1], plan.targets.len().to_string());
        print::aligned_line(keys[2], knowledge_base::target_ports());
        print::aligned_line(keys[3], cfg.profile.to_string());
        print::aligned_line(keys[4], cfg.jobs.to_string());
        print::aligned_line(keys[5], format!("{}s", cfg.scan_timeout.as_secs()));
    }

    let work_dir = tempfile::Builder::new()
        .prefix("segmentor-")
        .tempdir()
        .map_err(AuditError::WorkDir)
        .map_err(with_stage)?;

    let runner = Arc::new(NmapRunner::default());
    let mut sink = DirectorySink::new(&cfg.output_dir);
    let mut auditor = auditor.on_stage(spinner::stage_reporter(span.clone(), plan.total_segments));

    print::header("scanning", cfg.quiet);
    let outcome = auditor
        .run(&plan, runner, work_dir.path(), &mut sink)
        .instrument(span)
        .await
        .map_err(with_stage)?;

    work_dir
        .close()
        .context("scanner work directory could not be removed")?;

    Ok(present(outcome, cfg))
}

/// Prints the outcome of a run and maps it to its exit status.
pub fn present(outcome: AuditOutcome, cfg: &Config) -> ExitStatus {
    let status = outcome.exit_status();

    match outcome {
        AuditOutcome::Empty => {
            print::header("zero active segments", cfg.quiet);
            print::no_results();
        }
        AuditOutcome::Completed(report) => {
            format::print_segments(&report.model, cfg);
            format::print_categories(&report.model, cfg);
            format::print_artifacts(&report.exports, cfg);
            format::print_summary(&report, cfg);
        }
    }

    status
}
