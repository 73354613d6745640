//! # Audit Orchestrator
//!
//! Drives one audit run through its stages:
//!
//! ```text
//! INIT -> RANGES_READY -> SCAN_RUNNING -> SCAN_DONE -> PARSING
//!      -> (EMPTY | MODEL_READY -> EXPORTING -> SUMMARY_WRITTEN) -> DONE
//! ```
//!
//! `FAILED` is reachable from `INIT` (bad range file), `SCAN_RUNNING` (scanner
//! missing, failing or timing out) and `PARSING` (artifact unreadable). Fatal
//! failures happen before any artifact is written. Once the model is ready,
//! exporters run independently and a failing one only marks the run as
//! partial.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use segmentor_common::config::Config;
use segmentor_common::network::target::{self, RangePlan};
use tracing::{debug, error, info, warn};

use crate::error::AuditError;
use crate::export::{
    ArtifactKind, ArtifactSink, ExportReport, RunMetadata, SummaryExporter, export_all, export_one,
    exporters_for,
};
use crate::finding::Finding;
use crate::knowledge_base;
use crate::model::AuditModel;
use crate::parser::{PreferredSource, ScanResultSource};
use crate::scanner::{ScanRunner, Sweep};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditStage {
    Init,
    RangesReady,
    ScanRunning,
    ScanDone,
    Parsing,
    Empty,
    ModelReady,
    Exporting,
    SummaryWritten,
    Done,
    Failed,
}

impl fmt::Display for AuditStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuditStage::Init => "INIT",
            AuditStage::RangesReady => "RANGES_READY",
            AuditStage::ScanRunning => "SCAN_RUNNING",
            AuditStage::ScanDone => "SCAN_DONE",
            AuditStage::Parsing => "PARSING",
            AuditStage::Empty => "EMPTY",
            AuditStage::ModelReady => "MODEL_READY",
            AuditStage::Exporting => "EXPORTING",
            AuditStage::SummaryWritten => "SUMMARY_WRITTEN",
            AuditStage::Done => "DONE",
            AuditStage::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Process exit status for each terminal outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
    Empty,
    Partial,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
            ExitStatus::Empty => 2,
            ExitStatus::Partial => 3,
        }
    }
}

#[derive(Debug)]
pub struct AuditReport {
    pub model: AuditModel,
    pub meta: RunMetadata,
    pub exports: ExportReport,
}

#[derive(Debug)]
pub enum AuditOutcome {
    Completed(AuditReport),
    /// The scan finished but found no open critical port. Nothing was exported.
    Empty,
}

impl AuditOutcome {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            AuditOutcome::Completed(report) if report.exports.is_partial() => ExitStatus::Partial,
            AuditOutcome::Completed(_) => ExitStatus::Success,
            AuditOutcome::Empty => ExitStatus::Empty,
        }
    }
}

type StageCallback<'a> = Box<dyn Fn(AuditStage) + Send + Sync + 'a>;

pub struct Auditor<'a> {
    config: &'a Config,
    stage: AuditStage,
    on_stage: Option<StageCallback<'a>>,
}

impl<'a> Auditor<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            stage: AuditStage::Init,
            on_stage: None,
        }
    }

    /// Registers a callback invoked on every stage transition.
    pub fn on_stage(mut self, callback: impl Fn(AuditStage) + Send + Sync + 'a) -> Self {
        self.on_stage = Some(Box::new(callback));
        self
    }

    pub fn stage(&self) -> AuditStage {
        self.stage
    }

    fn enter(&mut self, next: AuditStage) {
        debug!("Audit stage {} -> {}", self.stage, next);
        self.stage = next;
        if let Some(callback) = &self.on_stage {
            callback(next);
        }
    }

    fn fail(&mut self, err: impl Into<AuditError>) -> AuditError {
        let err = err.into();
        debug!("Audit failed during {}: {err}", err.stage());
        self.enter(AuditStage::Failed);
        err
    }

    /// Resolves the ranges to audit: a custom file, or the default RFC 1918 plan.
    pub fn plan(&mut self, range_file: Option<&Path>) -> Result<RangePlan, AuditError> {
        let plan = match range_file {
            Some(path) => target::load_range_file(path).map_err(|e| self.fail(e))?,
            None => {
                let plan = target::default_plan();
                info!("No range file given, auditing the default private ranges");
                plan
            }
        };

        info!(
            "{} segments planned across {} ranges",
            plan.total_segments,
            plan.targets.len()
        );
        self.enter(AuditStage::RangesReady);
        Ok(plan)
    }

    /// Full run: scan `plan`, then parse, model and export.
    pub async fn run(
        &mut self,
        plan: &RangePlan,
        runner: Arc<dyn ScanRunner>,
        work_dir: &Path,
        sink: &mut dyn ArtifactSink,
    ) -> Result<AuditOutcome, AuditError> {
        let started_at = Utc::now();
        self.enter(AuditStage::ScanRunning);

        let version = runner.check_version().await.map_err(|e| self.fail(e))?;
        debug!("Scanner version {version} accepted");

        let sweep = Sweep {
            targets: plan.scan_specs(),
            ports: knowledge_base::target_ports(),
            profile: self.config.profile,
            jobs: self.config.jobs,
            timeout: self.config.scan_timeout,
            work_dir: work_dir.to_path_buf(),
        };
        let artifacts = sweep.run(runner).await.map_err(|e| self.fail(e))?;
        self.enter(AuditStage::ScanDone);
        info!("Scan finished in {}", crate::export::format_duration(artifacts.duration));

        let source = PreferredSource::new(artifacts.gnmap, artifacts.xml);
        self.conclude(&source, plan.total_segments, started_at, artifacts.duration, sink)
    }

    /// Re-runs the reporting half on artifacts of an earlier scan.
    pub fn report(
        &mut self,
        source: &dyn ScanResultSource,
        total_segments: usize,
        sink: &mut dyn ArtifactSink,
    ) -> Result<AuditOutcome, AuditError> {
        self.conclude(source, total_segments, Utc::now(), Duration::ZERO, sink)
    }

    fn conclude(
        &mut self,
        source: &dyn ScanResultSource,
        total_segments: usize,
        started_at: DateTime<Utc>,
        scan_duration: Duration,
        sink: &mut dyn ArtifactSink,
    ) -> Result<AuditOutcome, AuditError> {
        self.enter(AuditStage::Parsing);
        debug!("Reading {}", source.describe());
        let findings: Vec<Finding> = source.load().map_err(|e| self.fail(e))?;

        if findings.is_empty() {
            warn!("No open critical ports were found, nothing to export");
            self.enter(AuditStage::Empty);
            return Ok(AuditOutcome::Empty);
        }

        let model = AuditModel::build(findings, total_segments);
        self.enter(AuditStage::ModelReady);

        let meta = RunMetadata::new(started_at, Utc::now(), scan_duration);

        self.enter(AuditStage::Exporting);
        let exporters = exporters_for(self.config.export, self.config.dashboard);
        let mut exports = export_all(&exporters, &model, &meta, sink);

        match export_one(&SummaryExporter, &model, &meta, sink) {
            Ok(path) => {
                exports.written.push((ArtifactKind::Summary, path));
                self.enter(AuditStage::SummaryWritten);
            }
            Err(e) => {
                error!("{e}");
                exports.failed.push(e);
            }
        }

        if exports.is_partial() {
            warn!(
                "{} of {} artifacts could not be produced",
                exports.failed.len(),
                exports.failed.len() + exports.written.len()
            );
        }

        self.enter(AuditStage::Done);
        Ok(AuditOutcome::Completed(AuditReport {
            model,
            meta,
            exports,
        }))
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
