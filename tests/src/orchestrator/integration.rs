#![cfg(test)]
use async_trait::async_trait;
use segmentor_common::config::{Config, ExportSelection};
use segmentor_common::network::target::RangePlan;
use segmentor_core::audit::{AuditOutcome, AuditStage, Auditor, ExitStatus};
use segmentor_core::export::{ArtifactKind, ArtifactSink};
use segmentor_core::scanner::{ScanArtifacts, ScanRequest, ScanRunner, UpstreamToolError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Writes into a real directory, refusing names that end with `refuse`.
struct TempDirSink {
    dir: PathBuf,
    refuse: Option<&'static str>,
}

impl ArtifactSink for TempDirSink {
    fn write(&mut self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        if self.refuse.is_some_and(|suffix| name.ends_with(suffix)) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only directory"));
        }
        let path = self.dir.join(name);
        fs::write(&path, bytes)?;
        Ok(path)
    }
}

/// Pretends to be the scanner: records the request and drops canned reports.
struct CannedScanner {
    gnmap: &'static str,
    xml: Option<&'static str>,
}

#[async_trait]
impl ScanRunner for CannedScanner {
    async fn check_version(&self) -> Result<String, UpstreamToolError> {
        Ok("7.94".to_string())
    }

    async fn run(&self, request: &ScanRequest) -> Result<ScanArtifacts, UpstreamToolError> {
        fs::write(request.work_dir.join("request.txt"), request.targets.join("\n"))?;

        let gnmap = request.work_dir.join("scan.gnmap");
        fs::write(&gnmap, self.gnmap)?;
        let xml = match self.xml {
            Some(content) => {
                let path = request.work_dir.join("scan.xml");
                fs::write(&path, content)?;
                Some(path)
            }
            None => None,
        };

        Ok(ScanArtifacts {
            gnmap,
            xml,
            duration: Duration::from_secs(5),
        })
    }
}

struct MissingScanner;

#[async_trait]
impl ScanRunner for MissingScanner {
    async fn check_version(&self) -> Result<String, UpstreamToolError> {
        Err(UpstreamToolError::NotInstalled {
            binary: "nmap".to_string(),
        })
    }

    async fn run(&self, _request: &ScanRequest) -> Result<ScanArtifacts, UpstreamToolError> {
        unreachable!("run must not be called when the version check fails")
    }
}

const GNMAP: &str = "Host: 192.168.1.10 ()\tPorts: 80/open/tcp//http///\n";
const XML: &str = r#"<nmaprun><host><status state="up"/><address addr="192.168.1.10" addrtype="ipv4"/><ports><port protocol="tcp" portid="80"><state state="open"/></port><port protocol="tcp" portid="1433"><state state="open"/></port></ports></host></nmaprun>"#;

fn plan() -> RangePlan {
    RangePlan::new(vec![
        "192.168.1.0/24".parse().unwrap(),
        "192.168.1.100-192.168.2.20".parse().unwrap(),
    ])
}

fn files_in(dir: &Path) -> usize {
    fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
}

#[tokio::test]
async fn xml_report_is_preferred_when_present() {
    let config = Config::default();
    let work = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut sink = TempDirSink {
        dir: out.path().to_path_buf(),
        refuse: None,
    };

    let scanner = Arc::new(CannedScanner {
        gnmap: GNMAP,
        xml: Some(XML),
    });
    let outcome = Auditor::new(&config)
        .run(&plan(), scanner, work.path(), &mut sink)
        .await
        .unwrap();

    let AuditOutcome::Completed(report) = outcome else {
        panic!("expected a completed audit");
    };
    assert_eq!(report.model.stats().total_findings, 2);
    assert_eq!(report.model.stats().total_segments_scanned, 2);
    assert_eq!(files_in(out.path()), 5);

    let requested = fs::read_to_string(work.path().join("request.txt")).unwrap();
    assert_eq!(requested, "192.168.1.0/24\n192.168.1.100-255\n192.168.2.0-20");
}

#[tokio::test]
async fn missing_scanner_aborts_before_any_output() {
    let config = Config::default();
    let work = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut sink = TempDirSink {
        dir: out.path().to_path_buf(),
        refuse: None,
    };

    let mut auditor = Auditor::new(&config);
    let err = auditor
        .run(&plan(), Arc::new(MissingScanner), work.path(), &mut sink)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), AuditStage::ScanRunning);
    assert!(err.to_string().contains("not found"));
    assert_eq!(auditor.stage(), AuditStage::Failed);
    assert_eq!(files_in(out.path()), 0);
}

#[tokio::test]
async fn refused_artifact_leaves_the_rest_in_place() {
    let config = Config {
        export: ExportSelection::All,
        ..Config::default()
    };
    let work = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut sink = TempDirSink {
        dir: out.path().to_path_buf(),
        refuse: Some(".html"),
    };

    let scanner = Arc::new(CannedScanner {
        gnmap: GNMAP,
        xml: None,
    });
    let outcome = Auditor::new(&config)
        .run(&plan(), scanner, work.path(), &mut sink)
        .await
        .unwrap();

    assert_eq!(outcome.exit_status(), ExitStatus::Partial);
    let AuditOutcome::Completed(report) = outcome else {
        panic!("expected a completed audit");
    };
    assert_eq!(report.exports.failed.len(), 1);
    assert_eq!(report.exports.failed[0].kind(), ArtifactKind::Dashboard);
    assert!(report.exports.failed[0].to_string().contains("read-only directory"));
    assert_eq!(files_in(out.path()), 4);
}

#[tokio::test]
async fn parallel_jobs_feed_one_merged_model() {
    let config = Config {
        jobs: 3,
        ..Config::default()
    };
    let work = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let mut sink = TempDirSink {
        dir: out.path().to_path_buf(),
        refuse: None,
    };

    let scanner = Arc::new(CannedScanner {
        gnmap: GNMAP,
        xml: Some(XML),
    });
    let outcome = Auditor::new(&config)
        .run(&plan(), scanner, work.path(), &mut sink)
        .await
        .unwrap();

    let AuditOutcome::Completed(report) = outcome else {
        panic!("expected a completed audit");
    };
    // Every job reports the same host; the model keeps one copy of each port.
    assert_eq!(report.model.stats().total_findings, 2);
    assert_eq!(files_in(out.path()), 5);

    let jobs: Vec<String> = (0..3)
        .map(|idx| fs::read_to_string(work.path().join(format!("job-{idx:03}")).join("request.txt")).unwrap())
        .collect();
    assert_eq!(jobs, vec!["192.168.1.0/24", "192.168.1.100-255", "192.168.2.0-20"]);

    let merged = fs::read_to_string(work.path().join("merged.gnmap")).unwrap();
    assert_eq!(merged.lines().count(), 3);
    assert!(work.path().join("merged.xml").exists());
}
