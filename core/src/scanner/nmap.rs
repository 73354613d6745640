//! Runs `nmap` as a child process.
//!
//! The scan is a TCP SYN scan restricted to the knowledge-base ports, reporting
//! open ports only, with DNS resolution disabled. Targets are passed through a
//! file (`-iL`) and both the grepable (`-oG`) and XML (`-oX`) reports are
//! requested.
//!
//! The runner also measures latency with a single `ping`, which the sweep uses
//! to choose a profile when none was given.

use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info};

use crate::scanner::{ScanArtifacts, ScanRequest, ScanRunner, Timing, UpstreamToolError};

const MIN_VERSION: (u32, u32) = (7, 0);

const LATENCY_HOST: &str = "8.8.8.8";
const PING_ATTEMPTS: u32 = 2;
const PING_TIMEOUT: Duration = Duration::from_secs(5);

const TARGETS_FILE: &str = "targets.txt";
const GNMAP_FILE: &str = "scan.gnmap";
const XML_FILE: &str = "scan.xml";

static VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Nmap version (?P<major>\d+)\.(?P<minor>\d+)").expect("version pattern is valid")
});

static PING_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"time[=<](?P<ms>\d+(?:\.\d+)?)").expect("ping pattern is valid"));

fn timing_args(timing: Timing) -> &'static [&'static str] {
    match timing {
        Timing::Optimized => &[
            "-T3",
            "--max-retries",
            "3",
            "--max-rtt-timeout",
            "3000ms",
            "--initial-rtt-timeout",
            "800ms",
            "--min-rate",
            "50",
            "--max-rate",
            "200",
            "--scan-delay",
            "10ms",
        ],
        Timing::VerifiedFast => &[
            "-T3",
            "--max-retries",
            "2",
            "--max-rtt-timeout",
            "2000ms",
            "--min-rate",
            "30",
            "--max-rate",
            "150",
        ],
        Timing::VerifiedSlow => &[
            "-T2",
            "--max-retries",
            "4",
            "--max-rtt-timeout",
            "4000ms",
            "--max-rate",
            "80",
            "--scan-delay",
            "20ms",
        ],
        Timing::Conservative => &[
            "-T2",
            "--max-retries",
            "5",
            "--max-rtt-timeout",
            "5000ms",
            "--max-rate",
            "100",
            "--scan-delay",
            "50ms",
        ],
    }
}

/// Full argument list for one scan.
pub fn build_args(request: &ScanRequest, targets: &Path, gnmap: &Path, xml: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec!["-n".into(), "-sS".into(), "-p".into(), request.ports.clone(), "--open".into()];
    args.extend(timing_args(request.timing).iter().map(|s| s.to_string()));
    args.extend([
        "-iL".to_string(),
        targets.display().to_string(),
        "-oG".to_string(),
        gnmap.display().to_string(),
        "-oX".to_string(),
        xml.display().to_string(),
    ]);
    args
}

/// Round-trip time reported by `ping`.
pub fn parse_ping_time(output: &str) -> Option<Duration> {
    let caps = PING_TIME.captures(output)?;
    let ms: f64 = caps["ms"].parse().ok()?;
    Some(Duration::from_secs_f64(ms / 1000.0))
}

/// Extracts `major.minor` from `nmap --version` output.
pub fn parse_version(output: &str) -> Option<(u32, u32)> {
    let caps = VERSION.captures(output)?;
    Some((caps["major"].parse().ok()?, caps["minor"].parse().ok()?))
}

pub struct NmapRunner {
    binary: String,
}

impl Default for NmapRunner {
    fn default() -> Self {
        Self::new("nmap")
    }
}

impl NmapRunner {
    /// Uses `binary` instead of the `nmap` found on PATH.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn spawn_error(&self, e: std::io::Error) -> UpstreamToolError {
        if e.kind() == ErrorKind::NotFound {
            UpstreamToolError::NotInstalled {
                binary: self.binary.clone(),
            }
        } else {
            UpstreamToolError::Spawn(e)
        }
    }
}

#[async_trait]
impl ScanRunner for NmapRunner {
    async fn check_version(&self) -> Result<String, UpstreamToolError> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let found = parse_version(&stdout);
        let required = format!("{}.{}", MIN_VERSION.0, MIN_VERSION.1);

        match found {
            Some(version) if version >= MIN_VERSION => {
                let version = format!("{}.{}", version.0, version.1);
                debug!("Using nmap {version}");
                Ok(version)
            }
            Some(version) => Err(UpstreamToolError::Unsupported {
                found: format!("{}.{}", version.0, version.1),
                required,
            }),
            None => Err(UpstreamToolError::Unsupported {
                found: "unknown".to_string(),
                required,
            }),
        }
    }

    async fn run(&self, request: &ScanRequest) -> Result<ScanArtifacts, UpstreamToolError> {
        let targets = request.work_dir.join(TARGETS_FILE);
        let gnmap = request.work_dir.join(GNMAP_FILE);
        let xml = request.work_dir.join(XML_FILE);

        tokio::fs::write(&targets, request.targets.join("\n")).await?;

        let args = build_args(request, &targets, &gnmap, &xml);
        debug!("Executing: {} {}", self.binary, args.join(" "));
        info!("Scanning {} target ranges on {} ports", request.targets.len(), request.ports.split(',').count());

        let started = Instant::now();
        let child = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(request.timeout, child.wait_with_output())
            .await
            .map_err(|_| UpstreamToolError::Timeout(request.timeout))?
            .map_err(UpstreamToolError::Spawn)?;

        if !output.status.success() {
            return Err(UpstreamToolError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if !tokio::fs::try_exists(&gnmap).await.unwrap_or(false) {
            return Err(UpstreamToolError::MissingArtifact(gnmap));
        }
        let xml = tokio::fs::try_exists(&xml).await.unwrap_or(false).then_some(xml);

        Ok(ScanArtifacts {
            gnmap,
            xml,
            duration: started.elapsed(),
        })
    }

    async fn measure_latency(&self) -> Option<Duration> {
        for attempt in 1..=PING_ATTEMPTS {
            let ping = Command::new("ping")
                .args(["-c", "1", "-W", "2", LATENCY_HOST])
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output();

            match tokio::time::timeout(PING_TIMEOUT, ping).await {
                Ok(Ok(output)) if output.status.success() => {
                    return parse_ping_time(&String::from_utf8_lossy(&output.stdout));
                }
                Ok(Ok(output)) => debug!("ping attempt {attempt} exited with {}", output.status),
                Ok(Err(e)) => {
                    debug!("ping could not be started: {e}");
                    return None;
                }
                Err(_) => debug!("ping attempt {attempt} timed out"),
            }
            tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
        }
        None
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
