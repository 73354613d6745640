//! Drives a [`ScanRunner`] over a whole target list.
//!
//! A sweep resolves the scan profile (measuring latency for `auto`), runs the
//! profile's passes and, with more than one job, scans every target line as
//! its own job with at most `jobs` running at once. Job reports are merged
//! into a single grepable and a single XML report.
//!
//! The configured timeout bounds the sweep as a whole: every pass only gets
//! the time that is left.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use segmentor_common::config::ScanProfile;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::parser::gnmap;
use crate::scanner::merge::{merge_gnmap, merge_xml};
use crate::scanner::{ScanArtifacts, ScanRequest, ScanRunner, Timing, UpstreamToolError};

const FAST_LATENCY: Duration = Duration::from_millis(50);
const NORMAL_LATENCY: Duration = Duration::from_millis(200);

const MERGED_GNMAP: &str = "merged.gnmap";
const MERGED_XML: &str = "merged.xml";

/// Profile for a measured round-trip time. Unknown latency is treated as slow.
pub fn profile_for_latency(latency: Option<Duration>) -> ScanProfile {
    match latency {
        Some(rtt) if rtt < FAST_LATENCY => ScanProfile::Optimized,
        Some(rtt) if rtt < NORMAL_LATENCY => ScanProfile::Verified,
        _ => ScanProfile::Conservative,
    }
}

#[derive(Debug, Clone)]
pub struct Sweep {
    pub targets: Vec<String>,
    pub ports: String,
    pub profile: ScanProfile,
    pub jobs: usize,
    pub timeout: Duration,
    pub work_dir: PathBuf,
}

/// Settings shared by every pass of one sweep.
#[derive(Clone)]
struct PassContext {
    ports: String,
    timeout: Duration,
    deadline: Instant,
}

impl PassContext {
    fn request(&self, targets: Vec<String>, timing: Timing, work_dir: PathBuf) -> Result<ScanRequest, UpstreamToolError> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(UpstreamToolError::Timeout(self.timeout));
        }
        Ok(ScanRequest {
            targets,
            ports: self.ports.clone(),
            timing,
            timeout: remaining,
            work_dir,
        })
    }
}

impl Sweep {
    pub async fn run(&self, runner: Arc<dyn ScanRunner>) -> Result<ScanArtifacts, UpstreamToolError> {
        let started = Instant::now();
        let ctx = PassContext {
            ports: self.ports.clone(),
            timeout: self.timeout,
            deadline: started + self.timeout,
        };

        let profile = match self.profile {
            ScanProfile::Auto => {
                let latency = runner.measure_latency().await;
                let profile = profile_for_latency(latency);
                match latency {
                    Some(rtt) => info!("Measured {}ms latency, using the {profile} profile", rtt.as_millis()),
                    None => info!("Latency could not be measured, using the {profile} profile"),
                }
                profile
            }
            profile => profile,
        };

        let mut artifacts = if self.jobs <= 1 || self.targets.len() <= 1 {
            scan_group(runner.as_ref(), self.targets.clone(), profile, &ctx, &self.work_dir).await?
        } else {
            self.scan_parallel(runner, profile, ctx).await?
        };

        artifacts.duration = started.elapsed();
        Ok(artifacts)
    }

    /// One job per target line, at most `jobs` at a time.
    async fn scan_parallel(
        &self,
        runner: Arc<dyn ScanRunner>,
        profile: ScanProfile,
        ctx: PassContext,
    ) -> Result<ScanArtifacts, UpstreamToolError> {
        info!("Scanning {} ranges with {} parallel jobs", self.targets.len(), self.jobs);

        let semaphore = Arc::new(Semaphore::new(self.jobs));
        let mut tasks = JoinSet::new();

        for (idx, target) in self.targets.iter().enumerate() {
            let dir = self.work_dir.join(format!("job-{idx:03}"));
            tokio::fs::create_dir_all(&dir).await?;

            let runner = Arc::clone(&runner);
            let semaphore = Arc::clone(&semaphore);
            let ctx = ctx.clone();
            let target = target.clone();

            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        debug!("Scanning {target}");
                        scan_group(runner.as_ref(), vec![target.clone()], profile, &ctx, &dir).await
                    }
                    Err(e) => Err(UpstreamToolError::Io(std::io::Error::other(e))),
                };
                (idx, target, result)
            });
        }

        let mut finished = Vec::new();
        let mut last_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, _, Ok(artifacts))) => finished.push((idx, artifacts)),
                Ok((_, target, Err(e))) => {
                    warn!("Scan of {target} failed: {e}");
                    last_error = Some(e);
                }
                Err(e) => {
                    warn!("Scan job panicked or was cancelled: {e}");
                    last_error = Some(UpstreamToolError::Io(std::io::Error::other(e)));
                }
            }
        }

        let failed = self.targets.len() - finished.len();
        if finished.is_empty() {
            return Err(last_error.unwrap_or(UpstreamToolError::MissingArtifact(self.work_dir.join(MERGED_GNMAP))));
        }
        if failed > 0 {
            warn!("{failed} of {} ranges could not be scanned", self.targets.len());
        }

        finished.sort_by_key(|(idx, _)| *idx);
        let parts: Vec<ScanArtifacts> = finished.into_iter().map(|(_, artifacts)| artifacts).collect();
        self.merge(&parts).await
    }

    async fn merge(&self, parts: &[ScanArtifacts]) -> Result<ScanArtifacts, UpstreamToolError> {
        let mut gnmap_parts = Vec::with_capacity(parts.len());
        for part in parts {
            gnmap_parts.push(read_report(&part.gnmap).await?);
        }
        let gnmap = self.work_dir.join(MERGED_GNMAP);
        tokio::fs::write(&gnmap, merge_gnmap(&gnmap_parts)).await?;

        let xml = match parts.iter().map(|p| p.xml.clone()).collect::<Option<Vec<PathBuf>>>() {
            Some(paths) => self.merge_xml_reports(&paths).await,
            None => {
                debug!("Not every job produced an XML report, keeping the grepable output only");
                None
            }
        };

        Ok(ScanArtifacts {
            gnmap,
            xml,
            duration: Duration::ZERO,
        })
    }

    async fn merge_xml_reports(&self, paths: &[PathBuf]) -> Option<PathBuf> {
        let mut xml_parts = Vec::with_capacity(paths.len());
        for path in paths {
            match read_report(path).await {
                Ok(content) => xml_parts.push(content),
                Err(e) => {
                    warn!("XML report {} could not be read: {e}", path.display());
                    return None;
                }
            }
        }

        let merged = match merge_xml(&xml_parts) {
            Ok(merged) => merged,
            Err(e) => {
                warn!("XML reports could not be merged ({e}), keeping the grepable output only");
                return None;
            }
        };

        let path = self.work_dir.join(MERGED_XML);
        match tokio::fs::write(&path, merged).await {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("Merged XML report could not be written: {e}");
                None
            }
        }
    }
}

/// Runs every pass of `profile` over one group of targets.
async fn scan_group(
    runner: &dyn ScanRunner,
    targets: Vec<String>,
    profile: ScanProfile,
    ctx: &PassContext,
    dir: &Path,
) -> Result<ScanArtifacts, UpstreamToolError> {
    let timing = match profile {
        ScanProfile::Verified => return scan_verified(runner, targets, ctx, dir).await,
        ScanProfile::Optimized => Timing::Optimized,
        ScanProfile::Conservative | ScanProfile::Auto => Timing::Conservative,
    };
    runner.run(&ctx.request(targets, timing, dir.to_path_buf())?).await
}

/// Fast discovery, then a slower pass over the hosts it found.
///
/// The first pass's results are kept when the second pass fails.
async fn scan_verified(
    runner: &dyn ScanRunner,
    targets: Vec<String>,
    ctx: &PassContext,
    dir: &Path,
) -> Result<ScanArtifacts, UpstreamToolError> {
    let fast_dir = dir.join("fast");
    tokio::fs::create_dir_all(&fast_dir).await?;
    let first = runner.run(&ctx.request(targets, Timing::VerifiedFast, fast_dir)?).await?;

    let hosts = active_hosts(&first.gnmap).await;
    if hosts.is_empty() {
        info!("Discovery pass found no hosts, skipping verification");
        return Ok(first);
    }
    info!("Discovery pass found {} hosts, verifying them", hosts.len());

    let verify_dir = dir.join("verify");
    tokio::fs::create_dir_all(&verify_dir).await?;
    let hosts = hosts.iter().map(Ipv4Addr::to_string).collect();

    let second = match ctx.request(hosts, Timing::VerifiedSlow, verify_dir) {
        Ok(request) => runner.run(&request).await,
        Err(e) => Err(e),
    };
    match second {
        Ok(second) => Ok(second),
        Err(e) => {
            warn!("Verification pass failed ({e}), keeping the discovery results");
            Ok(first)
        }
    }
}

/// Hosts with at least one open port in a grepable report.
async fn active_hosts(path: &Path) -> BTreeSet<Ipv4Addr> {
    match read_report(path).await {
        Ok(content) => gnmap::parse(content.lines()).map(|f| f.ip).collect(),
        Err(e) => {
            warn!("Discovery report {} could not be read: {e}", path.display());
            BTreeSet::new()
        }
    }
}

async fn read_report(path: &Path) -> std::io::Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
