//! The seam between the audit and the **external port scanner**.
//!
//! The audit never talks to a scanner binary directly. It hands a
//! [`ScanRequest`] to a [`ScanRunner`] and gets back the paths of the
//! artifacts the scanner produced. [`nmap::NmapRunner`] is the production
//! implementation; tests substitute runners that write canned artifacts.
//!
//! A runner performs exactly one scanner pass. Multi-pass profiles and
//! parallel jobs are layered on top by [`sweep::Sweep`].
//!
//! **Contract:**
//! A runner either returns [`ScanArtifacts`] whose grepable file exists, or an
//! [`UpstreamToolError`]. A missing artifact after a "successful" process exit
//! counts as a failure.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod merge;
pub mod nmap;
pub mod sweep;

pub use nmap::NmapRunner;
pub use sweep::Sweep;

/// Timing of a single scanner pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    Optimized,
    /// Discovery pass of the verified profile.
    VerifiedFast,
    /// Confirmation pass of the verified profile, over known hosts only.
    VerifiedSlow,
    Conservative,
}

/// Everything a runner needs to perform one scan.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// One scanner target per line, `a.b.c.x-y` or a single address.
    pub targets: Vec<String>,
    /// Comma separated port list.
    pub ports: String,
    pub timing: Timing,
    pub timeout: Duration,
    /// Directory the runner may use for its input and output files.
    pub work_dir: PathBuf,
}

/// Output files of a finished scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanArtifacts {
    pub gnmap: PathBuf,
    /// Present when the scanner also wrote a structured report.
    pub xml: Option<PathBuf>,
    pub duration: Duration,
}

#[derive(Debug, Error)]
pub enum UpstreamToolError {
    #[error("scanner binary `{binary}` was not found on PATH")]
    NotInstalled { binary: String },

    #[error("scanner version {found} is too old, {required} or newer is required")]
    Unsupported { found: String, required: String },

    #[error("scanner could not be started: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("scanner exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("scanner did not finish within {0:?}")]
    Timeout(Duration),

    #[error("scanner finished but {0} was not produced")]
    MissingArtifact(PathBuf),

    #[error("scanner work files could not be prepared: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ScanRunner: Send + Sync {
    /// Confirms the scanner is usable and returns its version string.
    async fn check_version(&self) -> Result<String, UpstreamToolError>;

    /// Runs one scan to completion.
    async fn run(&self, request: &ScanRequest) -> Result<ScanArtifacts, UpstreamToolError>;

    /// Round-trip time to a well-known host, used to pick a profile.
    ///
    /// `None` means the latency could not be measured.
    async fn measure_latency(&self) -> Option<Duration> {
        None
    }
}
