use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default upper bound for a whole scanner run.
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(4 * 60 * 60);

/// Which tabular/narrative artifacts a run should produce.
///
/// The dashboard and the plain-text summary are controlled separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportSelection {
    Csv,
    Json,
    Markdown,
    #[default]
    All,
}

impl ExportSelection {
    pub fn csv(self) -> bool {
        matches!(self, Self::Csv | Self::All)
    }

    pub fn json(self) -> bool {
        matches!(self, Self::Json | Self::All)
    }

    pub fn markdown(self) -> bool {
        matches!(self, Self::Markdown | Self::All)
    }
}

/// Upper bound for `--jobs`.
pub const MAX_JOBS: usize = 10;

/// How the external scanner is driven.
///
/// `Auto` picks one of the others from the measured network latency.
/// `Verified` runs a fast discovery pass followed by a slower pass over the
/// hosts the first one found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanProfile {
    #[default]
    Auto,
    Optimized,
    Verified,
    Conservative,
}

impl ScanProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanProfile::Auto => "auto",
            ScanProfile::Optimized => "optimized",
            ScanProfile::Verified => "verified",
            ScanProfile::Conservative => "conservative",
        }
    }
}

impl fmt::Display for ScanProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct Config {
    /// 0 prints everything, 1 hides banners and headers, 2 hides per-host detail too.
    pub quiet: u8,

    /// One line per segment instead of the full host tree.
    pub simple: bool,

    pub export: ExportSelection,

    /// Render the HTML dashboard alongside the other artifacts.
    pub dashboard: bool,

    /// Directory every artifact is written into.
    pub output_dir: PathBuf,

    /// Hard limit for the scanner process. The run fails if no artifact arrives in time.
    pub scan_timeout: Duration,

    pub profile: ScanProfile,

    /// Number of ranges scanned concurrently, 1 to [`MAX_JOBS`].
    pub jobs: usize,

    pub no_interactive: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quiet: 0,
            simple: false,
            export: ExportSelection::default(),
            dashboard: true,
            output_dir: PathBuf::from("."),
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            profile: ScanProfile::default(),
            jobs: 1,
            no_interactive: false,
        }
    }
}
