pub mod audit;
pub mod ports;
pub mod report;

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use segmentor_common::config::{ExportSelection, MAX_JOBS, ScanProfile};

#[derive(Parser)]
#[command(name = "segmentor")]
#[command(version, about = "Audits network segmentation by sweeping private ranges for exposed critical services.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Reduce output (-q hides banners, -qq also hides per-host detail)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub quiet: u8,

    /// Also write every log event to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan the planned ranges and report exposed critical services
    #[command(alias = "a")]
    Audit(AuditArgs),
    /// Build the reports from an earlier scan's output files
    #[command(alias = "r")]
    Report(ReportArgs),
    /// List the ports the audit looks for
    #[command(alias = "p")]
    Ports,
}

#[derive(Args)]
pub struct OutputArgs {
    /// Which reports to write (the text summary is always written)
    #[arg(short, long, value_enum, default_value_t = ExportFormat::All)]
    pub export: ExportFormat,

    /// Render the HTML dashboard (default)
    #[arg(long, overrides_with = "no_dashboard")]
    pub dashboard: bool,

    /// Skip the HTML dashboard
    #[arg(long, overrides_with = "dashboard")]
    pub no_dashboard: bool,

    /// One line per segment instead of the full host tree
    #[arg(short, long)]
    pub simple: bool,

    /// Directory the artifacts are written into
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,
}

#[derive(Args)]
pub struct AuditArgs {
    /// File with custom ranges (CIDR, a.b.c.d-e.f.g.h, a.b.c.d-n or single IPs), one per line
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Abort the scan after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Scanner timing profile (auto measures latency first)
    #[arg(long, value_enum, default_value_t = Profile::Auto)]
    pub profile: Profile,

    /// Ranges scanned in parallel
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=MAX_JOBS as i64))]
    pub jobs: u8,

    /// Disable the progress spinner
    #[arg(long)]
    pub no_interactive: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args)]
pub struct ReportArgs {
    /// Grepable scanner output (-oG)
    #[arg(long, value_name = "PATH")]
    pub gnmap: PathBuf,

    /// XML scanner output (-oX), preferred when readable
    #[arg(long, value_name = "PATH")]
    pub xml: Option<PathBuf>,

    /// Number of /24 segments the scan covered
    #[arg(long, value_name = "N")]
    pub segments: usize,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
    Markdown,
    All,
}

impl From<ExportFormat> for ExportSelection {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Csv => ExportSelection::Csv,
            ExportFormat::Json => ExportSelection::Json,
            ExportFormat::Markdown => ExportSelection::Markdown,
            ExportFormat::All => ExportSelection::All,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Profile {
    Auto,
    Optimized,
    Verified,
    Conservative,
}

impl From<Profile> for ScanProfile {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Auto => ScanProfile::Auto,
            Profile::Optimized => ScanProfile::Optimized,
            Profile::Verified => ScanProfile::Verified,
            Profile::Conservative => ScanProfile::Conservative,
        }
    }
}

impl OutputArgs {
    pub fn dashboard_enabled(&self) -> bool {
        !self.no_dashboard
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
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

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_line_is_consistent() {
        CommandLine::command().debug_assert();
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        let parsed = CommandLine::try_parse_from(["segmentor", "-v", "-q", "ports"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn report_requires_segment_count() {
        assert!(CommandLine::try_parse_from(["segmentor", "report", "--gnmap", "scan.gnmap"]).is_err());

        let cli = CommandLine::try_parse_from([
            "segmentor", "report", "--gnmap", "scan.gnmap", "--segments", "12", "-e", "json", "--no-dashboard",
        ])
        .unwrap();
        let Commands::Report(args) = cli.command else {
            panic!("expected the report command");
        };
        assert_eq!(args.segments, 12);
        assert!(args.output.no_dashboard);
        assert_eq!(ExportSelection::from(args.output.export), ExportSelection::Json);
    }

    #[test]
    fn jobs_are_bounded() {
        for jobs in ["0", "11"] {
            assert!(CommandLine::try_parse_from(["segmentor", "audit", "-j", jobs]).is_err());
        }

        let cli = CommandLine::try_parse_from(["segmentor", "audit", "-j", "10", "--profile", "verified"]).unwrap();
        let Commands::Audit(args) = cli.command else {
            panic!("expected the audit command");
        };
        assert_eq!(args.jobs, 10);
        assert_eq!(ScanProfile::from(args.profile), ScanProfile::Verified);
    }

    #[test]
    fn audit_defaults_to_auto_profile_and_one_job() {
        let cli = CommandLine::try_parse_from(["segmentor", "audit"]).unwrap();
        let Commands::Audit(args) = cli.command else {
            panic!("expected the audit command");
        };
        assert_eq!(args.jobs, 1);
        assert_eq!(ScanProfile::from(args.profile), ScanProfile::Auto);
    }
}
