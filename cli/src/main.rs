mod commands;
mod output;
mod terminal;

use std::process::ExitCode;
use std::time::Duration;

use commands::{CommandLine, Commands, OutputArgs, audit, ports, report};
use segmentor_common::config::{Config, DEFAULT_SCAN_TIMEOUT, ScanProfile};
use segmentor_core::audit::ExitStatus;
use terminal::{logging, print};
use tracing::error;

fn config(cli: &CommandLine, output: Option<&OutputArgs>) -> Config {
    let mut cfg = Config {
        quiet: cli.quiet,
        ..Config::default()
    };

    if let Some(output) = output {
        cfg.simple = output.simple;
        cfg.export = output.export.into();
        cfg.dashboard = output.dashboard_enabled();
        cfg.output_dir = output.output_dir.clone();
    }

    if let Commands::Audit(args) = &cli.command {
        cfg.scan_timeout = args
            .timeout
            .map_or(DEFAULT_SCAN_TIMEOUT, Duration::from_secs);
        cfg.profile = ScanProfile::from(args.profile);
        cfg.jobs = usize::from(args.jobs);
        cfg.no_interactive = args.no_interactive;
    }

    cfg
}

async fn run(cli: &CommandLine) -> anyhow::Result<ExitStatus> {
    match &cli.command {
        Commands::Audit(args) => {
            let cfg = config(cli, Some(&args.output));
            print::banner(cfg.quiet);
            audit::audit(args, &cfg).await
        }
        Commands::Report(args) => {
            let cfg = config(cli, Some(&args.output));
            print::banner(cfg.quiet);
            report::report(args, &cfg)
        }
        Commands::Ports => {
            let cfg = config(cli, None);
            ports::ports(&cfg);
            Ok(ExitStatus::Success)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CommandLine::parse_args();

    if let Err(e) = logging::init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("segmentor: {e:#}");
        return ExitCode::from(ExitStatus::Failure.code() as u8);
    }

    let status = match run(&cli).await {
        Ok(status) => status,
        Err(e) => {
            error!("{e:#}");
            ExitStatus::Failure
        }
    };

    ExitCode::from(status.code() as u8)
}
