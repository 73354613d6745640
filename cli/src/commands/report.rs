use segmentor_common::config::Config;
use segmentor_core::audit::{Auditor, ExitStatus};
use segmentor_core::parser::PreferredSource;

use crate::commands::ReportArgs;
use crate::commands::audit::{present, with_stage};
use crate::output::DirectorySink;
use crate::terminal::print;

/// Rebuilds every report from the output files of an earlier scan.
pub fn report(args: &ReportArgs, cfg: &Config) -> anyhow::Result<ExitStatus> {
    print::header("building reports", cfg.quiet);

    let source = PreferredSource::new(&args.gnmap, args.xml.clone());
    let mut sink = DirectorySink::new(&cfg.output_dir);

    let outcome = Auditor::new(cfg)
        .report(&source, args.segments, &mut sink)
        .map_err(with_stage)?;

    Ok(present(outcome, cfg))
}
