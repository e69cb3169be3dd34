//! Diagnose CLI command: aggregate then validate in one process.

use anyhow::Result;
use clap::Args;

use super::aggregate::DataArgs;
use super::validate::ReportArgs;
use super::{load_config, read_hypotheses};

/// Arguments for the diagnose command.
#[derive(Args, Debug, Clone)]
pub struct DiagnoseArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub report: ReportArgs,
}

/// Runs the diagnose command.
///
/// # Errors
/// Returns an error if the config is invalid or an input file cannot be
/// read or aggregated.
pub fn run_diagnose(args: DiagnoseArgs) -> Result<()> {
    let config = load_config(&args.report.config, args.report.profile.as_deref())?;
    let hypotheses = read_hypotheses(&args.report.hypotheses)?;
    let snapshot = args.data.build_snapshot(&config.data)?;

    args.report.report(&config, &hypotheses, &snapshot)
}
