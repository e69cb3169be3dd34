//! Validate CLI command.
//!
//! Scores hypotheses against a statistics snapshot and renders the report.

use adsight_core::{AppConfig, Hypothesis, StatisticsSnapshot};
use adsight_validation::ValidationOrchestrator;
use anyhow::{Context, Result};
use clap::Args;

use super::{emit, load_config, read_hypotheses, render, report_destination, OutputFormat};

/// Options shared by commands that produce a validation report.
#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Hypotheses JSON file
    #[arg(long)]
    pub hypotheses: String,

    /// Config file path
    #[arg(short, long, env = "ADSIGHT_CONFIG", default_value = "config/Config.toml")]
    pub config: String,

    /// Config profile overlay, e.g. `dev` for Config.dev.toml
    #[arg(long)]
    pub profile: Option<String>,

    /// Report format
    #[arg(long, value_enum, ignore_case = true, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Save the report under output.reports_dir when no output file is given
    #[arg(long)]
    pub save: bool,
}

impl ReportArgs {
    /// Validates the hypotheses against `snapshot` and writes the report.
    pub fn report(
        &self,
        config: &AppConfig,
        hypotheses: &[Hypothesis],
        snapshot: &StatisticsSnapshot,
    ) -> Result<()> {
        let format = self.format;
        let orchestrator = ValidationOrchestrator::new(config.validation.clone())
            .context("Invalid validation configuration")?;

        let report = orchestrator.run(hypotheses, snapshot);

        if report.summary.actionable_insights == 0 {
            tracing::warn!("No actionable hypotheses in this run");
        }

        let destination = report_destination(
            self.output.as_deref(),
            self.save,
            &config.output.reports_dir,
            format,
        );
        emit(&render(&report, format)?, destination.as_deref())
    }
}

/// Arguments for the validate command.
#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    /// Statistics snapshot JSON file, as written by `aggregate`
    #[arg(long)]
    pub statistics: String,

    #[command(flatten)]
    pub report: ReportArgs,
}

/// Runs the validate command.
///
/// # Errors
/// Returns an error if the config is invalid, an input file cannot be read,
/// or the statistics are structurally invalid.
pub fn run_validate(args: ValidateArgs) -> Result<()> {
    let config = load_config(&args.report.config, args.report.profile.as_deref())?;
    let hypotheses = read_hypotheses(&args.report.hypotheses)?;

    let json = std::fs::read_to_string(&args.statistics)
        .with_context(|| format!("Failed to read statistics file: {}", args.statistics))?;
    let snapshot = StatisticsSnapshot::from_json(&json)
        .with_context(|| format!("Invalid statistics file: {}", args.statistics))?;

    tracing::info!(
        "Loaded {} hypotheses and {} segment records",
        hypotheses.len(),
        snapshot.len()
    );

    args.report.report(&config, &hypotheses, &snapshot)
}
