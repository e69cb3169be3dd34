//! Aggregate CLI command.
//!
//! Turns a daily campaign CSV into the per-segment statistics snapshot that
//! `validate` consumes.

use std::path::Path;

use adsight_core::{DataConfig, StatisticsSnapshot};
use adsight_data::{aggregate_segments, CampaignTable, PeriodWindows};
use anyhow::{anyhow, Context, Result};
use clap::Args;

use super::{emit, load_config, parse_columns};

/// Options shared by every command that reads a campaign CSV.
#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Campaign CSV file
    #[arg(short, long)]
    pub data: String,

    /// Metric column to aggregate (default: data.primary_metric)
    #[arg(long)]
    pub metric: Option<String>,

    /// Comma-separated segment columns (default: data.segment_columns)
    #[arg(long)]
    pub segments: Option<String>,

    /// Days in each comparison window (default: data.lookback_days)
    #[arg(long)]
    pub lookback_days: Option<u32>,
}

impl DataArgs {
    /// Loads the CSV and aggregates it, with CLI flags overriding config.
    pub fn build_snapshot(&self, config: &DataConfig) -> Result<StatisticsSnapshot> {
        let metric = self.metric.as_deref().unwrap_or(&config.primary_metric);
        let segment_columns = self
            .segments
            .as_deref()
            .map_or_else(|| config.segment_columns.clone(), parse_columns);
        let lookback_days = self.lookback_days.unwrap_or(config.lookback_days);

        let table = CampaignTable::from_path(&self.data, &config.date_column)?;
        let max_date = table
            .max_date()
            .ok_or_else(|| anyhow!("Campaign CSV has no rows: {}", self.data))?;
        let windows = PeriodWindows::trailing(max_date, lookback_days)?;

        tracing::info!(
            "Comparing {} to {} against {} to {}",
            windows.current.start,
            windows.current.end,
            windows.comparison.start,
            windows.comparison.end
        );

        aggregate_segments(&table, &windows, metric, &segment_columns)
            .with_context(|| format!("Failed to aggregate {metric} from {}", self.data))
    }
}

/// Arguments for the aggregate command.
#[derive(Args, Debug, Clone)]
pub struct AggregateArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Config file path
    #[arg(short, long, env = "ADSIGHT_CONFIG", default_value = "config/Config.toml")]
    pub config: String,

    /// Config profile overlay, e.g. `dev` for Config.dev.toml
    #[arg(long)]
    pub profile: Option<String>,

    /// Output JSON file (default: stdout)
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Runs the aggregate command.
///
/// # Errors
/// Returns an error if the CSV cannot be read or aggregated.
pub fn run_aggregate(args: AggregateArgs) -> Result<()> {
    let config = load_config(&args.config, args.profile.as_deref())?;
    let snapshot = args.data.build_snapshot(&config.data)?;

    let json = serde_json::to_string_pretty(&snapshot).context("Failed to serialize snapshot")?;
    emit(&json, args.output.as_deref().map(Path::new))
}
