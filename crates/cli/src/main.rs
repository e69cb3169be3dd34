use clap::{Parser, Subcommand};

mod commands;

use commands::{AggregateArgs, DiagnoseArgs, ValidateArgs};

#[derive(Parser)]
#[command(name = "adsight")]
#[command(about = "Validate campaign performance hypotheses against segment statistics", long_about = None)]
struct Cli {
    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate a campaign CSV into per-segment statistics
    Aggregate(AggregateArgs),
    /// Validate hypotheses against a statistics snapshot
    Validate(ValidateArgs),
    /// Aggregate a campaign CSV and validate hypotheses against it
    Diagnose(DiagnoseArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match &cli.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    match cli.command {
        Commands::Aggregate(args) => commands::run_aggregate(args)?,
        Commands::Validate(args) => commands::run_validate(args)?,
        Commands::Diagnose(args) => commands::run_diagnose(args)?,
    }

    Ok(())
}
