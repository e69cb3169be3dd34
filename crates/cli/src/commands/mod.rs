//! CLI commands for campaign performance diagnosis.

pub mod aggregate;
pub mod diagnose;
pub mod validate;

pub use aggregate::{run_aggregate, AggregateArgs};
pub use diagnose::{run_diagnose, DiagnoseArgs};
pub use validate::{run_validate, ValidateArgs};

use std::path::{Path, PathBuf};

use adsight_core::{AppConfig, ConfigLoader, Hypothesis, HypothesisSet};
use adsight_validation::ValidationReport;
use anyhow::{Context, Result};
use clap::ValueEnum;

/// Output format for validation reports, also the extension of a saved report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Sectioned plain-text report
    #[value(alias = "txt")]
    Text,
    /// Full report as pretty-printed JSON
    Json,
}

impl OutputFormat {
    const fn extension(self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
        }
    }
}

/// Loads configuration, with an optional profile overlay.
pub fn load_config(path: &str, profile: Option<&str>) -> Result<AppConfig> {
    let config = match profile {
        Some(profile) => ConfigLoader::load_with_profile(path, profile)?,
        None => ConfigLoader::load(path)?,
    };
    tracing::debug!(path, ?profile, "Loaded configuration");
    Ok(config)
}

/// Splits a comma-separated column list, dropping blanks.
pub fn parse_columns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Reads hypotheses from `{"hypotheses": [...]}` or a bare JSON array.
pub fn parse_hypotheses(json: &str) -> Result<Vec<Hypothesis>> {
    if let Ok(set) = serde_json::from_str::<HypothesisSet>(json) {
        return Ok(set.hypotheses);
    }
    serde_json::from_str::<Vec<Hypothesis>>(json).context("Invalid hypotheses JSON")
}

pub fn read_hypotheses(path: &str) -> Result<Vec<Hypothesis>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read hypotheses file: {path}"))?;
    parse_hypotheses(&json).with_context(|| format!("Failed to parse hypotheses file: {path}"))
}

pub fn render(report: &ValidationReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(report.to_text()),
        OutputFormat::Json => report.to_json().context("Failed to serialize report"),
    }
}

/// Where a report goes: an explicit path, the reports directory, or stdout.
pub fn report_destination(
    output: Option<&str>,
    save: bool,
    reports_dir: &str,
    format: OutputFormat,
) -> Option<PathBuf> {
    match output {
        Some(path) => Some(PathBuf::from(path)),
        None if save => Some(
            Path::new(reports_dir).join(format!("validation_report.{}", format.extension())),
        ),
        None => None,
    }
}

/// Writes `content` to `destination`, or prints it when there is none.
pub fn emit(content: &str, destination: Option<&Path>) -> Result<()> {
    match destination {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write output file: {}", path.display()))?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{content}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::validate::ReportArgs;
    use clap::Parser;

    // ============================================
    // OutputFormat Tests
    // ============================================

    #[derive(Parser, Debug)]
    struct ReportHarness {
        #[command(flatten)]
        report: ReportArgs,
    }

    fn parse_format(args: &[&str]) -> Result<OutputFormat, clap::Error> {
        let base = ["adsight", "--hypotheses", "h.json"];
        ReportHarness::try_parse_from(base.iter().chain(args).copied()).map(|h| h.report.format)
    }

    #[test]
    fn output_format_defaults_to_text() {
        assert_eq!(parse_format(&[]).unwrap(), OutputFormat::Text);
    }

    #[test]
    fn output_format_accepts_alias_and_any_case() {
        assert_eq!(parse_format(&["--format", "txt"]).unwrap(), OutputFormat::Text);
        assert_eq!(parse_format(&["--format", "JSON"]).unwrap(), OutputFormat::Json);
    }

    #[test]
    fn output_format_rejects_unknown() {
        assert!(parse_format(&["--format", "xml"]).is_err());
        assert!(parse_format(&["--format", ""]).is_err());
    }

    // ============================================
    // Input Tests
    // ============================================

    #[test]
    fn parse_columns_trims_and_drops_blanks() {
        assert_eq!(
            parse_columns(" creative_type, platform ,,"),
            vec!["creative_type".to_string(), "platform".to_string()]
        );
    }

    #[test]
    fn parse_hypotheses_accepts_wrapped_and_bare() {
        let wrapped = r#"{"hypotheses": [{"id": "H1", "hypothesis": "Image fatigue", "affected_segment": "creative_type=Image", "initial_confidence": 0.7}]}"#;
        let bare = r#"[{"id": "H1", "hypothesis_text": "Image fatigue", "affected_segment": "creative_type=Image", "initial_confidence": 0.7}]"#;

        assert_eq!(parse_hypotheses(wrapped).unwrap().len(), 1);
        assert_eq!(parse_hypotheses(bare).unwrap()[0].id, "H1");
        assert!(parse_hypotheses("{}").is_err());
    }

    #[test]
    fn destination_prefers_explicit_path() {
        assert_eq!(
            report_destination(Some("out.json"), true, "reports", OutputFormat::Json),
            Some(PathBuf::from("out.json"))
        );
        assert_eq!(
            report_destination(None, true, "reports", OutputFormat::Text),
            Some(Path::new("reports").join("validation_report.txt"))
        );
        assert_eq!(
            report_destination(None, false, "reports", OutputFormat::Text),
            None
        );
    }
}
