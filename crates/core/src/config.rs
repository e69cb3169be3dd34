use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub validation: ValidationConfig,
    pub data: DataConfig,
    pub output: OutputConfig,
}

/// Knobs of the validation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Both periods must reach this many observations to be tested
    pub min_sample_size: u64,
    /// Minimum confidence score for a hypothesis to be actionable
    pub actionability_threshold: f64,
    /// Significance level for the mean-difference test
    pub significance_alpha: f64,
    /// Affected change must exceed the control's by this many percentage points
    pub specificity_threshold_pp: f64,
    /// Working standard deviation as a fraction of |mean| when variance is missing
    pub variance_fallback_fraction: f64,
    /// |d| below this is treated as no effect at all
    pub negligible_effect: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_sample_size: 20,
            actionability_threshold: 0.6,
            significance_alpha: 0.05,
            specificity_threshold_pp: 10.0,
            variance_fallback_fraction: 0.2,
            negligible_effect: 0.05,
        }
    }
}

impl ValidationConfig {
    /// Checks every value is inside its usable range.
    ///
    /// # Errors
    /// Returns [`ConfigError::OutOfRange`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_sample_size < 2 {
            return Err(ConfigError::OutOfRange {
                field: "min_sample_size",
                value: self.min_sample_size.to_string(),
                reason: "must be at least 2",
            });
        }

        for (field, value) in [
            ("actionability_threshold", self.actionability_threshold),
            ("significance_alpha", self.significance_alpha),
        ] {
            if !(value > 0.0 && value < 1.0) {
                return Err(ConfigError::OutOfRange {
                    field,
                    value: value.to_string(),
                    reason: "must be strictly between 0 and 1",
                });
            }
        }

        for (field, value) in [
            ("specificity_threshold_pp", self.specificity_threshold_pp),
            ("variance_fallback_fraction", self.variance_fallback_fraction),
            ("negligible_effect", self.negligible_effect),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::OutOfRange {
                    field,
                    value: value.to_string(),
                    reason: "must be finite and non-negative",
                });
            }
        }

        Ok(())
    }
}

/// Settings for the CSV aggregation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub date_column: String,
    pub primary_metric: String,
    pub segment_columns: Vec<String>,
    pub lookback_days: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            date_column: "date".to_string(),
            primary_metric: "roas".to_string(),
            segment_columns: vec![
                "creative_type".to_string(),
                "platform".to_string(),
                "audience_type".to_string(),
            ],
            lookback_days: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub reports_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            reports_dir: "reports".to_string(),
        }
    }
}
