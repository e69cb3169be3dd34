//! Error types for hypothesis validation.
//!
//! Errors are split by blast radius: [`HypothesisError`] is terminal for a
//! single hypothesis and is captured into that hypothesis's result, while
//! [`StructuralInputError`] and [`ConfigError`] abort the whole run.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::segment::Period;

/// Per-hypothesis failures. Never abort a validation run.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HypothesisError {
    /// No statistics record matches the affected segment.
    #[error("segment not found: {segment} ({period} period)")]
    SegmentNotFound {
        /// Segment in `dimension=value` form.
        segment: String,
        /// The period with no matching record.
        period: Period,
    },

    /// A match exists but one of the periods is below the minimum sample size.
    #[error(
        "insufficient sample for {segment}: current n={current_n}, comparison n={comparison_n}, minimum {minimum}"
    )]
    InsufficientSample {
        /// Segment in `dimension=value` form.
        segment: String,
        /// Current-period sample size.
        current_n: u64,
        /// Comparison-period sample size.
        comparison_n: u64,
        /// Configured minimum.
        minimum: u64,
    },

    /// The affected segment could not be parsed as `dimension=value`.
    #[error("invalid segment descriptor: {descriptor}")]
    InvalidSegmentDescriptor {
        /// The raw text as received.
        descriptor: String,
    },

    /// The hypothesis was flagged untestable by its producer.
    #[error("hypothesis marked untestable")]
    NotTestable,
}

impl HypothesisError {
    /// Short machine-readable tag recorded in result limitations.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::SegmentNotFound { .. } => "segment_not_found",
            Self::InsufficientSample { .. } => "insufficient_sample",
            Self::InvalidSegmentDescriptor { .. } => "invalid_segment_descriptor",
            Self::NotTestable => "not_testable",
        }
    }
}

/// Malformed statistics input. Fatal for the entire run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructuralInputError {
    /// The statistics document could not be parsed.
    #[error("malformed statistics input: {0}")]
    Malformed(String),

    /// A record has an empty dimension or value.
    #[error("record {index}: segment dimension and value must be non-empty")]
    EmptySegment {
        /// Position of the record in the input list.
        index: usize,
    },

    /// A record has an empty metric name.
    #[error("record {index}: metric name must be non-empty")]
    EmptyMetricName {
        /// Position of the record in the input list.
        index: usize,
    },

    /// Records disagree on the metric they describe.
    #[error("record {index}: metric '{found}' does not match snapshot metric '{expected}'")]
    MixedMetrics {
        /// Position of the record in the input list.
        index: usize,
        /// Metric of the first record.
        expected: String,
        /// Metric of the offending record.
        found: String,
    },

    /// The mean is NaN or infinite.
    #[error("record {index}: mean must be finite, got {mean}")]
    NonFiniteMean {
        /// Position of the record in the input list.
        index: usize,
        /// The offending value.
        mean: f64,
    },

    /// Variance or standard deviation is negative or non-finite.
    #[error("record {index}: {field} must be finite and non-negative, got {value}")]
    InvalidDispersion {
        /// Position of the record in the input list.
        index: usize,
        /// `variance` or `standard_deviation`.
        field: &'static str,
        /// The offending value.
        value: f64,
    },

    /// Two records share the same (dimension, value, period) key.
    #[error("duplicate statistics record for {segment} ({period} period)")]
    DuplicateKey {
        /// Segment in `dimension=value` form.
        segment: String,
        /// Period of the duplicate.
        period: Period,
    },

    /// Covariate and metric series have different lengths.
    #[error("record {index}: covariate has {covariate} values but metric series has {metric}")]
    CovariateLengthMismatch {
        /// Position of the record in the input list.
        index: usize,
        /// Covariate length.
        covariate: usize,
        /// Metric series length.
        metric: usize,
    },

    /// A covariate series contains NaN or infinite values.
    #[error("record {index}: covariate series contains non-finite values")]
    NonFiniteCovariate {
        /// Position of the record in the input list.
        index: usize,
    },
}

/// Invalid engine configuration. Fatal for the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A value is outside its permitted range.
    #[error("invalid config value for {field}: {value} ({reason})")]
    OutOfRange {
        /// Config field name.
        field: &'static str,
        /// Offending value, formatted.
        value: String,
        /// Accepted range.
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hypothesis_error_tags_are_distinct() {
        let errors = [
            HypothesisError::SegmentNotFound {
                segment: "creative_type=Image".to_string(),
                period: Period::Current,
            },
            HypothesisError::InsufficientSample {
                segment: "creative_type=Image".to_string(),
                current_n: 12,
                comparison_n: 40,
                minimum: 20,
            },
            HypothesisError::InvalidSegmentDescriptor {
                descriptor: "Image".to_string(),
            },
            HypothesisError::NotTestable,
        ];

        let mut tags: Vec<_> = errors.iter().map(HypothesisError::tag).collect();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), errors.len());
    }

    #[test]
    fn insufficient_sample_message_names_both_periods() {
        let err = HypothesisError::InsufficientSample {
            segment: "platform=Instagram".to_string(),
            current_n: 12,
            comparison_n: 40,
            minimum: 20,
        };

        let message = err.to_string();
        assert!(message.contains("current n=12"), "message was {message}");
        assert!(message.contains("comparison n=40"), "message was {message}");
    }

    #[test]
    fn hypothesis_error_serializes_with_kind_tag() {
        let err = HypothesisError::SegmentNotFound {
            segment: "creative_type=Carousel".to_string(),
            period: Period::Comparison,
        };

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"kind\":\"segment_not_found\""), "json was {json}");
        assert!(json.contains("\"period\":\"comparison\""), "json was {json}");
    }
}
