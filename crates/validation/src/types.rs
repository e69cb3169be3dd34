//! Core types for hypothesis validation results.

use adsight_core::HypothesisError;
use serde::{Deserialize, Serialize};

use crate::category::CompetingFactor;

/// Cohen's-d magnitude bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectMagnitude {
    /// |d| < 0.2
    Small,
    /// 0.2 <= |d| < 0.5
    Medium,
    /// 0.5 <= |d| < 0.8
    Large,
    /// |d| >= 0.8
    VeryLarge,
}

impl EffectMagnitude {
    #[must_use]
    pub fn from_cohens_d(d: f64) -> Self {
        let d = d.abs();
        if d < 0.2 {
            Self::Small
        } else if d < 0.5 {
            Self::Medium
        } else if d < 0.8 {
            Self::Large
        } else {
            Self::VeryLarge
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Large => "large",
            Self::VeryLarge => "very large",
        }
    }
}

/// Standardized mean difference between the two periods.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectSize {
    /// Signed Cohen's d, negative when the current period is lower
    pub cohens_d: f64,
    pub magnitude: EffectMagnitude,
}

impl EffectSize {
    #[must_use]
    pub fn from_cohens_d(cohens_d: f64) -> Self {
        Self {
            cohens_d,
            magnitude: EffectMagnitude::from_cohens_d(cohens_d),
        }
    }
}

/// Non-terminal data-quality warnings attached to a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Caveat {
    /// Variance was estimated by policy rather than measured.
    VarianceEstimated,
}

impl Caveat {
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::VarianceEstimated => "variance_estimated",
        }
    }
}

/// Type of statistical test performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    /// Welch two-sample t-test: H0: current mean = comparison mean
    MeanDifference,
    /// Pearson correlation: H0: rho = 0
    Correlation,
}

/// Outcome of one statistical test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestOutcome {
    pub test_name: String,
    pub kind: TestKind,
    /// What was compared, e.g. `creative_type=Image ctr (current vs comparison)`
    pub comparison: String,
    /// t statistic or correlation coefficient
    pub statistic: f64,
    /// Two-tailed p-value, `None` when the test could not run
    pub p_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degrees_of_freedom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect_size: Option<EffectSize>,
    /// p-value below the configured alpha
    pub significant: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub caveats: Vec<Caveat>,
}

impl TestOutcome {
    #[must_use]
    pub fn has_caveat(&self, caveat: Caveat) -> bool {
        self.caveats.contains(&caveat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeDirection {
    Decline,
    Increase,
    Flat,
}

/// Period-over-period change of the metric in the affected segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricChange {
    pub metric: String,
    pub current: f64,
    pub previous: f64,
    pub absolute_change: f64,
    /// `None` when the previous value is zero
    pub percent_change: Option<f64>,
    pub direction: ChangeDirection,
}

impl MetricChange {
    #[must_use]
    pub fn between(metric: impl Into<String>, current: f64, previous: f64) -> Self {
        let absolute_change = current - previous;
        let percent_change = if previous.abs() < f64::EPSILON {
            None
        } else {
            Some(absolute_change / previous.abs() * 100.0)
        };
        let direction = if current < previous {
            ChangeDirection::Decline
        } else if current > previous {
            ChangeDirection::Increase
        } else {
            ChangeDirection::Flat
        };

        Self {
            metric: metric.into(),
            current,
            previous,
            absolute_change,
            percent_change,
            direction,
        }
    }
}

/// Sample sizes behind the evidence and whether they clear the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleAdequacy {
    pub current_n: u64,
    pub previous_n: u64,
    pub minimum: u64,
    pub sufficient: bool,
}

impl SampleAdequacy {
    #[must_use]
    pub const fn new(current_n: u64, previous_n: u64, minimum: u64) -> Self {
        Self {
            current_n,
            previous_n,
            minimum,
            sufficient: current_n >= minimum && previous_n >= minimum,
        }
    }

    /// The smaller of the two period sizes.
    #[must_use]
    pub fn smallest(&self) -> u64 {
        self.current_n.min(self.previous_n)
    }
}

/// Affected vs control change, guarding against global trends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentSpecificity {
    pub affected_segment: String,
    pub control_segment: String,
    pub affected_percent_change: Option<f64>,
    pub control_percent_change: Option<f64>,
    /// affected minus control percent change, in percentage points
    pub differential_pp: Option<f64>,
    pub threshold_pp: f64,
    pub segment_specific: bool,
    /// Mean-difference test re-run on the control segment
    pub control_test: TestOutcome,
}

/// Numbers backing a hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantitativeEvidence {
    pub metric_change: MetricChange,
    pub sample_size: SampleAdequacy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_specificity: Option<SegmentSpecificity>,
}

impl QuantitativeEvidence {
    #[must_use]
    pub fn is_segment_specific(&self) -> bool {
        self.segment_specificity
            .as_ref()
            .is_some_and(|s| s.segment_specific)
    }
}

/// Rubric tier, ordered from least to most confident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl ConfidenceTier {
    /// Inclusive score band of the tier.
    #[must_use]
    pub const fn band(&self) -> (f64, f64) {
        match self {
            Self::Low => (0.0, 0.49),
            Self::Moderate => (0.50, 0.69),
            Self::High => (0.70, 0.89),
            Self::VeryHigh => (0.90, 1.0),
        }
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::VeryHigh => "very high",
        }
    }

    /// The tier one step up, `None` at the top.
    #[must_use]
    pub const fn next(&self) -> Option<Self> {
        match self {
            Self::Low => Some(Self::Moderate),
            Self::Moderate => Some(Self::High),
            Self::High => Some(Self::VeryHigh),
            Self::VeryHigh => None,
        }
    }
}

/// First unmet condition standing between a hypothesis and actionability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum RetryReason {
    /// The segment could not be resolved at all.
    SegmentUnresolved { detail: String },
    SampleSize { observed: u64, required: u64 },
    EffectSize {
        observed: Option<EffectMagnitude>,
        required: EffectMagnitude,
    },
    Significance { observed: Option<f64>, required: f64 },
    SegmentSpecificity {
        observed_pp: Option<f64>,
        required_pp: f64,
    },
    VarianceEstimated,
    /// Every rubric condition holds but the score is under the threshold.
    BelowThreshold { score: f64, threshold: f64 },
}

impl std::fmt::Display for RetryReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SegmentUnresolved { detail } => write!(f, "segment unresolved: {detail}"),
            Self::SampleSize { observed, required } => {
                write!(f, "sample size {observed} below {required} required")
            }
            Self::EffectSize { observed, required } => write!(
                f,
                "effect size {} below {} required",
                observed.map_or("negligible", |m| m.label()),
                required.label()
            ),
            Self::Significance { observed, required } => match observed {
                Some(p) => write!(f, "p-value {p:.4} not below {required}"),
                None => write!(f, "mean-difference test could not run"),
            },
            Self::SegmentSpecificity {
                observed_pp,
                required_pp,
            } => match observed_pp {
                Some(pp) => write!(
                    f,
                    "differential vs control {pp:.1}pp does not exceed {required_pp:.1}pp"
                ),
                None => write!(f, "no control segment to establish specificity"),
            },
            Self::VarianceEstimated => write!(f, "variance was estimated, not measured"),
            Self::BelowThreshold { score, threshold } => {
                write!(f, "confidence {score:.2} below threshold {threshold:.2}")
            }
        }
    }
}

/// Re-framing handed back to the hypothesis generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedAlternative {
    pub segment: String,
    pub competing_factor: CompetingFactor,
    /// Dimension to split the segment on when re-testing
    pub split_dimension: String,
    pub statement: String,
}

/// Advisory retry output. The engine never acts on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryAdvice {
    pub reason: RetryReason,
    pub issue: String,
    pub suggested_alternative: SuggestedAlternative,
    pub additional_analysis_needed: String,
}

/// Validation outcome for one hypothesis. Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub hypothesis_id: String,
    pub hypothesis: String,
    pub affected_segment: String,
    pub testable: bool,
    pub initial_confidence: f64,
    pub statistical_tests: Vec<TestOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantitative_evidence: Option<QuantitativeEvidence>,
    pub confidence_tier: ConfidenceTier,
    pub confidence_score: f64,
    pub confidence_rationale: String,
    pub limitations: Vec<String>,
    pub actionable: bool,
    pub recommended_action: String,
    pub retry_needed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryAdvice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<HypothesisError>,
}

impl ValidationResult {
    /// Reason the hypothesis needs a retry, if it does.
    #[must_use]
    pub fn retry_reason(&self) -> Option<&RetryReason> {
        self.retry.as_ref().map(|r| &r.reason)
    }
}
