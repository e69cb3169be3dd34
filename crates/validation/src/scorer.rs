//! Deterministic confidence rubric.
//!
//! [`ConfidenceScorer::evaluate`] picks the tier top-down and records which
//! branch fired as a [`RubricOutcome`]. The score and the rationale text
//! are both derived from that single value, so they cannot disagree.

use adsight_core::ValidationConfig;

use crate::battery::BatteryOutput;
use crate::types::{Caveat, ConfidenceTier, EffectMagnitude, EffectSize};

/// Strict p ceiling for the very-high tier.
pub const VERY_HIGH_P: f64 = 0.001;
/// Strict p ceiling for the high tier.
pub const HIGH_P: f64 = 0.01;
/// Minimum observations per period for the very-high tier.
pub const VERY_HIGH_MIN_SAMPLE: u64 = 100;
/// Minimum observations per period for the high tier.
pub const HIGH_MIN_SAMPLE: u64 = 30;

/// |d| at which the effect contributes full strength to interpolation.
const FULL_EFFECT: f64 = 1.2;
/// Lower log anchor for p-values in the top band.
const P_FLOOR: f64 = 1e-9;

/// Facts the rubric looks at, extracted from the battery output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RubricInputs {
    pub p_value: Option<f64>,
    pub effect: Option<EffectSize>,
    /// Smaller of the two period sample sizes
    pub sample_size: u64,
    pub segment_specific: bool,
    pub differential_pp: Option<f64>,
    pub variance_estimated: bool,
}

impl RubricInputs {
    #[must_use]
    pub fn from_battery(output: &BatteryOutput) -> Self {
        let primary = output.primary();
        Self {
            p_value: primary.and_then(|t| t.p_value),
            effect: primary.and_then(|t| t.effect_size),
            sample_size: output.evidence.sample_size.smallest(),
            segment_specific: output.evidence.is_segment_specific(),
            differential_pp: output
                .evidence
                .segment_specificity
                .as_ref()
                .and_then(|s| s.differential_pp),
            variance_estimated: primary.is_some_and(|t| t.has_caveat(Caveat::VarianceEstimated)),
        }
    }
}

/// Why a tested hypothesis landed in the low tier. Variants are listed in
/// the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LowCause {
    TestNotRun,
    SmallSample { observed: u64, required: u64 },
    NegligibleEffect { cohens_d: f64 },
    NotSignificant { p_value: f64, alpha: f64 },
    VarianceEstimated { p_value: f64 },
}

/// Which rubric branch fired.
#[derive(Debug, Clone, PartialEq)]
pub enum RubricOutcome {
    VeryHigh {
        p_value: f64,
        effect: EffectSize,
        sample_size: u64,
    },
    High {
        p_value: f64,
        effect: EffectSize,
        sample_size: u64,
        segment_specific: bool,
    },
    Moderate {
        p_value: f64,
        effect: EffectSize,
    },
    Low {
        cause: LowCause,
        p_value: Option<f64>,
        effect: Option<EffectSize>,
    },
    /// Resolution failed; no test was run.
    InsufficientData { detail: String },
}

impl RubricOutcome {
    #[must_use]
    pub const fn tier(&self) -> ConfidenceTier {
        match self {
            Self::VeryHigh { .. } => ConfidenceTier::VeryHigh,
            Self::High { .. } => ConfidenceTier::High,
            Self::Moderate { .. } => ConfidenceTier::Moderate,
            Self::Low { .. } | Self::InsufficientData { .. } => ConfidenceTier::Low,
        }
    }

    /// Human-readable explanation of the branch.
    #[must_use]
    pub fn rationale(&self) -> String {
        match self {
            Self::VeryHigh {
                p_value,
                effect,
                sample_size,
            } => format!(
                "Very high confidence: p={p_value:.4} with a {} effect (d={:.2}), \
                 specific to the segment against its control, on {sample_size}+ observations per period",
                effect.magnitude.label(),
                effect.cohens_d
            ),
            Self::High {
                p_value,
                effect,
                sample_size,
                segment_specific,
            } => {
                let mut text = format!(
                    "High confidence: p={p_value:.4} with a {} effect (d={:.2}) on {sample_size}+ observations per period",
                    effect.magnitude.label(),
                    effect.cohens_d
                );
                if !segment_specific {
                    text.push_str("; change not shown to be specific to the segment");
                }
                text
            }
            Self::Moderate { p_value, effect } => format!(
                "Moderate confidence: significant at p={p_value:.4} with a {} effect (d={:.2})",
                effect.magnitude.label(),
                effect.cohens_d
            ),
            Self::Low { cause, .. } => match cause {
                LowCause::TestNotRun => {
                    "Low confidence: mean-difference test could not run (zero variance)".to_string()
                }
                LowCause::SmallSample { observed, required } => format!(
                    "Low confidence: only {observed} observations in the smaller period, {required} required"
                ),
                LowCause::NegligibleEffect { cohens_d } => {
                    format!("Low confidence: effect is negligible (d={cohens_d:.3})")
                }
                LowCause::NotSignificant { p_value, alpha } => {
                    format!("Low confidence: not significant (p={p_value:.4}, alpha={alpha})")
                }
                LowCause::VarianceEstimated { p_value } => format!(
                    "Low confidence: variance was estimated rather than measured, \
                     tier capped regardless of p={p_value:.4}"
                ),
            },
            Self::InsufficientData { detail } => {
                format!("Not testable: insufficient data ({detail})")
            }
        }
    }
}

/// Tier, score and derived text for one hypothesis.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredConfidence {
    pub outcome: RubricOutcome,
    pub tier: ConfidenceTier,
    pub score: f64,
    pub rationale: String,
    pub actionable: bool,
}

/// Applies the rubric with the configured alpha, sample floor and
/// actionability threshold.
pub struct ConfidenceScorer<'a> {
    config: &'a ValidationConfig,
}

impl<'a> ConfidenceScorer<'a> {
    #[must_use]
    pub fn new(config: &'a ValidationConfig) -> Self {
        Self { config }
    }

    fn is_negligible(&self, effect: &EffectSize) -> bool {
        effect.cohens_d.abs() < self.config.negligible_effect
    }

    /// Evaluates the rubric top-down; the first tier whose conditions all
    /// hold wins.
    #[must_use]
    pub fn evaluate(&self, inputs: &RubricInputs) -> RubricOutcome {
        let alpha = self.config.significance_alpha;

        let low = |cause| RubricOutcome::Low {
            cause,
            p_value: inputs.p_value,
            effect: inputs.effect,
        };

        let (Some(p_value), Some(effect)) = (inputs.p_value, inputs.effect) else {
            return low(LowCause::TestNotRun);
        };
        if inputs.sample_size < self.config.min_sample_size {
            return low(LowCause::SmallSample {
                observed: inputs.sample_size,
                required: self.config.min_sample_size,
            });
        }
        if self.is_negligible(&effect) {
            return low(LowCause::NegligibleEffect {
                cohens_d: effect.cohens_d,
            });
        }
        if p_value >= alpha {
            return low(LowCause::NotSignificant { p_value, alpha });
        }
        if inputs.variance_estimated {
            return low(LowCause::VarianceEstimated { p_value });
        }

        if p_value < VERY_HIGH_P.min(alpha)
            && effect.magnitude >= EffectMagnitude::Large
            && inputs.segment_specific
            && inputs.sample_size >= VERY_HIGH_MIN_SAMPLE
        {
            return RubricOutcome::VeryHigh {
                p_value,
                effect,
                sample_size: VERY_HIGH_MIN_SAMPLE,
            };
        }

        if p_value < HIGH_P.min(alpha)
            && effect.magnitude >= EffectMagnitude::Medium
            && inputs.sample_size >= HIGH_MIN_SAMPLE
        {
            return RubricOutcome::High {
                p_value,
                effect,
                sample_size: HIGH_MIN_SAMPLE,
                segment_specific: inputs.segment_specific,
            };
        }

        RubricOutcome::Moderate { p_value, effect }
    }

    /// Scores a rubric outcome inside its tier's band.
    ///
    /// The position in the band is the mean of a p-value strength (log
    /// position between the tier's p ceiling and floor) and an effect
    /// strength (|d| / 1.2, capped at 1). Both are monotonic, so a smaller
    /// p or a larger effect never lowers the score.
    #[must_use]
    pub fn score(&self, outcome: RubricOutcome) -> ScoredConfidence {
        let tier = outcome.tier();
        let alpha = self.config.significance_alpha;

        let (p_value, effect, ceiling, floor) = match &outcome {
            RubricOutcome::InsufficientData { .. } => (None, None, 1.0, alpha),
            RubricOutcome::VeryHigh { p_value, effect, .. } => {
                (Some(*p_value), Some(*effect), VERY_HIGH_P.min(alpha), P_FLOOR)
            }
            RubricOutcome::High { p_value, effect, .. } => (
                Some(*p_value),
                Some(*effect),
                HIGH_P.min(alpha),
                VERY_HIGH_P.min(alpha),
            ),
            RubricOutcome::Moderate { p_value, effect } => {
                (Some(*p_value), Some(*effect), alpha, HIGH_P.min(alpha))
            }
            RubricOutcome::Low {
                p_value, effect, ..
            } => (*p_value, *effect, 1.0, alpha),
        };

        let score = if matches!(outcome, RubricOutcome::InsufficientData { .. }) {
            0.0
        } else {
            let p_strength = p_value.map_or(0.0, |p| log_position(p, ceiling, floor));
            let effect_strength = effect.map_or(0.0, |e| (e.cohens_d.abs() / FULL_EFFECT).min(1.0));
            let strength = 0.5 * p_strength + 0.5 * effect_strength;
            let (lo, hi) = tier.band();
            round2(lo + (hi - lo) * strength)
        };

        let actionable = tier >= ConfidenceTier::Moderate
            && score >= self.config.actionability_threshold;

        ScoredConfidence {
            rationale: outcome.rationale(),
            outcome,
            tier,
            score,
            actionable,
        }
    }

    /// Zero-confidence result for a hypothesis that never reached the battery.
    #[must_use]
    pub fn insufficient_data(&self, detail: impl Into<String>) -> ScoredConfidence {
        self.score(RubricOutcome::InsufficientData {
            detail: detail.into(),
        })
    }
}

/// Position of `p` between `ceiling` (0.0) and `floor` (1.0) on a log scale.
fn log_position(p: f64, ceiling: f64, floor: f64) -> f64 {
    if ceiling <= floor || p <= 0.0 {
        return 1.0;
    }
    let position = (ceiling.ln() - p.ln()) / (ceiling.ln() - floor.ln());
    position.clamp(0.0, 1.0)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
