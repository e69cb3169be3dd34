//! Advisory retry output for hypotheses below the actionability threshold.
//!
//! The policy only describes what is missing. Re-running hypothesis
//! generation is left to the caller.

use adsight_core::{Hypothesis, HypothesisError, ValidationConfig};

use crate::category::{CompetingFactor, HypothesisCategory};
use crate::scorer::{RubricInputs, HIGH_MIN_SAMPLE, HIGH_P, VERY_HIGH_MIN_SAMPLE, VERY_HIGH_P};
use crate::types::{ConfidenceTier, EffectMagnitude, RetryAdvice, RetryReason, SuggestedAlternative};

/// Conditions a tier demands, used to find the first one unmet.
struct TierRequirements {
    sample_size: u64,
    magnitude: EffectMagnitude,
    p_ceiling: f64,
    segment_specific: bool,
}

pub struct RetryPolicy<'a> {
    config: &'a ValidationConfig,
}

impl<'a> RetryPolicy<'a> {
    #[must_use]
    pub fn new(config: &'a ValidationConfig) -> Self {
        Self { config }
    }

    fn requirements(&self, tier: ConfidenceTier) -> TierRequirements {
        let alpha = self.config.significance_alpha;
        match tier {
            ConfidenceTier::VeryHigh => TierRequirements {
                sample_size: VERY_HIGH_MIN_SAMPLE,
                magnitude: EffectMagnitude::Large,
                p_ceiling: VERY_HIGH_P.min(alpha),
                segment_specific: true,
            },
            ConfidenceTier::High => TierRequirements {
                sample_size: HIGH_MIN_SAMPLE,
                magnitude: EffectMagnitude::Medium,
                p_ceiling: HIGH_P.min(alpha),
                segment_specific: false,
            },
            ConfidenceTier::Moderate | ConfidenceTier::Low => TierRequirements {
                sample_size: self.config.min_sample_size,
                magnitude: EffectMagnitude::Small,
                p_ceiling: alpha,
                segment_specific: false,
            },
        }
    }

    /// First unmet condition of the tier above `tier`, checked as sample
    /// size, effect size, significance, then segment specificity.
    #[must_use]
    pub fn reason(&self, inputs: &RubricInputs, tier: ConfidenceTier, score: f64) -> RetryReason {
        let below_threshold = RetryReason::BelowThreshold {
            score,
            threshold: self.config.actionability_threshold,
        };
        let Some(target) = tier.next() else {
            return below_threshold;
        };
        let needs = self.requirements(target);

        if inputs.sample_size < needs.sample_size {
            return RetryReason::SampleSize {
                observed: inputs.sample_size,
                required: needs.sample_size,
            };
        }

        let observed = inputs
            .effect
            .filter(|e| e.cohens_d.abs() >= self.config.negligible_effect)
            .map(|e| e.magnitude);
        if observed.map_or(true, |m| m < needs.magnitude) {
            return RetryReason::EffectSize {
                observed,
                required: needs.magnitude,
            };
        }

        if inputs.p_value.map_or(true, |p| p >= needs.p_ceiling) {
            return RetryReason::Significance {
                observed: inputs.p_value,
                required: needs.p_ceiling,
            };
        }

        if needs.segment_specific && !inputs.segment_specific {
            return RetryReason::SegmentSpecificity {
                observed_pp: inputs.differential_pp,
                required_pp: self.config.specificity_threshold_pp,
            };
        }

        if inputs.variance_estimated {
            return RetryReason::VarianceEstimated;
        }

        below_threshold
    }

    /// Reason for a hypothesis that never reached the battery.
    #[must_use]
    pub fn unresolved_reason(error: &HypothesisError) -> RetryReason {
        match error {
            HypothesisError::InsufficientSample {
                current_n,
                comparison_n,
                minimum,
                ..
            } => RetryReason::SampleSize {
                observed: (*current_n).min(*comparison_n),
                required: *minimum,
            },
            other => RetryReason::SegmentUnresolved {
                detail: other.to_string(),
            },
        }
    }

    /// Builds the advice record, or `None` when the score clears the threshold.
    #[must_use]
    pub fn advise(&self, hypothesis: &Hypothesis, score: f64, reason: RetryReason) -> Option<RetryAdvice> {
        if score >= self.config.actionability_threshold {
            return None;
        }

        Some(RetryAdvice {
            issue: reason.to_string(),
            additional_analysis_needed: additional_analysis(&reason).to_string(),
            suggested_alternative: suggest_alternative(hypothesis),
            reason,
        })
    }
}

fn additional_analysis(reason: &RetryReason) -> &'static str {
    match reason {
        RetryReason::SegmentUnresolved { .. } => {
            "Verify the segment exists in the aggregated statistics for both periods"
        }
        RetryReason::SampleSize { .. } => {
            "Extend the lookback window or widen the segment to collect more observations"
        }
        RetryReason::EffectSize { .. } => {
            "Check whether the change is material before investing in further tests"
        }
        RetryReason::Significance { .. } => {
            "Gather more data or narrow the segment to reduce noise"
        }
        RetryReason::SegmentSpecificity { .. } => {
            "Compare against a control segment to rule out an account-wide trend"
        }
        RetryReason::VarianceEstimated => "Supply measured variance or daily-level data for the segment",
        RetryReason::BelowThreshold { .. } => "Corroborate with a second metric before acting",
    }
}

/// Re-frames the hypothesis around the next competing factor.
fn suggest_alternative(hypothesis: &Hypothesis) -> SuggestedAlternative {
    let own = HypothesisCategory::classify(&hypothesis.hypothesis_text).factor();
    let (segment, dimension) = match hypothesis.affected_segment.descriptor() {
        Ok(descriptor) => (descriptor.to_string(), descriptor.dimension),
        Err(_) => (hypothesis.affected_segment.to_string(), String::new()),
    };
    let factor = CompetingFactor::next_after(own, &dimension);
    let own_label = own.map_or("the stated cause", |f| f.label());

    SuggestedAlternative {
        statement: format!(
            "Performance change in {segment} may be driven by {} rather than {own_label}: \
             compare {segment} split by {}",
            factor.label(),
            factor.dimension()
        ),
        segment,
        competing_factor: factor,
        split_dimension: factor.dimension().to_string(),
    }
}
