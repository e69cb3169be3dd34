//! Validation report handed to the rendering collaborator.
//!
//! The summary is always recounted from the result list by
//! [`RunSummary::from_results`]; nothing maintains it incrementally.

use serde::{Deserialize, Serialize};

use crate::types::{ConfidenceTier, SuggestedAlternative, ValidationResult};

/// Counts over one run's results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_hypotheses: usize,
    /// High and very-high tiers
    pub high_confidence: usize,
    /// Moderate tier
    pub medium_confidence: usize,
    pub low_confidence: usize,
    pub actionable_insights: usize,
}

impl RunSummary {
    #[must_use]
    pub fn from_results(results: &[ValidationResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, result| {
            summary.total_hypotheses += 1;
            match result.confidence_tier {
                ConfidenceTier::VeryHigh | ConfidenceTier::High => summary.high_confidence += 1,
                ConfidenceTier::Moderate => summary.medium_confidence += 1,
                ConfidenceTier::Low => summary.low_confidence += 1,
            }
            if result.actionable {
                summary.actionable_insights += 1;
            }
            summary
        })
    }
}

/// Retry entry for one hypothesis with `retry_needed = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryRecommendation {
    pub hypothesis_id: String,
    pub issue: String,
    pub suggested_alternative: SuggestedAlternative,
    pub additional_analysis_needed: String,
}

impl RetryRecommendation {
    fn from_result(result: &ValidationResult) -> Option<Self> {
        if !result.retry_needed {
            return None;
        }
        let advice = result.retry.as_ref()?;
        Some(Self {
            hypothesis_id: result.hypothesis_id.clone(),
            issue: advice.issue.clone(),
            suggested_alternative: advice.suggested_alternative.clone(),
            additional_analysis_needed: advice.additional_analysis_needed.clone(),
        })
    }
}

/// Output of one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Metric the snapshot describes, `None` for an empty snapshot
    pub metric: Option<String>,
    /// One result per input hypothesis, in input order
    pub validated_hypotheses: Vec<ValidationResult>,
    pub summary: RunSummary,
    pub retry_recommendations: Vec<RetryRecommendation>,
}

impl ValidationReport {
    /// Builds the report, deriving the summary and retry list from `results`.
    #[must_use]
    pub fn from_results(metric: Option<String>, results: Vec<ValidationResult>) -> Self {
        let summary = RunSummary::from_results(&results);
        let retry_recommendations = results
            .iter()
            .filter_map(RetryRecommendation::from_result)
            .collect();

        Self {
            metric,
            validated_hypotheses: results,
            summary,
            retry_recommendations,
        }
    }

    /// Results ordered by confidence, highest first. Ties keep input order.
    #[must_use]
    pub fn ranked(&self) -> Vec<&ValidationResult> {
        let mut ranked: Vec<&ValidationResult> = self.validated_hypotheses.iter().collect();
        ranked.sort_by(|a, b| b.confidence_score.total_cmp(&a.confidence_score));
        ranked
    }

    /// Serializes the report as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Converts the report to a human-readable text format.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "=== Hypothesis Validation Report: {} ===\n\n",
            self.metric.as_deref().unwrap_or("no data")
        ));

        output.push_str("--- Summary ---\n");
        output.push_str(&format!("Hypotheses: {}\n", self.summary.total_hypotheses));
        output.push_str(&format!("High Confidence: {}\n", self.summary.high_confidence));
        output.push_str(&format!("Medium Confidence: {}\n", self.summary.medium_confidence));
        output.push_str(&format!("Low Confidence: {}\n", self.summary.low_confidence));
        output.push_str(&format!("Actionable: {}\n\n", self.summary.actionable_insights));

        for result in self.ranked() {
            output.push_str(&format!(
                "--- [{}] {} ---\n",
                result.hypothesis_id, result.hypothesis
            ));
            output.push_str(&format!("Segment: {}\n", result.affected_segment));
            output.push_str(&format!(
                "Confidence: {:.2} ({})\n",
                result.confidence_score,
                result.confidence_tier.label()
            ));
            output.push_str(&format!("Rationale: {}\n", result.confidence_rationale));

            for test in &result.statistical_tests {
                let p = test
                    .p_value
                    .map_or_else(|| "n/a".to_string(), |p| format!("{p:.4}"));
                output.push_str(&format!(
                    "  {}: statistic={:.4}, p={p}",
                    test.test_name, test.statistic
                ));
                if let Some(effect) = test.effect_size {
                    output.push_str(&format!(
                        ", d={:.2} ({})",
                        effect.cohens_d,
                        effect.magnitude.label()
                    ));
                }
                output.push('\n');
            }

            if let Some(specificity) = result
                .quantitative_evidence
                .as_ref()
                .and_then(|e| e.segment_specificity.as_ref())
            {
                if let Some(pp) = specificity.differential_pp {
                    output.push_str(&format!(
                        "  vs {}: {pp:+.1}pp ({})\n",
                        specificity.control_segment,
                        if specificity.segment_specific {
                            "segment-specific"
                        } else {
                            "not specific"
                        }
                    ));
                }
            }

            output.push_str(&format!(
                "Actionable: {}\n",
                if result.actionable { "Yes" } else { "No" }
            ));
            output.push_str(&format!("Action: {}\n\n", result.recommended_action));
        }

        if !self.retry_recommendations.is_empty() {
            output.push_str("--- Retry Recommendations ---\n");
            for retry in &self.retry_recommendations {
                output.push_str(&format!("[{}] {}\n", retry.hypothesis_id, retry.issue));
                output.push_str(&format!(
                    "  Alternative: {}\n",
                    retry.suggested_alternative.statement
                ));
                output.push_str(&format!("  Next: {}\n", retry.additional_analysis_needed));
            }
        }

        output
    }
}
