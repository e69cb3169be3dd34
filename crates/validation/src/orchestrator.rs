//! Drives a validation run over a closed statistics snapshot.
//!
//! Each hypothesis is reduced independently to a [`ValidationResult`]; the
//! summary is a single recount over the finished list.

use std::fmt;

use adsight_core::{
    ConfigError, Hypothesis, HypothesisError, SegmentStatistics, StatisticsSnapshot,
    StructuralInputError, ValidationConfig,
};
use tracing::{debug, info, trace, warn};

use crate::battery::{TestBattery, EXTERNAL_FACTORS, LIMITED_DIMENSIONS};
use crate::category::{recommended_action, HypothesisCategory};
use crate::report::ValidationReport;
use crate::resolve::{resolve_segment, Unresolved};
use crate::retry::RetryPolicy;
use crate::scorer::{ConfidenceScorer, RubricInputs};
use crate::types::{MetricChange, QuantitativeEvidence, SampleAdequacy, ValidationResult};
use crate::variance::{FractionOfMean, VariancePolicy};

/// Stages of a run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunStage {
    Start,
    ResolveSegments,
    RunBattery,
    Score,
    Aggregate,
    Done,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::ResolveSegments => "resolve_segments",
            Self::RunBattery => "run_battery",
            Self::Score => "score",
            Self::Aggregate => "aggregate",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Validates hypotheses against segment statistics.
pub struct ValidationOrchestrator {
    config: ValidationConfig,
    variance_policy: Box<dyn VariancePolicy>,
}

impl fmt::Debug for ValidationOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationOrchestrator")
            .field("config", &self.config)
            .field("variance_policy", &self.variance_policy.name())
            .finish()
    }
}

impl ValidationOrchestrator {
    /// Creates an orchestrator with the fraction-of-mean variance fallback.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the configuration is out of range.
    pub fn new(config: ValidationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let variance_policy = Box::new(FractionOfMean::new(config.variance_fallback_fraction));
        Ok(Self {
            config,
            variance_policy,
        })
    }

    /// Replaces the variance fallback.
    #[must_use]
    pub fn with_variance_policy(mut self, policy: Box<dyn VariancePolicy>) -> Self {
        self.variance_policy = policy;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validates raw records, failing the run only if they are structurally
    /// invalid.
    ///
    /// # Errors
    /// Returns [`StructuralInputError`] when the records cannot form a snapshot.
    pub fn validate(
        &self,
        hypotheses: &[Hypothesis],
        records: Vec<SegmentStatistics>,
    ) -> Result<ValidationReport, StructuralInputError> {
        let snapshot = StatisticsSnapshot::new(records)?;
        Ok(self.run(hypotheses, &snapshot))
    }

    /// Validates every hypothesis in input order. Per-hypothesis failures are
    /// captured in their results and never abort the run.
    #[must_use]
    pub fn run(&self, hypotheses: &[Hypothesis], snapshot: &StatisticsSnapshot) -> ValidationReport {
        enter(RunStage::Start);
        info!(
            hypotheses = hypotheses.len(),
            records = snapshot.len(),
            metric = snapshot.metric_name().unwrap_or("-"),
            "Starting validation run"
        );

        let results: Vec<ValidationResult> = hypotheses
            .iter()
            .map(|h| self.validate_one(h, snapshot))
            .collect();

        enter(RunStage::Aggregate);
        let report = ValidationReport::from_results(
            snapshot.metric_name().map(str::to_string),
            results,
        );

        enter(RunStage::Done);
        info!(
            total = report.summary.total_hypotheses,
            high = report.summary.high_confidence,
            medium = report.summary.medium_confidence,
            low = report.summary.low_confidence,
            actionable = report.summary.actionable_insights,
            retries = report.retry_recommendations.len(),
            "Validation run complete"
        );

        report
    }

    /// Reduces one hypothesis to its result.
    #[must_use]
    pub fn validate_one(&self, hypothesis: &Hypothesis, snapshot: &StatisticsSnapshot) -> ValidationResult {
        enter(RunStage::ResolveSegments);
        let resolved = match resolve_segment(hypothesis, snapshot, self.config.min_sample_size) {
            Ok(resolved) => resolved,
            Err(unresolved) => return self.short_circuit(hypothesis, unresolved),
        };

        enter(RunStage::RunBattery);
        let battery = TestBattery::new(&self.config, self.variance_policy.as_ref());
        let output = battery.run(hypothesis, &resolved, snapshot);

        enter(RunStage::Score);
        let scorer = ConfidenceScorer::new(&self.config);
        let inputs = RubricInputs::from_battery(&output);
        let scored = scorer.score(scorer.evaluate(&inputs));

        let retry_needed = scored.score < self.config.actionability_threshold;
        let policy = RetryPolicy::new(&self.config);
        let retry = policy.advise(
            hypothesis,
            scored.score,
            policy.reason(&inputs, scored.tier, scored.score),
        );

        let category = HypothesisCategory::classify(&hypothesis.hypothesis_text);
        debug!(
            id = %hypothesis.id,
            segment = %resolved.segment(),
            tier = scored.tier.label(),
            score = scored.score,
            actionable = scored.actionable,
            "Scored hypothesis"
        );

        ValidationResult {
            hypothesis_id: hypothesis.id.clone(),
            hypothesis: hypothesis.hypothesis_text.clone(),
            affected_segment: resolved.segment().to_string(),
            testable: true,
            initial_confidence: hypothesis.initial_confidence,
            statistical_tests: output.tests,
            quantitative_evidence: Some(output.evidence),
            confidence_tier: scored.tier,
            confidence_score: scored.score,
            confidence_rationale: scored.rationale,
            limitations: output.limitations,
            actionable: scored.actionable,
            recommended_action: recommended_action(category, scored.actionable).to_string(),
            retry_needed,
            retry,
            error: None,
        }
    }

    /// Fixed zero-confidence result for a hypothesis that failed resolution.
    fn short_circuit(&self, hypothesis: &Hypothesis, unresolved: Unresolved<'_>) -> ValidationResult {
        let Unresolved { error, matched } = unresolved;
        warn!(
            id = %hypothesis.id,
            reason = error.tag(),
            "{error}"
        );

        // Evidence is only shown when the records exist but are too small
        let quantitative_evidence = match (&error, matched) {
            (HypothesisError::InsufficientSample { .. }, Some(found)) => Some(QuantitativeEvidence {
                metric_change: MetricChange::between(
                    found.current.metric_name.as_str(),
                    found.current.mean,
                    found.comparison.mean,
                ),
                sample_size: SampleAdequacy::new(
                    found.current.sample_size,
                    found.comparison.sample_size,
                    self.config.min_sample_size,
                ),
                segment_specificity: None,
            }),
            _ => None,
        };

        let scored = ConfidenceScorer::new(&self.config).insufficient_data(error.to_string());
        let policy = RetryPolicy::new(&self.config);
        let retry = policy.advise(hypothesis, scored.score, RetryPolicy::unresolved_reason(&error));

        ValidationResult {
            hypothesis_id: hypothesis.id.clone(),
            hypothesis: hypothesis.hypothesis_text.clone(),
            affected_segment: hypothesis.affected_segment.to_string(),
            testable: false,
            initial_confidence: hypothesis.initial_confidence,
            statistical_tests: Vec::new(),
            quantitative_evidence,
            confidence_tier: scored.tier,
            confidence_score: scored.score,
            confidence_rationale: scored.rationale,
            limitations: vec![
                LIMITED_DIMENSIONS.to_string(),
                EXTERNAL_FACTORS.to_string(),
                error.tag().to_string(),
            ],
            actionable: false,
            recommended_action: recommended_action(HypothesisCategory::Other, false).to_string(),
            retry_needed: true,
            retry,
            error: Some(error),
        }
    }
}

fn enter(stage: RunStage) {
    trace!(stage = %stage, "Entering stage");
}
