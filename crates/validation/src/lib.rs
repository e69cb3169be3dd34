//! Hypothesis validation engine.
//!
//! Takes candidate explanations for a campaign performance change and a
//! closed snapshot of per-segment statistics, and returns one scored,
//! explained result per hypothesis:
//!
//! - [`resolve`]: segment lookup and the minimum-sample gate
//! - [`battery`]: Welch test, effect size, correlation and specificity check
//! - [`scorer`]: the confidence rubric and actionability
//! - [`retry`]: advisory re-framing for low-confidence hypotheses
//! - [`orchestrator`]: runs the above per hypothesis and aggregates
//! - [`report`]: the report and its run summary
//!
//! # Example
//!
//! ```
//! use adsight_core::{Hypothesis, Period, SegmentDescriptor, SegmentStatistics, ValidationConfig};
//! use adsight_validation::ValidationOrchestrator;
//!
//! let image = SegmentDescriptor::new("creative_type", "Image");
//! let records = vec![
//!     SegmentStatistics::new(&image, Period::Current, "ctr", 0.0142, 245)
//!         .with_standard_deviation(0.004),
//!     SegmentStatistics::new(&image, Period::Comparison, "ctr", 0.0189, 238)
//!         .with_standard_deviation(0.004),
//! ];
//! let hypotheses = [Hypothesis::new("H1", "Image creative fatigue", image, 0.7)];
//!
//! let orchestrator = ValidationOrchestrator::new(ValidationConfig::default()).unwrap();
//! let report = orchestrator.validate(&hypotheses, records).unwrap();
//!
//! assert_eq!(report.summary.total_hypotheses, 1);
//! assert!(report.validated_hypotheses[0].confidence_score > 0.0);
//! ```

pub mod battery;
pub mod category;
pub mod orchestrator;
pub mod report;
pub mod resolve;
pub mod retry;
pub mod scorer;
pub mod types;
pub mod variance;

pub use battery::{BatteryOutput, TestBattery};
pub use category::{CompetingFactor, HypothesisCategory};
pub use orchestrator::{RunStage, ValidationOrchestrator};
pub use report::{RetryRecommendation, RunSummary, ValidationReport};
pub use resolve::{resolve_control, resolve_segment, ControlGroup, PeriodSample, ResolvedSegment};
pub use retry::RetryPolicy;
pub use scorer::{ConfidenceScorer, LowCause, RubricInputs, RubricOutcome, ScoredConfidence};
pub use types::{
    Caveat, ChangeDirection, ConfidenceTier, EffectMagnitude, EffectSize, MetricChange,
    QuantitativeEvidence, RetryAdvice, RetryReason, SampleAdequacy, SegmentSpecificity,
    SuggestedAlternative, TestKind, TestOutcome, ValidationResult,
};
pub use variance::{FractionOfMean, VariancePolicy, WorkingVariance};
