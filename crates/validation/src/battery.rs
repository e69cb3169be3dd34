//! The fixed sequence of statistical tests run on a resolved segment.
//!
//! Order: mean difference (with effect size), correlation when a covariate
//! series is present, then the specificity check against a control.

use adsight_core::stats::{
    cohens_d, correlation_p_value, pearson_correlation, welch_t_test, SampleSummary,
};
use adsight_core::{Hypothesis, StatisticsSnapshot, ValidationConfig};
use tracing::warn;

use crate::resolve::{resolve_control, ControlGroup, PeriodSample, ResolvedSegment};
use crate::types::{
    Caveat, EffectSize, MetricChange, QuantitativeEvidence, SampleAdequacy, SegmentSpecificity,
    TestKind, TestOutcome,
};
use crate::variance::{VariancePolicy, WorkingVariance};

pub const LIMITED_DIMENSIONS: &str = "limited_to_available_dimensions";
pub const EXTERNAL_FACTORS: &str = "external_factors_not_modeled";

/// Everything the battery produced for one hypothesis.
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryOutput {
    /// Mean-difference test first, then the optional correlation
    pub tests: Vec<TestOutcome>,
    pub evidence: QuantitativeEvidence,
    pub limitations: Vec<String>,
}

impl BatteryOutput {
    /// The mean-difference test on the affected segment.
    #[must_use]
    pub fn primary(&self) -> Option<&TestOutcome> {
        self.tests
            .iter()
            .find(|t| t.kind == TestKind::MeanDifference)
    }
}

/// Runs the statistical tests for a resolved segment.
pub struct TestBattery<'a> {
    config: &'a ValidationConfig,
    policy: &'a dyn VariancePolicy,
}

impl<'a> TestBattery<'a> {
    #[must_use]
    pub fn new(config: &'a ValidationConfig, policy: &'a dyn VariancePolicy) -> Self {
        Self { config, policy }
    }

    /// Runs every applicable test on the affected segment.
    ///
    /// # Arguments
    /// * `hypothesis` - Hypothesis under test, consulted for its control segment
    /// * `resolved` - Current and comparison records of the affected segment
    /// * `snapshot` - Full snapshot, used to resolve the control
    #[must_use]
    pub fn run(
        &self,
        hypothesis: &Hypothesis,
        resolved: &ResolvedSegment<'_>,
        snapshot: &StatisticsSnapshot,
    ) -> BatteryOutput {
        let segment = resolved.segment();
        let metric = resolved.current.metric_name.as_str();
        let mut limitations = vec![LIMITED_DIMENSIONS.to_string(), EXTERNAL_FACTORS.to_string()];

        let current = PeriodSample::from(resolved.current);
        let comparison = PeriodSample::from(resolved.comparison);
        let primary = self.mean_difference(
            format!("{segment} {metric} (current vs comparison)"),
            &current,
            &comparison,
        );
        if primary.has_caveat(Caveat::VarianceEstimated) {
            warn!(
                segment = %segment,
                policy = self.policy.name(),
                "Variance estimated for affected segment"
            );
            limitations.push(Caveat::VarianceEstimated.tag().to_string());
        }

        let mut tests = vec![primary];
        if let Some(correlation) = self.correlation(resolved) {
            tests.push(correlation);
        }

        let metric_change = MetricChange::between(metric, current.mean, comparison.mean);
        let segment_specificity = match resolve_control(hypothesis, &segment, snapshot) {
            Ok(control) => Some(self.specificity(&segment.to_string(), &metric_change, &control)),
            Err(unavailable) => {
                limitations.push(unavailable.tag().to_string());
                None
            }
        };

        BatteryOutput {
            tests,
            evidence: QuantitativeEvidence {
                metric_change,
                sample_size: SampleAdequacy::new(
                    current.n,
                    comparison.n,
                    self.config.min_sample_size,
                ),
                segment_specificity,
            },
            limitations,
        }
    }

    /// Welch test plus Cohen's d between the two periods of one segment.
    fn mean_difference(
        &self,
        comparison_label: String,
        current: &PeriodSample,
        comparison: &PeriodSample,
    ) -> TestOutcome {
        let current_var =
            WorkingVariance::measured_or_estimated(current.variance, current.mean, self.policy);
        let comparison_var = WorkingVariance::measured_or_estimated(
            comparison.variance,
            comparison.mean,
            self.policy,
        );

        let a = SampleSummary::new(current.mean, current_var.variance, current.n);
        let b = SampleSummary::new(comparison.mean, comparison_var.variance, comparison.n);

        // Effect size is reported whether or not the test is significant
        let effect_size = EffectSize::from_cohens_d(cohens_d(&a, &b));
        let welch = welch_t_test(&a, &b);
        let p_value = welch.map(|w| w.p_value);

        let mut caveats = Vec::new();
        if current_var.estimated || comparison_var.estimated {
            caveats.push(Caveat::VarianceEstimated);
        }

        TestOutcome {
            test_name: "welch_t_test".to_string(),
            kind: TestKind::MeanDifference,
            comparison: comparison_label,
            statistic: welch.map_or(0.0, |w| w.statistic),
            p_value,
            degrees_of_freedom: welch.map(|w| w.degrees_of_freedom),
            effect_size: Some(effect_size),
            significant: p_value.is_some_and(|p| p < self.config.significance_alpha),
            caveats,
        }
    }

    /// Pearson test against the covariate series of the current period, if any.
    /// A constant series leaves r undefined, reported as a test that could
    /// not run.
    fn correlation(&self, resolved: &ResolvedSegment<'_>) -> Option<TestOutcome> {
        let series = resolved.current.covariate.as_ref()?;
        let r = pearson_correlation(&series.covariate, &series.metric);
        let p_value = r.and_then(|r| correlation_p_value(r, series.covariate.len()));

        Some(TestOutcome {
            test_name: "pearson_correlation".to_string(),
            kind: TestKind::Correlation,
            comparison: format!("{} vs {}", series.name, resolved.current.metric_name),
            statistic: r.unwrap_or(0.0),
            p_value,
            degrees_of_freedom: p_value.and_then(|_| {
                series.covariate.len().checked_sub(2).map(|df| df as f64)
            }),
            effect_size: None,
            significant: p_value.is_some_and(|p| p < self.config.significance_alpha),
            caveats: Vec::new(),
        })
    }

    /// Re-runs the mean-difference test on the control and compares the
    /// relative changes.
    fn specificity(
        &self,
        affected: &str,
        affected_change: &MetricChange,
        control: &ControlGroup,
    ) -> SegmentSpecificity {
        let control_test = self.mean_difference(
            format!(
                "{} {} (current vs comparison)",
                control.label, affected_change.metric
            ),
            &control.current,
            &control.comparison,
        );
        let control_change = MetricChange::between(
            affected_change.metric.as_str(),
            control.current.mean,
            control.comparison.mean,
        );

        let affected_pct = affected_change.percent_change;
        let control_pct = control_change.percent_change;
        let differential_pp = affected_pct.zip(control_pct).map(|(a, c)| a - c);
        let segment_specific = affected_pct
            .zip(control_pct)
            .is_some_and(|(a, c)| a.abs() - c.abs() > self.config.specificity_threshold_pp);

        SegmentSpecificity {
            affected_segment: affected.to_string(),
            control_segment: control.label.clone(),
            affected_percent_change: affected_pct,
            control_percent_change: control_pct,
            differential_pp,
            threshold_pp: self.config.specificity_threshold_pp,
            segment_specific,
            control_test,
        }
    }
}
