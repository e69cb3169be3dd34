use adsight_core::{
    Hypothesis, Period, SegmentDescriptor, SegmentStatistics, StatisticsSnapshot, ValidationConfig,
};
use adsight_validation::{
    ConfidenceScorer, ConfidenceTier, EffectSize, RubricInputs, RunSummary, ValidationOrchestrator,
};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

const MIN_PROPTEST_CASES: u32 = 256;
const VALUES: [&str; 4] = ["Image", "Video", "Carousel", "Story"];

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

fn is_two_decimal(score: f64) -> bool {
    ((score * 100.0).round() / 100.0 - score).abs() < 1e-12
}

/// One creative_type value with both periods; sizes span the sample gate.
fn segment_strategy(value: &'static str) -> impl Strategy<Value = Vec<SegmentStatistics>> {
    (
        0.001f64..0.05,
        0.001f64..0.05,
        2u64..600,
        2u64..600,
        prop::option::of(0.0005f64..0.02),
    )
        .prop_map(move |(current, comparison, n_current, n_comparison, sd)| {
            let segment = SegmentDescriptor::new("creative_type", value);
            let build = |period, mean, n| {
                let record = SegmentStatistics::new(&segment, period, "ctr", mean, n);
                match sd {
                    Some(sd) => record.with_standard_deviation(sd),
                    None => record,
                }
            };
            vec![
                build(Period::Current, current, n_current),
                build(Period::Comparison, comparison, n_comparison),
            ]
        })
}

fn snapshot_strategy() -> impl Strategy<Value = StatisticsSnapshot> {
    (
        segment_strategy(VALUES[0]),
        segment_strategy(VALUES[1]),
        segment_strategy(VALUES[2]),
    )
        .prop_map(|(a, b, c)| {
            StatisticsSnapshot::new(a.into_iter().chain(b).chain(c).collect())
                .expect("generated records are well-formed")
        })
}

/// Hypotheses over known and unknown values, in arbitrary order.
fn hypotheses_strategy() -> impl Strategy<Value = Vec<Hypothesis>> {
    prop::collection::vec(0usize..VALUES.len(), 1..8).prop_map(|picks| {
        picks
            .into_iter()
            .enumerate()
            .map(|(i, pick)| {
                Hypothesis::new(
                    format!("H{i}"),
                    format!("{} creative fatigue", VALUES[pick]),
                    SegmentDescriptor::new("creative_type", VALUES[pick]),
                    0.5,
                )
            })
            .collect()
    })
}

fn rubric_inputs(p: f64, d: f64, n: u64, specific: bool) -> RubricInputs {
    RubricInputs {
        p_value: Some(p),
        effect: Some(EffectSize::from_cohens_d(d)),
        sample_size: n,
        segment_specific: specific,
        differential_pp: None,
        variance_estimated: false,
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        .. ProptestConfig::default()
    })]

    #[test]
    fn scores_are_bounded_and_rounded(
        snapshot in snapshot_strategy(),
        hypotheses in hypotheses_strategy(),
    ) {
        let orchestrator = ValidationOrchestrator::new(ValidationConfig::default()).unwrap();
        let report = orchestrator.run(&hypotheses, &snapshot);

        for result in &report.validated_hypotheses {
            prop_assert!((0.0..=1.0).contains(&result.confidence_score));
            prop_assert!(is_two_decimal(result.confidence_score), "score {}", result.confidence_score);
            let (lo, hi) = result.confidence_tier.band();
            prop_assert!(result.confidence_score >= lo && result.confidence_score <= hi);
            if result.error.is_some() {
                prop_assert_eq!(result.confidence_score, 0.0);
                prop_assert!(!result.actionable);
            }
            if result.actionable {
                prop_assert!(result.confidence_tier >= ConfidenceTier::Moderate);
            }
            prop_assert_eq!(result.retry_needed, result.confidence_score < 0.6);
        }
    }

    #[test]
    fn summary_matches_recount(
        snapshot in snapshot_strategy(),
        hypotheses in hypotheses_strategy(),
    ) {
        let orchestrator = ValidationOrchestrator::new(ValidationConfig::default()).unwrap();
        let report = orchestrator.run(&hypotheses, &snapshot);

        prop_assert_eq!(RunSummary::from_results(&report.validated_hypotheses), report.summary);
        prop_assert_eq!(report.summary.total_hypotheses, hypotheses.len());
        let retries = report.validated_hypotheses.iter().filter(|r| r.retry_needed).count();
        prop_assert_eq!(report.retry_recommendations.len(), retries);
    }

    #[test]
    fn runs_are_idempotent(
        snapshot in snapshot_strategy(),
        hypotheses in hypotheses_strategy(),
    ) {
        let orchestrator = ValidationOrchestrator::new(ValidationConfig::default()).unwrap();
        let first = serde_json::to_string(&orchestrator.run(&hypotheses, &snapshot)).unwrap();
        let second = serde_json::to_string(&orchestrator.run(&hypotheses, &snapshot)).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn output_order_follows_input_order(
        snapshot in snapshot_strategy(),
        hypotheses in hypotheses_strategy(),
        rotation in 0usize..8,
    ) {
        let orchestrator = ValidationOrchestrator::new(ValidationConfig::default()).unwrap();
        let mut permuted = hypotheses.clone();
        permuted.rotate_left(rotation % hypotheses.len());
        permuted.reverse();

        let report = orchestrator.run(&permuted, &snapshot);
        let ids: Vec<_> = report.validated_hypotheses.iter().map(|r| r.hypothesis_id.clone()).collect();
        let expected: Vec<_> = permuted.iter().map(|h| h.id.clone()).collect();
        prop_assert_eq!(ids, expected);

        // Same hypothesis, same result, wherever it sits in the list
        let baseline = orchestrator.run(&hypotheses, &snapshot);
        for result in &report.validated_hypotheses {
            let original = baseline
                .validated_hypotheses
                .iter()
                .find(|r| r.hypothesis_id == result.hypothesis_id)
                .unwrap();
            prop_assert_eq!(original, result);
        }
    }

    #[test]
    fn smaller_p_never_lowers_score(
        p_high in 1e-12f64..1.0,
        shrink in 0.0f64..1.0,
        d in -2.0f64..2.0,
        n in 2u64..1000,
        specific in any::<bool>(),
    ) {
        let config = ValidationConfig::default();
        let scorer = ConfidenceScorer::new(&config);
        let p_low = p_high * shrink;

        let weaker = scorer.score(scorer.evaluate(&rubric_inputs(p_high, d, n, specific)));
        let stronger = scorer.score(scorer.evaluate(&rubric_inputs(p_low, d, n, specific)));

        prop_assert!(stronger.tier >= weaker.tier);
        prop_assert!(
            stronger.score >= weaker.score,
            "p {} -> {} but score {} -> {}",
            p_high, p_low, weaker.score, stronger.score
        );
    }

    #[test]
    fn larger_effect_never_lowers_score(
        p in 1e-12f64..1.0,
        d_small in 0.0f64..2.0,
        grow in 0.0f64..1.0,
        n in 2u64..1000,
        specific in any::<bool>(),
    ) {
        let config = ValidationConfig::default();
        let scorer = ConfidenceScorer::new(&config);
        let d_large = d_small + grow;

        let weaker = scorer.score(scorer.evaluate(&rubric_inputs(p, d_small, n, specific)));
        let stronger = scorer.score(scorer.evaluate(&rubric_inputs(p, d_large, n, specific)));

        prop_assert!(stronger.score >= weaker.score);
    }
}
