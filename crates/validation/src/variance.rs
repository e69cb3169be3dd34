//! Working variance for segments that arrive without a measured one.
//!
//! Estimating variance degrades data quality: any test that runs on an
//! estimate carries [`Caveat::VarianceEstimated`](crate::Caveat) and the
//! scorer caps its tier at low.

use adsight_core::SegmentStatistics;

/// Fallback applied when a record carries neither variance nor standard deviation.
pub trait VariancePolicy: Send + Sync {
    /// Short identifier recorded in logs.
    fn name(&self) -> &'static str;

    /// Working variance for a record with the given mean.
    fn estimate(&self, mean: f64) -> f64;
}

/// Standard deviation taken as a fixed fraction of |mean|, i.e. an assumed
/// coefficient of variation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FractionOfMean {
    fraction: f64,
}

impl FractionOfMean {
    #[must_use]
    pub const fn new(fraction: f64) -> Self {
        Self { fraction }
    }
}

impl VariancePolicy for FractionOfMean {
    fn name(&self) -> &'static str {
        "fraction_of_mean"
    }

    fn estimate(&self, mean: f64) -> f64 {
        let sd = self.fraction * mean.abs();
        sd * sd
    }
}

/// Variance used for testing, and whether it was measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkingVariance {
    pub variance: f64,
    pub estimated: bool,
}

impl WorkingVariance {
    #[must_use]
    pub fn measured_or_estimated(
        measured: Option<f64>,
        mean: f64,
        policy: &dyn VariancePolicy,
    ) -> Self {
        match measured {
            Some(variance) => Self {
                variance,
                estimated: false,
            },
            None => Self {
                variance: policy.estimate(mean),
                estimated: true,
            },
        }
    }

    #[must_use]
    pub fn for_record(record: &SegmentStatistics, policy: &dyn VariancePolicy) -> Self {
        Self::measured_or_estimated(record.measured_variance(), record.mean, policy)
    }
}
