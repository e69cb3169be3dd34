//! Segment resolution: the first gate every hypothesis passes through.
//!
//! Resolution either yields both periods of a segment with adequate
//! samples, or fails with a [`HypothesisError`] before any statistic is
//! computed.

use adsight_core::{
    Hypothesis, HypothesisError, Period, SegmentDescriptor, SegmentStatistics, StatisticsSnapshot,
};

/// One side of a comparison, possibly pooled from several records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodSample {
    pub mean: f64,
    pub n: u64,
    pub variance: Option<f64>,
}

impl From<&SegmentStatistics> for PeriodSample {
    fn from(record: &SegmentStatistics) -> Self {
        Self {
            mean: record.mean,
            n: record.sample_size,
            variance: record.measured_variance(),
        }
    }
}

impl PeriodSample {
    /// Pools records into one sample.
    ///
    /// The pooled variance combines within-group and between-group sums of
    /// squares; it is `None` if any contributing record lacks a variance.
    /// Returns `None` when the records hold no observations.
    #[must_use]
    pub fn pooled<'a>(records: impl IntoIterator<Item = &'a SegmentStatistics>) -> Option<Self> {
        let members: Vec<Self> = records
            .into_iter()
            .map(Self::from)
            .filter(|s| s.n > 0)
            .collect();

        let total: u64 = members.iter().map(|s| s.n).sum();
        if total == 0 {
            return None;
        }

        let n = total as f64;
        let mean = members.iter().map(|s| s.n as f64 * s.mean).sum::<f64>() / n;

        let variance = if total < 2 {
            None
        } else {
            members
                .iter()
                .map(|s| {
                    s.variance.map(|v| {
                        let within = (s.n as f64 - 1.0) * v;
                        let between = s.n as f64 * (s.mean - mean).powi(2);
                        within + between
                    })
                })
                .sum::<Option<f64>>()
                .map(|ss| ss / (n - 1.0))
        };

        Some(Self {
            mean,
            n: total,
            variance,
        })
    }
}

/// A segment whose current and comparison records were both found.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedSegment<'a> {
    pub current: &'a SegmentStatistics,
    pub comparison: &'a SegmentStatistics,
}

impl ResolvedSegment<'_> {
    #[must_use]
    pub fn segment(&self) -> SegmentDescriptor {
        self.current.segment()
    }
}

/// Resolution failure. `matched` is set when the records exist but the
/// sample gate rejected them.
#[derive(Debug, Clone)]
pub struct Unresolved<'a> {
    pub error: HypothesisError,
    pub matched: Option<ResolvedSegment<'a>>,
}

impl From<HypothesisError> for Unresolved<'_> {
    fn from(error: HypothesisError) -> Self {
        Self {
            error,
            matched: None,
        }
    }
}

/// Looks up both periods of the affected segment and applies the
/// minimum-sample gate.
///
/// # Errors
/// Fails with `NotTestable`, `InvalidSegmentDescriptor`, `SegmentNotFound`
/// or `InsufficientSample`, checked in that order.
pub fn resolve_segment<'a>(
    hypothesis: &Hypothesis,
    snapshot: &'a StatisticsSnapshot,
    min_sample_size: u64,
) -> Result<ResolvedSegment<'a>, Unresolved<'a>> {
    if !hypothesis.testable {
        return Err(HypothesisError::NotTestable.into());
    }

    let segment = hypothesis.affected_segment.descriptor()?;
    let lookup = |period| {
        snapshot
            .get(&segment, period)
            .ok_or_else(|| HypothesisError::SegmentNotFound {
                segment: segment.to_string(),
                period,
            })
    };
    let current = lookup(Period::Current)?;
    let comparison = lookup(Period::Comparison)?;
    let resolved = ResolvedSegment {
        current,
        comparison,
    };

    if current.sample_size < min_sample_size || comparison.sample_size < min_sample_size {
        return Err(Unresolved {
            error: HypothesisError::InsufficientSample {
                segment: segment.to_string(),
                current_n: current.sample_size,
                comparison_n: comparison.sample_size,
                minimum: min_sample_size,
            },
            matched: Some(resolved),
        });
    }

    Ok(resolved)
}

/// Comparison segment used for the specificity check.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlGroup {
    pub label: String,
    pub current: PeriodSample,
    pub comparison: PeriodSample,
}

/// Why no control group could be formed. Recorded as a limitation tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlUnavailable {
    InvalidDescriptor,
    NotFound,
    NoComplement,
}

impl ControlUnavailable {
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::InvalidDescriptor => "invalid_control_segment",
            Self::NotFound => "control_segment_not_found",
            Self::NoComplement => "no_control_segment",
        }
    }
}

/// Resolves the explicit control segment, or pools every other value of the
/// affected dimension that has records in both periods, so the two pooled
/// periods always cover the same set of values.
///
/// # Errors
/// Returns the reason no usable control (at least two observations in each
/// period) exists.
pub fn resolve_control(
    hypothesis: &Hypothesis,
    affected: &SegmentDescriptor,
    snapshot: &StatisticsSnapshot,
) -> Result<ControlGroup, ControlUnavailable> {
    let usable = |s: &PeriodSample| s.n >= 2;

    if let Some(spec) = &hypothesis.control_segment {
        let control = spec
            .descriptor()
            .map_err(|_| ControlUnavailable::InvalidDescriptor)?;
        let current = snapshot
            .get(&control, Period::Current)
            .map(PeriodSample::from)
            .filter(usable)
            .ok_or(ControlUnavailable::NotFound)?;
        let comparison = snapshot
            .get(&control, Period::Comparison)
            .map(PeriodSample::from)
            .filter(usable)
            .ok_or(ControlUnavailable::NotFound)?;
        return Ok(ControlGroup {
            label: control.to_string(),
            current,
            comparison,
        });
    }

    let pool = |period: Period| {
        let other = period.other();
        let paired = snapshot
            .complement(affected, period)
            .filter(|record| snapshot.get(&record.segment(), other).is_some());
        PeriodSample::pooled(paired)
            .filter(usable)
            .ok_or(ControlUnavailable::NoComplement)
    };
    let current = pool(Period::Current)?;
    let comparison = pool(Period::Comparison)?;

    Ok(ControlGroup {
        label: format!("other {}", affected.dimension),
        current,
        comparison,
    })
}
