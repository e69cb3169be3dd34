//! Segment statistics and the immutable snapshot the engine validates against.
//!
//! A snapshot is handed over by the data loader fully built; once
//! [`StatisticsSnapshot::new`] accepts it, every record is known to be
//! well-formed and lookups cannot fail structurally.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{HypothesisError, StructuralInputError};

/// Which side of the period comparison a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    /// The window under investigation.
    Current,
    /// The baseline window it is compared against.
    Comparison,
}

impl Period {
    /// The opposite side of the comparison.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Current => Self::Comparison,
            Self::Comparison => Self::Current,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => f.write_str("current"),
            Self::Comparison => f.write_str("comparison"),
        }
    }
}

/// A named slice of data, e.g. `creative_type=Image`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentDescriptor {
    pub dimension: String,
    pub value: String,
}

impl SegmentDescriptor {
    #[must_use]
    pub fn new(dimension: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            value: value.into(),
        }
    }

    /// Parses the `dimension=value` form used by hypothesis generators.
    ///
    /// Surrounding whitespace is trimmed from both halves.
    ///
    /// # Errors
    /// Returns [`HypothesisError::InvalidSegmentDescriptor`] when there is no
    /// `=` or either half is empty.
    pub fn parse(raw: &str) -> Result<Self, HypothesisError> {
        let (dimension, value) = raw
            .split_once('=')
            .ok_or_else(|| HypothesisError::InvalidSegmentDescriptor {
                descriptor: raw.to_string(),
            })?;
        let (dimension, value) = (dimension.trim(), value.trim());
        if dimension.is_empty() || value.is_empty() {
            return Err(HypothesisError::InvalidSegmentDescriptor {
                descriptor: raw.to_string(),
            });
        }
        Ok(Self::new(dimension, value))
    }
}

impl fmt::Display for SegmentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.dimension, self.value)
    }
}

/// Paired observations of a continuous covariate and the metric,
/// e.g. days since creative launch against daily CTR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovariateSeries {
    pub name: String,
    pub covariate: Vec<f64>,
    pub metric: Vec<f64>,
}

/// Aggregated metric for one segment in one period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentStatistics {
    pub dimension: String,
    pub value: String,
    pub period: Period,
    pub metric_name: String,
    pub mean: f64,
    pub sample_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub standard_deviation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covariate: Option<CovariateSeries>,
}

impl SegmentStatistics {
    #[must_use]
    pub fn new(
        segment: &SegmentDescriptor,
        period: Period,
        metric_name: impl Into<String>,
        mean: f64,
        sample_size: u64,
    ) -> Self {
        Self {
            dimension: segment.dimension.clone(),
            value: segment.value.clone(),
            period,
            metric_name: metric_name.into(),
            mean,
            sample_size,
            variance: None,
            standard_deviation: None,
            covariate: None,
        }
    }

    #[must_use]
    pub fn with_variance(mut self, variance: f64) -> Self {
        self.variance = Some(variance);
        self
    }

    #[must_use]
    pub fn with_standard_deviation(mut self, standard_deviation: f64) -> Self {
        self.standard_deviation = Some(standard_deviation);
        self
    }

    #[must_use]
    pub fn with_covariate(mut self, covariate: CovariateSeries) -> Self {
        self.covariate = Some(covariate);
        self
    }

    #[must_use]
    pub fn segment(&self) -> SegmentDescriptor {
        SegmentDescriptor::new(&self.dimension, &self.value)
    }

    /// Measured variance, preferring an explicit variance over a squared
    /// standard deviation. `None` when neither was supplied.
    #[must_use]
    pub fn measured_variance(&self) -> Option<f64> {
        self.variance
            .or_else(|| self.standard_deviation.map(|sd| sd * sd))
    }

    fn check(&self, index: usize) -> Result<(), StructuralInputError> {
        if self.dimension.trim().is_empty() || self.value.trim().is_empty() {
            return Err(StructuralInputError::EmptySegment { index });
        }
        if self.metric_name.trim().is_empty() {
            return Err(StructuralInputError::EmptyMetricName { index });
        }
        if !self.mean.is_finite() {
            return Err(StructuralInputError::NonFiniteMean {
                index,
                mean: self.mean,
            });
        }
        for (field, value) in [
            ("variance", self.variance),
            ("standard_deviation", self.standard_deviation),
        ] {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(StructuralInputError::InvalidDispersion {
                        index,
                        field,
                        value,
                    });
                }
            }
        }
        if let Some(series) = &self.covariate {
            if series.covariate.len() != series.metric.len() {
                return Err(StructuralInputError::CovariateLengthMismatch {
                    index,
                    covariate: series.covariate.len(),
                    metric: series.metric.len(),
                });
            }
            if series
                .covariate
                .iter()
                .chain(series.metric.iter())
                .any(|v| !v.is_finite())
            {
                return Err(StructuralInputError::NonFiniteCovariate { index });
            }
        }
        Ok(())
    }
}

/// Wire form of a snapshot: `{"segments": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDocument {
    pub segments: Vec<SegmentStatistics>,
}

/// Closed, validated set of segment statistics for one metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SnapshotDocument", into = "SnapshotDocument")]
pub struct StatisticsSnapshot {
    metric_name: Option<String>,
    records: BTreeMap<(SegmentDescriptor, Period), SegmentStatistics>,
}

impl StatisticsSnapshot {
    /// Validates and indexes a list of records.
    ///
    /// # Errors
    /// Returns a [`StructuralInputError`] for the first malformed record,
    /// a duplicate key, or records describing different metrics.
    pub fn new(records: Vec<SegmentStatistics>) -> Result<Self, StructuralInputError> {
        let mut metric_name: Option<String> = None;
        let mut indexed = BTreeMap::new();

        for (index, record) in records.into_iter().enumerate() {
            record.check(index)?;

            match &metric_name {
                None => metric_name = Some(record.metric_name.clone()),
                Some(expected) if *expected != record.metric_name => {
                    return Err(StructuralInputError::MixedMetrics {
                        index,
                        expected: expected.clone(),
                        found: record.metric_name.clone(),
                    });
                }
                Some(_) => {}
            }

            let key = (record.segment(), record.period);
            if indexed.contains_key(&key) {
                return Err(StructuralInputError::DuplicateKey {
                    segment: key.0.to_string(),
                    period: key.1,
                });
            }
            indexed.insert(key, record);
        }

        tracing::debug!(
            records = indexed.len(),
            metric = metric_name.as_deref().unwrap_or("-"),
            "Indexed statistics snapshot"
        );

        Ok(Self {
            metric_name,
            records: indexed,
        })
    }

    /// Parses and validates a JSON document of the form `{"segments": [...]}`.
    ///
    /// # Errors
    /// Returns [`StructuralInputError::Malformed`] when required fields are
    /// missing or mistyped, or any validation error from [`Self::new`].
    pub fn from_json(json: &str) -> Result<Self, StructuralInputError> {
        let repr: SnapshotDocument = serde_json::from_str(json)
            .map_err(|e| StructuralInputError::Malformed(e.to_string()))?;
        Self::new(repr.segments)
    }

    /// Metric shared by every record, `None` for an empty snapshot.
    #[must_use]
    pub fn metric_name(&self) -> Option<&str> {
        self.metric_name.as_deref()
    }

    #[must_use]
    pub fn get(&self, segment: &SegmentDescriptor, period: Period) -> Option<&SegmentStatistics> {
        self.records.get(&(segment.clone(), period))
    }

    /// Records of every other value on the same dimension, for one period.
    pub fn complement<'a>(
        &'a self,
        segment: &'a SegmentDescriptor,
        period: Period,
    ) -> impl Iterator<Item = &'a SegmentStatistics> + 'a {
        self.records
            .iter()
            .filter(move |((key, key_period), _)| {
                *key_period == period
                    && key.dimension == segment.dimension
                    && key.value != segment.value
            })
            .map(|(_, record)| record)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SegmentStatistics> {
        self.records.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TryFrom<SnapshotDocument> for StatisticsSnapshot {
    type Error = StructuralInputError;

    fn try_from(repr: SnapshotDocument) -> Result<Self, Self::Error> {
        Self::new(repr.segments)
    }
}

impl From<StatisticsSnapshot> for SnapshotDocument {
    fn from(snapshot: StatisticsSnapshot) -> Self {
        Self {
            segments: snapshot.records.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> SegmentDescriptor {
        SegmentDescriptor::new("creative_type", "Image")
    }

    fn record(value: &str, period: Period, mean: f64, n: u64) -> SegmentStatistics {
        SegmentStatistics::new(
            &SegmentDescriptor::new("creative_type", value),
            period,
            "ctr",
            mean,
            n,
        )
    }

    // ============================================
    // SegmentDescriptor Tests
    // ============================================

    #[test]
    fn parse_splits_dimension_and_value() {
        let segment = SegmentDescriptor::parse("creative_type=Image").unwrap();
        assert_eq!(segment, image());

        let segment = SegmentDescriptor::parse(" platform = Facebook ").unwrap();
        assert_eq!(segment, SegmentDescriptor::new("platform", "Facebook"));
    }

    #[test]
    fn parse_rejects_missing_separator_or_empty_halves() {
        assert!(SegmentDescriptor::parse("Image").is_err());
        assert!(SegmentDescriptor::parse("=Image").is_err());
        assert!(SegmentDescriptor::parse("creative_type=").is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        let segment = SegmentDescriptor::new("audience_type", "Lookalike");
        assert_eq!(
            SegmentDescriptor::parse(&segment.to_string()).unwrap(),
            segment
        );
    }

    // ============================================
    // SegmentStatistics Tests
    // ============================================

    #[test]
    fn measured_variance_prefers_variance_over_std() {
        let r = record("Image", Period::Current, 0.01, 100)
            .with_variance(4.0)
            .with_standard_deviation(3.0);
        assert_eq!(r.measured_variance(), Some(4.0));

        let r = record("Image", Period::Current, 0.01, 100).with_standard_deviation(3.0);
        assert_eq!(r.measured_variance(), Some(9.0));

        let r = record("Image", Period::Current, 0.01, 100);
        assert_eq!(r.measured_variance(), None);
    }

    // ============================================
    // StatisticsSnapshot Tests
    // ============================================

    #[test]
    fn snapshot_indexes_by_segment_and_period() {
        let snapshot = StatisticsSnapshot::new(vec![
            record("Image", Period::Current, 0.0142, 245),
            record("Image", Period::Comparison, 0.0189, 238),
        ])
        .unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.metric_name(), Some("ctr"));
        let current = snapshot.get(&image(), Period::Current).unwrap();
        assert_eq!(current.sample_size, 245);
        assert!(snapshot
            .get(&SegmentDescriptor::new("creative_type", "Video"), Period::Current)
            .is_none());
    }

    #[test]
    fn snapshot_rejects_duplicate_keys() {
        let result = StatisticsSnapshot::new(vec![
            record("Image", Period::Current, 0.0142, 245),
            record("Image", Period::Current, 0.0150, 100),
        ]);
        assert!(matches!(
            result,
            Err(StructuralInputError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn snapshot_rejects_mixed_metrics() {
        let mut other = record("Video", Period::Current, 3.2, 50);
        other.metric_name = "roas".to_string();
        let result = StatisticsSnapshot::new(vec![record("Image", Period::Current, 0.01, 50), other]);
        assert!(matches!(
            result,
            Err(StructuralInputError::MixedMetrics { index: 1, .. })
        ));
    }

    #[test]
    fn snapshot_rejects_non_finite_mean_and_negative_variance() {
        let result = StatisticsSnapshot::new(vec![record("Image", Period::Current, f64::NAN, 50)]);
        assert!(matches!(
            result,
            Err(StructuralInputError::NonFiniteMean { index: 0, .. })
        ));

        let result = StatisticsSnapshot::new(vec![
            record("Image", Period::Current, 0.01, 50).with_variance(-1.0)
        ]);
        assert!(matches!(
            result,
            Err(StructuralInputError::InvalidDispersion {
                field: "variance",
                ..
            })
        ));
    }

    #[test]
    fn snapshot_rejects_mismatched_covariate() {
        let series = CovariateSeries {
            name: "days_since_launch".to_string(),
            covariate: vec![1.0, 2.0, 3.0],
            metric: vec![0.01, 0.02],
        };
        let result = StatisticsSnapshot::new(vec![
            record("Image", Period::Current, 0.01, 50).with_covariate(series)
        ]);
        assert!(matches!(
            result,
            Err(StructuralInputError::CovariateLengthMismatch { .. })
        ));
    }

    #[test]
    fn complement_returns_other_values_on_same_dimension() {
        let mut platform = SegmentStatistics::new(
            &SegmentDescriptor::new("platform", "Facebook"),
            Period::Current,
            "ctr",
            0.02,
            80,
        );
        platform.variance = Some(0.0001);
        let snapshot = StatisticsSnapshot::new(vec![
            record("Image", Period::Current, 0.0142, 245),
            record("Video", Period::Current, 0.0180, 300),
            record("Carousel", Period::Current, 0.0160, 120),
            record("Video", Period::Comparison, 0.0185, 290),
            platform,
        ])
        .unwrap();

        let image = image();
        let mut values: Vec<_> = snapshot
            .complement(&image, Period::Current)
            .map(|r| r.value.as_str())
            .collect();
        values.sort_unstable();
        assert_eq!(values, vec!["Carousel", "Video"]);
    }

    #[test]
    fn from_json_maps_missing_fields_to_malformed() {
        let json = r#"{"segments": [{"dimension": "creative_type", "value": "Image"}]}"#;
        let result = StatisticsSnapshot::from_json(json);
        assert!(matches!(result, Err(StructuralInputError::Malformed(_))));
    }

    #[test]
    fn snapshot_serializes_as_segment_list() {
        let snapshot = StatisticsSnapshot::new(vec![
            record("Image", Period::Current, 0.0142, 245).with_variance(0.000_04)
        ])
        .unwrap();

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.starts_with("{\"segments\":["), "json was {json}");

        let parsed = StatisticsSnapshot::from_json(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
