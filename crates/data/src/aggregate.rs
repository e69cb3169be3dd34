//! Per-segment aggregation of campaign rows into a statistics snapshot.

use std::collections::BTreeMap;

use adsight_core::{CovariateSeries, Period, SegmentDescriptor, SegmentStatistics, StatisticsSnapshot};
use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::campaign::CampaignTable;
use crate::window::PeriodWindows;

pub const DAY_COVARIATE: &str = "days_since_period_start";
/// Distinct days needed before a covariate series is attached.
const MIN_COVARIATE_DAYS: usize = 3;

#[derive(Default)]
struct Accumulator {
    values: Vec<f64>,
    by_day: BTreeMap<i64, (f64, usize)>,
}

impl Accumulator {
    fn push(&mut self, value: f64, day: Option<i64>) {
        self.values.push(value);
        if let Some(day) = day {
            let entry = self.by_day.entry(day).or_insert((0.0, 0));
            entry.0 += value;
            entry.1 += 1;
        }
    }

    fn into_statistics(
        self,
        segment: &SegmentDescriptor,
        period: Period,
        metric: &str,
    ) -> SegmentStatistics {
        let n = self.values.len();
        let mean = self.values.iter().sum::<f64>() / n as f64;
        let mut stats = SegmentStatistics::new(segment, period, metric, mean, n as u64);

        if n >= 2 {
            let variance = self
                .values
                .iter()
                .map(|v| (v - mean).powi(2))
                .sum::<f64>()
                / (n as f64 - 1.0);
            stats = stats.with_variance(variance);
        }

        if period == Period::Current && self.by_day.len() >= MIN_COVARIATE_DAYS {
            let (covariate, daily): (Vec<f64>, Vec<f64>) = self
                .by_day
                .iter()
                .map(|(day, (sum, count))| (*day as f64, sum / *count as f64))
                .unzip();
            stats = stats.with_covariate(CovariateSeries {
                name: DAY_COVARIATE.to_string(),
                covariate,
                metric: daily,
            });
        }

        stats
    }
}

/// Aggregates campaign rows into per-segment statistics for both periods.
///
/// # Arguments
/// * `table` - Parsed campaign rows
/// * `windows` - Current and comparison date windows
/// * `metric` - Metric column to aggregate (`roas` may be derived)
/// * `segment_columns` - Dimensions to segment by
///
/// # Returns
/// A validated snapshot with one record per (dimension, value, period)
///
/// # Errors
/// Returns error if the metric or a segment column is missing
pub fn aggregate_segments(
    table: &CampaignTable,
    windows: &PeriodWindows,
    metric: &str,
    segment_columns: &[String],
) -> Result<StatisticsSnapshot> {
    let source = table.metric_source(metric)?;
    for column in segment_columns {
        if !table.has_column(column) {
            bail!("CSV has no segment column '{column}'");
        }
    }

    let mut groups: BTreeMap<(SegmentDescriptor, Period), Accumulator> = BTreeMap::new();
    let mut outside_windows = 0usize;
    let mut missing_metric = 0usize;

    for record in table.records() {
        let Some(period) = windows.period_of(record.date) else {
            outside_windows += 1;
            continue;
        };
        let Some(value) = source.value(record) else {
            missing_metric += 1;
            continue;
        };
        let day = match period {
            Period::Current => windows.current.offset_of(record.date),
            Period::Comparison => None,
        };

        for column in segment_columns {
            if let Some(segment_value) = record.segment(column) {
                groups
                    .entry((SegmentDescriptor::new(column.as_str(), segment_value), period))
                    .or_default()
                    .push(value, day);
            }
        }
    }

    debug!(
        outside_windows,
        missing_metric,
        "Skipped rows during aggregation"
    );

    let records: Vec<SegmentStatistics> = groups
        .into_iter()
        .map(|((segment, period), acc)| acc.into_statistics(&segment, period, metric))
        .collect();

    let snapshot =
        StatisticsSnapshot::new(records).context("Aggregated statistics failed validation")?;
    info!(
        metric,
        segments = snapshot.len(),
        current_start = %windows.current.start,
        current_end = %windows.current.end,
        "Aggregated segment statistics"
    );

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn csv() -> String {
        let mut csv = String::from("date,creative_type,platform,spend,revenue,ctr\n");
        for d in 1..=14u32 {
            // Image declines through the current week, Video holds steady
            let image_ctr = if d <= 7 { 0.019 } else { 0.019 - 0.001 * f64::from(d - 7) };
            csv.push_str(&format!("2025-03-{d:02},Image,Facebook,100,250,{image_ctr}\n"));
            csv.push_str(&format!("2025-03-{d:02},Video,Instagram,100,300,0.018\n"));
        }
        csv
    }

    fn columns() -> Vec<String> {
        vec!["creative_type".to_string(), "platform".to_string()]
    }

    // ============================================
    // Aggregation Tests
    // ============================================

    #[test]
    fn aggregates_each_dimension_and_period() {
        let table = CampaignTable::from_reader(csv().as_bytes(), "date").unwrap();
        let windows = PeriodWindows::trailing(day(14), 7).unwrap();

        let snapshot = aggregate_segments(&table, &windows, "ctr", &columns()).unwrap();

        // 2 creative types + 2 platforms, 2 periods each
        assert_eq!(snapshot.len(), 8);
        assert_eq!(snapshot.metric_name(), Some("ctr"));

        let image = SegmentDescriptor::new("creative_type", "Image");
        let current = snapshot.get(&image, Period::Current).unwrap();
        assert_eq!(current.sample_size, 7);
        assert!((current.mean - 0.015).abs() < 1e-12, "mean was {}", current.mean);
        assert!(current.variance.unwrap() > 0.0);

        let comparison = snapshot.get(&image, Period::Comparison).unwrap();
        assert!((comparison.mean - 0.019).abs() < 1e-12);
        assert!(comparison.covariate.is_none());
    }

    #[test]
    fn current_period_carries_day_covariate() {
        let table = CampaignTable::from_reader(csv().as_bytes(), "date").unwrap();
        let windows = PeriodWindows::trailing(day(14), 7).unwrap();

        let snapshot = aggregate_segments(&table, &windows, "ctr", &columns()).unwrap();
        let image = SegmentDescriptor::new("creative_type", "Image");
        let series = snapshot
            .get(&image, Period::Current)
            .and_then(|s| s.covariate.as_ref())
            .unwrap();

        assert_eq!(series.name, DAY_COVARIATE);
        assert_eq!(series.covariate, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert!(series.metric[0] > series.metric[6]);
    }

    #[test]
    fn derived_roas_when_column_absent() {
        let table = CampaignTable::from_reader(csv().as_bytes(), "date").unwrap();
        let windows = PeriodWindows::trailing(day(14), 7).unwrap();

        let snapshot = aggregate_segments(&table, &windows, "roas", &columns()).unwrap();
        let video = SegmentDescriptor::new("creative_type", "Video");
        let current = snapshot.get(&video, Period::Current).unwrap();

        assert!((current.mean - 3.0).abs() < 1e-12);
        assert_eq!(current.variance, Some(0.0));
    }

    #[test]
    fn rows_outside_windows_are_ignored() {
        let table = CampaignTable::from_reader(csv().as_bytes(), "date").unwrap();
        let windows = PeriodWindows::trailing(day(14), 3).unwrap();

        let snapshot = aggregate_segments(&table, &windows, "ctr", &columns()).unwrap();
        let video = SegmentDescriptor::new("creative_type", "Video");

        assert_eq!(snapshot.get(&video, Period::Current).unwrap().sample_size, 3);
        assert_eq!(snapshot.get(&video, Period::Comparison).unwrap().sample_size, 3);
    }

    #[test]
    fn missing_segment_column_is_an_error() {
        let table = CampaignTable::from_reader(csv().as_bytes(), "date").unwrap();
        let windows = PeriodWindows::trailing(day(14), 7).unwrap();

        let err = aggregate_segments(&table, &windows, "ctr", &["audience_type".to_string()])
            .unwrap_err();

        assert!(err.to_string().contains("audience_type"));
    }
}
