use adsight_core::Period;
use anyhow::{ensure, Context, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Whole days from the window start, `None` outside the window.
    #[must_use]
    pub fn offset_of(&self, date: NaiveDate) -> Option<i64> {
        self.contains(date)
            .then(|| (date - self.start).num_days())
    }
}

/// Current window and the comparison window immediately before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodWindows {
    pub current: TimeWindow,
    pub comparison: TimeWindow,
}

impl PeriodWindows {
    /// The last `lookback_days` days ending at `max_date`, and the equally
    /// long window before them.
    ///
    /// # Errors
    /// Returns error if `lookback_days` is zero, or if either window would
    /// start before the earliest representable date
    pub fn trailing(max_date: NaiveDate, lookback_days: u32) -> Result<Self> {
        ensure!(lookback_days > 0, "lookback_days must be at least 1");
        let span = Duration::days(i64::from(lookback_days) - 1);
        let out_of_range =
            || format!("lookback of {lookback_days} days from {max_date} precedes representable dates");

        let current_start = max_date.checked_sub_signed(span).with_context(out_of_range)?;
        let comparison_end = current_start
            .checked_sub_signed(Duration::days(1))
            .with_context(out_of_range)?;
        let comparison_start = comparison_end
            .checked_sub_signed(span)
            .with_context(out_of_range)?;

        Ok(Self {
            current: TimeWindow {
                start: current_start,
                end: max_date,
            },
            comparison: TimeWindow {
                start: comparison_start,
                end: comparison_end,
            },
        })
    }

    #[must_use]
    pub fn period_of(&self, date: NaiveDate) -> Option<Period> {
        if self.current.contains(date) {
            Some(Period::Current)
        } else if self.comparison.contains(date) {
            Some(Period::Comparison)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn window(&self, period: Period) -> &TimeWindow {
        match period {
            Period::Current => &self.current,
            Period::Comparison => &self.comparison,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn trailing_windows_are_adjacent() {
        let windows = PeriodWindows::trailing(day(14), 7).unwrap();

        assert_eq!(windows.current.start, day(8));
        assert_eq!(windows.current.end, day(14));
        assert_eq!(windows.comparison.start, day(1));
        assert_eq!(windows.comparison.end, day(7));
    }

    #[test]
    fn period_of_classifies_dates() {
        let windows = PeriodWindows::trailing(day(14), 7).unwrap();

        assert_eq!(windows.period_of(day(14)), Some(Period::Current));
        assert_eq!(windows.period_of(day(8)), Some(Period::Current));
        assert_eq!(windows.period_of(day(7)), Some(Period::Comparison));
        assert_eq!(windows.period_of(day(1)), Some(Period::Comparison));
        assert_eq!(
            windows.period_of(NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()),
            None
        );
    }

    #[test]
    fn single_day_lookback() {
        let windows = PeriodWindows::trailing(day(14), 1).unwrap();
        assert_eq!(windows.current.start, day(14));
        assert_eq!(windows.comparison.start, day(13));
        assert_eq!(windows.comparison.end, day(13));
        assert_eq!(windows.current.offset_of(day(14)), Some(0));
    }

    #[test]
    fn zero_lookback_is_rejected() {
        assert!(PeriodWindows::trailing(day(14), 0).is_err());
    }

    #[test]
    fn oversized_lookback_is_an_error() {
        let err = PeriodWindows::trailing(day(31), u32::MAX).unwrap_err();
        assert!(
            err.to_string().contains("precedes representable dates"),
            "error was {err}"
        );

        // Current window fits, comparison window does not
        let earliest = NaiveDate::MIN + Duration::days(5);
        let windows = PeriodWindows::trailing(earliest, 3).unwrap();
        assert_eq!(windows.comparison.start, NaiveDate::MIN);
        assert!(PeriodWindows::trailing(earliest, 4).is_err());
    }
}
