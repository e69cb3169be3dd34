//! Data loading for campaign performance diagnosis.
//!
//! This crate provides:
//! - CSV loading of daily campaign rows
//! - Current and comparison date windows
//! - Aggregation into the per-segment statistics snapshot the validation
//!   engine consumes

pub mod aggregate;
pub mod campaign;
pub mod window;

pub use aggregate::{aggregate_segments, DAY_COVARIATE};
pub use campaign::{CampaignRecord, CampaignTable, MetricSource};
pub use window::{PeriodWindows, TimeWindow};
