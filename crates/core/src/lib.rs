//! Core types for campaign performance diagnosis.
//!
//! This crate provides:
//! - Segment statistics and the validated snapshot the engine reads
//! - Hypotheses as handed over by the generator
//! - The error taxonomy shared by every crate
//! - Configuration and its layered loader
//! - Statistical primitives (Welch test, Cohen's d, Pearson correlation)

pub mod config;
pub mod config_loader;
pub mod error;
pub mod hypothesis;
pub mod segment;
pub mod stats;

pub use config::{AppConfig, DataConfig, OutputConfig, ValidationConfig};
pub use config_loader::ConfigLoader;
pub use error::{ConfigError, HypothesisError, StructuralInputError};
pub use hypothesis::{Hypothesis, HypothesisSet, SegmentSpec};
pub use segment::{
    CovariateSeries, Period, SegmentDescriptor, SegmentStatistics, SnapshotDocument,
    StatisticsSnapshot,
};
pub use stats::{SampleSummary, WelchTest};
