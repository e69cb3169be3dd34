//! Candidate explanations supplied by the hypothesis generator.
//!
//! Hypotheses are read-only inputs: the engine never mutates one, it
//! produces a separate result for each.

use serde::{Deserialize, Serialize};

use crate::error::HypothesisError;
use crate::segment::SegmentDescriptor;

/// Affected segment as written by the generator, either `"dimension=value"`
/// or `{"dimension": .., "value": ..}`.
///
/// Parsing is deferred to resolution so a malformed descriptor fails only
/// its own hypothesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SegmentSpec {
    Text(String),
    Fields(SegmentDescriptor),
}

impl SegmentSpec {
    /// Parses the segment text or object into a descriptor.
    ///
    /// # Errors
    /// Returns [`HypothesisError::InvalidSegmentDescriptor`] for malformed text
    /// or empty fields.
    pub fn descriptor(&self) -> Result<SegmentDescriptor, HypothesisError> {
        match self {
            Self::Text(raw) => SegmentDescriptor::parse(raw),
            Self::Fields(segment) => {
                if segment.dimension.trim().is_empty() || segment.value.trim().is_empty() {
                    Err(HypothesisError::InvalidSegmentDescriptor {
                        descriptor: segment.to_string(),
                    })
                } else {
                    Ok(segment.clone())
                }
            }
        }
    }
}

impl std::fmt::Display for SegmentSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(raw) => f.write_str(raw),
            Self::Fields(segment) => write!(f, "{segment}"),
        }
    }
}

impl From<SegmentDescriptor> for SegmentSpec {
    fn from(segment: SegmentDescriptor) -> Self {
        Self::Fields(segment)
    }
}

const fn default_testable() -> bool {
    true
}

/// A candidate explanation for an observed performance change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: String,
    #[serde(alias = "hypothesis")]
    pub hypothesis_text: String,
    pub affected_segment: SegmentSpec,
    /// Explicit comparison segment; the pooled complement of the affected
    /// dimension is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_segment: Option<SegmentSpec>,
    /// Informal prior from the generator. Reported, never scored.
    pub initial_confidence: f64,
    #[serde(default = "default_testable")]
    pub testable: bool,
}

impl Hypothesis {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        hypothesis_text: impl Into<String>,
        affected_segment: SegmentDescriptor,
        initial_confidence: f64,
    ) -> Self {
        Self {
            id: id.into(),
            hypothesis_text: hypothesis_text.into(),
            affected_segment: affected_segment.into(),
            control_segment: None,
            initial_confidence,
            testable: true,
        }
    }

    #[must_use]
    pub fn with_control(mut self, control: SegmentDescriptor) -> Self {
        self.control_segment = Some(control.into());
        self
    }

    #[must_use]
    pub fn untestable(mut self) -> Self {
        self.testable = false;
        self
    }
}

/// The list handed over by the generator: `{"hypotheses": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HypothesisSet {
    pub hypotheses: Vec<Hypothesis>,
}
