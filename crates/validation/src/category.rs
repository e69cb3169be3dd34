//! Keyword classification of hypotheses and the fixed lookups keyed on it.

use serde::{Deserialize, Serialize};

/// Broad family of explanation a hypothesis belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisCategory {
    CreativeFatigue,
    AudienceSaturation,
    Platform,
    Timing,
    Other,
}

const CREATIVE_KEYWORDS: &[&str] = &["fatigue", "creative", "messaging", "visual"];
const AUDIENCE_KEYWORDS: &[&str] = &["saturation", "audience", "frequency", "targeting"];
const PLATFORM_KEYWORDS: &[&str] = &["platform", "placement"];
const TIMING_KEYWORDS: &[&str] = &["timing", "seasonal", "weekend", "weekday", "holiday"];

impl HypothesisCategory {
    /// Classifies by the first keyword family found in the text.
    ///
    /// Families are checked in a fixed order (creative, audience, platform,
    /// timing) so a text mentioning several resolves deterministically.
    #[must_use]
    pub fn classify(text: &str) -> Self {
        let text = text.to_lowercase();
        let mentions = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

        if mentions(CREATIVE_KEYWORDS) {
            Self::CreativeFatigue
        } else if mentions(AUDIENCE_KEYWORDS) {
            Self::AudienceSaturation
        } else if mentions(PLATFORM_KEYWORDS) {
            Self::Platform
        } else if mentions(TIMING_KEYWORDS) {
            Self::Timing
        } else {
            Self::Other
        }
    }

    /// Fixed action for an actionable hypothesis of this category.
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::CreativeFatigue => "Refresh creative with new messaging and visuals",
            Self::AudienceSaturation => "Expand audience targeting or reduce frequency",
            Self::Platform => "Test platform-optimized creative variations",
            Self::Timing => "Shift budget pacing toward stronger days and dayparts",
            Self::Other => GENERIC_ACTION,
        }
    }

    /// The factor this category attributes the change to.
    #[must_use]
    pub const fn factor(&self) -> Option<CompetingFactor> {
        match self {
            Self::CreativeFatigue => Some(CompetingFactor::Creative),
            Self::AudienceSaturation => Some(CompetingFactor::Audience),
            Self::Platform => Some(CompetingFactor::Platform),
            Self::Timing => Some(CompetingFactor::Timing),
            Self::Other => None,
        }
    }
}

pub const GENERIC_ACTION: &str = "Investigate further and test solutions";
pub const MONITOR_ACTION: &str = "Monitor trend; gather more data before taking action";

/// Recommended action: the category's action when actionable, otherwise monitor.
#[must_use]
pub fn recommended_action(category: HypothesisCategory, actionable: bool) -> &'static str {
    if actionable {
        category.action()
    } else {
        MONITOR_ACTION
    }
}

/// Alternative driver proposed when a hypothesis is sent back for retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompetingFactor {
    Platform,
    Audience,
    Creative,
    Timing,
}

impl CompetingFactor {
    /// Plausibility order for proposing alternatives.
    pub const PRIORITY: [Self; 4] = [Self::Platform, Self::Audience, Self::Creative, Self::Timing];

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::Audience => "audience",
            Self::Creative => "creative",
            Self::Timing => "timing",
        }
    }

    /// Data dimension a segment is split on to test this factor.
    #[must_use]
    pub const fn dimension(&self) -> &'static str {
        match self {
            Self::Platform => "platform",
            Self::Audience => "audience_type",
            Self::Creative => "creative_type",
            Self::Timing => "day_of_week",
        }
    }

    /// Next factor after `own` in priority order, wrapping, skipping any
    /// factor whose dimension is the one the segment already fixes.
    #[must_use]
    pub fn next_after(own: Option<Self>, segment_dimension: &str) -> Self {
        let start = own
            .and_then(|f| Self::PRIORITY.iter().position(|p| *p == f))
            .map_or(0, |i| i + 1);

        (0..Self::PRIORITY.len())
            .map(|offset| Self::PRIORITY[(start + offset) % Self::PRIORITY.len()])
            .find(|f| Some(*f) != own && f.dimension() != segment_dimension)
            .unwrap_or(Self::PRIORITY[start % Self::PRIORITY.len()])
    }
}
