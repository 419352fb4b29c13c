//! Confidence level categories for suggestion quality.

use serde::{Deserialize, Serialize};

/// Confidence level categories for mapping quality assessment.
///
/// - `High`: near-certain matches that can be used without review
/// - `Medium`: good matches, pre-filled as auto-mapped but worth a glance
/// - `Low`: weak matches requiring manual confirmation
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Returns a human-readable description of the confidence level.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::High => "high confidence - likely correct",
            Self::Medium => "medium confidence - should review",
            Self::Low => "low confidence - needs verification",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// Configurable thresholds for categorizing suggestion confidence.
///
/// - Below `low`: no level
/// - `low` to `medium`: [`ConfidenceLevel::Low`]
/// - `medium` to `high`: [`ConfidenceLevel::Medium`]
/// - At or above `high`: [`ConfidenceLevel::High`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    /// Minimum confidence for high-quality matches (default: 0.95).
    pub high: f64,
    /// Minimum confidence for medium-quality matches (default: 0.80).
    pub medium: f64,
    /// Minimum confidence to be categorized at all (default: 0.60).
    pub low: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: 0.95,
            medium: 0.80,
            low: 0.60,
        }
    }
}

impl ConfidenceThresholds {
    #[must_use]
    pub fn strict() -> Self {
        Self {
            high: 0.98,
            medium: 0.90,
            low: 0.75,
        }
    }

    #[must_use]
    pub fn relaxed() -> Self {
        Self {
            high: 0.90,
            medium: 0.70,
            low: 0.50,
        }
    }

    /// Categorizes a confidence score; `None` below the low threshold.
    #[must_use]
    pub fn categorize(&self, confidence: f64) -> Option<ConfidenceLevel> {
        if confidence >= self.high {
            Some(ConfidenceLevel::High)
        } else if confidence >= self.medium {
            Some(ConfidenceLevel::Medium)
        } else if confidence >= self.low {
            Some(ConfidenceLevel::Low)
        } else {
            None
        }
    }

    /// Whether a UI would pre-fill this suggestion without asking.
    #[must_use]
    pub fn is_auto_mapped(&self, confidence: f64) -> bool {
        confidence >= self.medium
    }
}
