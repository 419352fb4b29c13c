//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::hybrid::{Normalization, Weights};

/// Upper bound accepted for [`MatcherConfig::max_alternates`].
pub const MAX_ALTERNATES_LIMIT: usize = 50;

/// Tunables for the suggestion engine.
///
/// Every key is optional when loaded from JSON; missing keys take the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Hybrid weights per strategy.
    pub weights: Weights,
    /// Fuzzy strategy cut-off (default: 0.6).
    pub fuzzy_threshold: f64,
    /// Minimum raw weighted score a candidate needs (default: 0.05).
    pub min_score: f64,
    /// Number of runner-up columns kept on a suggestion (default: 5).
    pub max_alternates: usize,
    /// How raw weighted scores become confidences.
    pub normalization: Normalization,
    /// When false, the semantic strategy contributes nothing.
    pub semantic_enabled: bool,
    /// Whether the engine memoizes combiner results.
    pub cache_enabled: bool,
    /// Lifetime of cached results; `None` keeps them until cleared.
    pub cache_ttl_secs: Option<u64>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            weights: Weights::default(),
            fuzzy_threshold: 0.6,
            min_score: 0.05,
            max_alternates: 5,
            normalization: Normalization::default(),
            semantic_enabled: true,
            cache_enabled: true,
            cache_ttl_secs: None,
        }
    }
}

impl MatcherConfig {
    /// Stricter cut-offs for layouts where false positives are costly.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            fuzzy_threshold: 0.75,
            min_score: 0.15,
            ..Self::default()
        }
    }

    /// Looser cut-offs for exploratory mapping of unfamiliar files.
    #[must_use]
    pub fn relaxed() -> Self {
        Self {
            fuzzy_threshold: 0.5,
            min_score: 0.02,
            ..Self::default()
        }
    }

    /// Check every setting, reporting the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(ConfigError::ThresholdOutOfRange {
                name: "fuzzy_threshold",
                value: self.fuzzy_threshold,
            });
        }
        if !(0.0..1.0).contains(&self.min_score) {
            return Err(ConfigError::ThresholdOutOfRange {
                name: "min_score",
                value: self.min_score,
            });
        }
        if self.max_alternates > MAX_ALTERNATES_LIMIT {
            return Err(ConfigError::InvalidAlternates {
                value: self.max_alternates,
                limit: MAX_ALTERNATES_LIMIT,
            });
        }
        Ok(())
    }
}
