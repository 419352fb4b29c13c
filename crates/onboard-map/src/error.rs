//! Error types for engine configuration.
//!
//! Matching itself never fails; misconfiguration is reported once, when the
//! engine is built.

use thiserror::Error;

/// Invalid [`MatcherConfig`](crate::MatcherConfig) values.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A strategy weight is negative, NaN or infinite.
    #[error("invalid weight for {strategy}: {value}")]
    InvalidWeight { strategy: &'static str, value: f64 },

    /// Every strategy weight is zero, so no candidate could ever score.
    #[error("all strategy weights are zero")]
    ZeroWeights,

    /// A threshold lies outside its allowed range.
    #[error("{name} out of range: {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },

    /// `max_alternates` exceeds the supported limit.
    #[error("max_alternates must be at most {limit}, got {value}")]
    InvalidAlternates { value: usize, limit: usize },
}

impl ConfigError {
    /// Name of the offending setting.
    pub fn setting(&self) -> &'static str {
        match self {
            Self::InvalidWeight { strategy, .. } => *strategy,
            Self::ZeroWeights => "weights",
            Self::ThresholdOutOfRange { name, .. } => *name,
            Self::InvalidAlternates { .. } => "max_alternates",
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
