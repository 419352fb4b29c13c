//! Hybrid combiner: one weighted score per column out of several strategies.
//!
//! An exact name match short-circuits everything else. Otherwise the fuzzy,
//! semantic, context and pattern rankings are summed with their weights and
//! normalized into confidences.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use onboard_model::{ColumnDescriptor, FieldDescriptor, MatchContext};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::strategy::{MatchStrategy, StrategyRegistry};

/// Per-strategy weights. Exact has no weight; it is a fast path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub fuzzy: f64,
    pub semantic: f64,
    pub context: f64,
    pub pattern: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            fuzzy: 0.4,
            semantic: 0.3,
            context: 0.2,
            pattern: 0.1,
        }
    }
}

impl Weights {
    pub fn weight(&self, strategy: MatchStrategy) -> f64 {
        match strategy {
            MatchStrategy::Exact => 0.0,
            MatchStrategy::Fuzzy => self.fuzzy,
            MatchStrategy::Semantic => self.semantic,
            MatchStrategy::Context => self.context,
            MatchStrategy::Pattern => self.pattern,
        }
    }

    pub fn total(&self) -> f64 {
        MatchStrategy::WEIGHTED
            .iter()
            .map(|strategy| self.weight(*strategy))
            .sum()
    }

    /// Weights must be finite and non-negative, and not all zero.
    ///
    /// A sum above 1.0 is accepted.
    pub fn validate(&self) -> Result<()> {
        for strategy in MatchStrategy::WEIGHTED {
            let value = self.weight(strategy);
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    strategy: strategy.as_str(),
                    value,
                });
            }
        }
        if self.total() <= 0.0 {
            return Err(ConfigError::ZeroWeights);
        }
        Ok(())
    }
}

/// How raw weighted sums become confidences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// Divide by the best raw score for the field: the top candidate is
    /// always 1.0, even when every candidate is weak.
    #[default]
    Relative,
    /// Divide by the sum of weights: a column would need a perfect score
    /// from every strategy to reach 1.0.
    Absolute,
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relative => f.write_str("relative"),
            Self::Absolute => f.write_str("absolute"),
        }
    }
}

/// One column after combination.
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedCandidate {
    pub column: String,
    /// Position of the column in the input list.
    pub index: usize,
    /// Unweighted score from each strategy that ranked the column.
    pub components: BTreeMap<MatchStrategy, f64>,
    /// Weighted sum before normalization.
    pub raw: f64,
    /// Normalized confidence in `0.0..=1.0`.
    pub score: f64,
}

/// Outcome of combining strategies for one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Combined {
    /// A column matched the field name exactly; confidence is 1.0.
    Exact { column: String, index: usize },
    /// Weighted candidates, best first. Empty when nothing qualified.
    Ranked(Vec<CombinedCandidate>),
}

impl Combined {
    /// `(column, score)` pairs, best first.
    pub fn scores(&self) -> Vec<(String, f64)> {
        match self {
            Self::Exact { column, .. } => vec![(column.clone(), 1.0)],
            Self::Ranked(candidates) => candidates
                .iter()
                .map(|c| (c.column.clone(), c.score))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Ranked(candidates) if candidates.is_empty())
    }
}

/// Weighted combination of the registered strategies.
#[derive(Debug)]
pub struct HybridCombiner {
    registry: StrategyRegistry,
    weights: Weights,
    normalization: Normalization,
    min_score: f64,
}

impl HybridCombiner {
    pub fn new(
        registry: StrategyRegistry,
        weights: Weights,
        normalization: Normalization,
        min_score: f64,
    ) -> Self {
        Self {
            registry,
            weights,
            normalization,
            min_score,
        }
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub(crate) fn set_registry(&mut self, registry: StrategyRegistry) {
        self.registry = registry;
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn min_score(&self) -> f64 {
        self.min_score
    }

    /// Combine every strategy's ranking for `field`.
    ///
    /// Columns with a raw weighted score of zero or below `min_score` are
    /// dropped. Ties keep input order. A repeated column name resolves to
    /// its first occurrence.
    pub fn combine(
        &self,
        field: &FieldDescriptor,
        columns: &[ColumnDescriptor],
        context: &MatchContext,
    ) -> Combined {
        if columns.is_empty() {
            return Combined::Ranked(Vec::new());
        }

        let mut positions: HashMap<&str, usize> = HashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            positions.entry(column.name.as_str()).or_insert(idx);
        }

        if let Some(hit) = self
            .registry
            .rank(MatchStrategy::Exact, field, columns, context)
            .into_iter()
            .next()
        {
            let index = positions
                .get(hit.column_name.as_str())
                .copied()
                .unwrap_or_default();
            return Combined::Exact {
                column: hit.column_name,
                index,
            };
        }

        let mut accumulated: BTreeMap<usize, CombinedCandidate> = BTreeMap::new();
        for strategy in MatchStrategy::WEIGHTED {
            let weight = self.weights.weight(strategy);
            for candidate in self.registry.rank(strategy, field, columns, context) {
                let Some(&index) = positions.get(candidate.column_name.as_str()) else {
                    continue;
                };
                let entry = accumulated
                    .entry(index)
                    .or_insert_with(|| CombinedCandidate {
                        column: candidate.column_name.clone(),
                        index,
                        components: BTreeMap::new(),
                        raw: 0.0,
                        score: 0.0,
                    });
                if entry.components.contains_key(&strategy) {
                    continue;
                }
                entry.components.insert(strategy, candidate.score);
                entry.raw += candidate.score * weight;
            }
        }

        let mut ranked: Vec<CombinedCandidate> = accumulated
            .into_values()
            .filter(|c| c.raw > 0.0 && c.raw >= self.min_score)
            .collect();

        let divisor = match self.normalization {
            Normalization::Relative => ranked.iter().map(|c| c.raw).fold(0.0, f64::max),
            Normalization::Absolute => self.weights.total(),
        };
        for candidate in &mut ranked {
            candidate.score = if divisor > 0.0 {
                (candidate.raw / divisor).clamp(0.0, 1.0)
            } else {
                0.0
            };
        }
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        Combined::Ranked(ranked)
    }
}
