//! Suggestion engine and batch orchestrator.
//!
//! Per field the pipeline is: cache lookup, hybrid combiner on a miss, cache
//! store, then the learner boost. The cache holds the pre-boost result, so
//! corrections recorded after a result was cached still apply to it.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use onboard_model::{
    Algorithm, Alternate, ColumnDescriptor, FieldDescriptor, MappingDict, MappingSuggestion,
    MatchContext, SuggestionMap,
};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info_span, trace};

use crate::cache::{CacheKey, CacheStats, SuggestionCache};
use crate::config::MatcherConfig;
use crate::error::Result;
use crate::hybrid::{Combined, HybridCombiner};
use crate::learner::{CorrectionLearner, boost_for};
use crate::strategy::{MatchStrategy, StrategyRegistry};

/// One column's score breakdown for a field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateExplanation {
    pub column: String,
    /// Unweighted score per strategy that ranked the column.
    pub components: BTreeMap<MatchStrategy, f64>,
    /// Weighted sum before normalization.
    pub raw: f64,
    /// Normalized combiner confidence.
    pub score: f64,
    /// Boost from recorded corrections.
    pub learned_boost: f64,
    /// `min(1, score + learned_boost)`.
    pub confidence: f64,
}

impl CandidateExplanation {
    /// Human-readable explanation of the score.
    pub fn explain(&self) -> String {
        let mut parts: Vec<String> = self
            .components
            .iter()
            .map(|(strategy, value)| format!("{strategy}: {:.0}%", value * 100.0))
            .collect();
        if self.learned_boost > 0.0 {
            parts.push(format!("learned: +{:.0}%", self.learned_boost * 100.0));
        }
        parts.join("; ")
    }
}

/// A column with its combiner score and learned boost.
struct Scored {
    column: String,
    index: usize,
    base: f64,
    boost: f64,
}

impl Scored {
    fn total(&self) -> f64 {
        (self.base + self.boost).min(1.0)
    }
}

/// Position of the first column with each name.
fn first_positions(columns: &[ColumnDescriptor]) -> HashMap<&str, usize> {
    let mut positions = HashMap::with_capacity(columns.len());
    for (idx, column) in columns.iter().enumerate() {
        positions.entry(column.name.as_str()).or_insert(idx);
    }
    positions
}

/// Suggests source columns for target fields.
///
/// The engine owns its cache and learner; both can be shared between
/// engines through [`SuggestionEngine::with_cache`] and
/// [`SuggestionEngine::with_learner`].
///
/// # Example
///
/// ```
/// use onboard_map::{MatcherConfig, SuggestionEngine};
/// use onboard_model::{ColumnDescriptor, FieldDescriptor, MatchContext};
///
/// let engine = SuggestionEngine::new(MatcherConfig::default()).unwrap();
/// let columns = vec![ColumnDescriptor::new("PatientID"), ColumnDescriptor::new("Date_of_Birth")];
/// let suggestion = engine
///     .suggest_mapping(&FieldDescriptor::new("DOB"), &columns, &MatchContext::default())
///     .unwrap();
/// assert_eq!(suggestion.value.as_deref(), Some("Date_of_Birth"));
/// ```
#[derive(Debug)]
pub struct SuggestionEngine {
    config: MatcherConfig,
    combiner: HybridCombiner,
    cache: Arc<SuggestionCache>,
    learner: Arc<CorrectionLearner>,
}

impl SuggestionEngine {
    /// Build an engine, validating the configuration once.
    pub fn new(config: MatcherConfig) -> Result<Self> {
        config.validate()?;
        let combiner = HybridCombiner::new(
            StrategyRegistry::from_config(&config),
            config.weights,
            config.normalization,
            config.min_score,
        );
        let cache = match config.cache_ttl_secs {
            Some(secs) => SuggestionCache::with_ttl(Duration::from_secs(secs)),
            None => SuggestionCache::new(),
        };
        Ok(Self {
            config,
            combiner,
            cache: Arc::new(cache),
            learner: Arc::new(CorrectionLearner::new()),
        })
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<SuggestionCache>) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_learner(mut self, learner: Arc<CorrectionLearner>) -> Self {
        self.learner = learner;
        self
    }

    /// Replace the matcher set. Clears the cache, whose keys do not cover
    /// custom matchers.
    #[must_use]
    pub fn with_registry(mut self, registry: StrategyRegistry) -> Self {
        self.combiner.set_registry(registry);
        self.cache.clear();
        self
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn registry(&self) -> &StrategyRegistry {
        self.combiner.registry()
    }

    pub fn cache(&self) -> &Arc<SuggestionCache> {
        &self.cache
    }

    pub fn learner(&self) -> &Arc<CorrectionLearner> {
        &self.learner
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Suggest a source column for one target field.
    ///
    /// Returns `None` when no column qualifies, including when `columns` is
    /// empty.
    pub fn suggest_mapping(
        &self,
        field: &FieldDescriptor,
        columns: &[ColumnDescriptor],
        context: &MatchContext,
    ) -> Option<MappingSuggestion> {
        if columns.is_empty() {
            return None;
        }
        let base = self.base_suggestion(field, columns, context);
        let suggestion = self.apply_learning(base, columns);
        match &suggestion {
            Some(s) => debug!(
                field = %field.name,
                column = s.value.as_deref().unwrap_or_default(),
                confidence = s.confidence,
                algorithm = %s.algorithm,
                alternates = s.alternates.len(),
                "Suggested mapping"
            ),
            None => debug!(field = %field.name, "No column qualified"),
        }
        suggestion
    }

    /// Suggest columns for every field, in field order.
    ///
    /// Fields without a qualifying column are omitted.
    pub fn batch_match(
        &self,
        fields: &[FieldDescriptor],
        columns: &[ColumnDescriptor],
        context: &MatchContext,
    ) -> SuggestionMap {
        let span = info_span!("batch_match", fields = fields.len(), columns = columns.len());
        let _guard = span.enter();
        let map: SuggestionMap = fields
            .iter()
            .filter_map(|field| self.suggest_mapping(field, columns, context))
            .collect();
        debug!(suggested = map.len(), "Batch complete");
        map
    }

    /// [`SuggestionEngine::batch_match`] with fields dispatched over the
    /// rayon pool. The result is identical, field order included.
    pub fn batch_match_parallel(
        &self,
        fields: &[FieldDescriptor],
        columns: &[ColumnDescriptor],
        context: &MatchContext,
    ) -> SuggestionMap {
        let span = info_span!(
            "batch_match_parallel",
            fields = fields.len(),
            columns = columns.len()
        );
        let _guard = span.enter();
        let suggestions: Vec<Option<MappingSuggestion>> = fields
            .par_iter()
            .map(|field| self.suggest_mapping(field, columns, context))
            .collect();
        let map: SuggestionMap = suggestions.into_iter().flatten().collect();
        debug!(suggested = map.len(), "Batch complete");
        map
    }

    /// Re-suggest with a prior mapping.
    ///
    /// A prior assignment whose column still exists is kept as-is (algorithm
    /// `prior`, confidence 1.0); every other field runs through the pipeline.
    pub fn batch_match_with_prior(
        &self,
        fields: &[FieldDescriptor],
        columns: &[ColumnDescriptor],
        context: &MatchContext,
        prior: &MappingDict,
    ) -> SuggestionMap {
        let span = info_span!(
            "batch_match_with_prior",
            fields = fields.len(),
            columns = columns.len(),
            prior = prior.len()
        );
        let _guard = span.enter();
        let mut kept = 0usize;
        let map: SuggestionMap = fields
            .iter()
            .filter_map(|field| {
                let prior_column = prior
                    .get(&field.name)
                    .and_then(|entry| entry.value.as_deref())
                    .filter(|column| columns.iter().any(|c| c.name == *column));
                match prior_column {
                    Some(column) => {
                        kept += 1;
                        Some(MappingSuggestion::mapped(
                            &field.name,
                            column,
                            1.0,
                            Algorithm::Prior,
                        ))
                    }
                    None => self.suggest_mapping(field, columns, context),
                }
            })
            .collect();
        debug!(kept, suggested = map.len(), "Batch complete");
        map
    }

    /// Feed a user override to the learner.
    pub fn record_correction(
        &self,
        field_name: &str,
        suggested_column: Option<&str>,
        corrected_column: &str,
        context: Option<MatchContext>,
    ) {
        self.learner
            .record_correction(field_name, suggested_column, corrected_column, context);
    }

    /// Every candidate column for a field with its score breakdown, best first.
    ///
    /// Bypasses the cache. An exact name match explains as a single
    /// candidate, since it short-circuits the other strategies.
    pub fn explain(
        &self,
        field: &FieldDescriptor,
        columns: &[ColumnDescriptor],
        context: &MatchContext,
    ) -> Vec<CandidateExplanation> {
        match self.combiner.combine(field, columns, context) {
            Combined::Exact { column, .. } => vec![CandidateExplanation {
                column,
                components: BTreeMap::from([(MatchStrategy::Exact, 1.0)]),
                raw: 1.0,
                score: 1.0,
                learned_boost: 0.0,
                confidence: 1.0,
            }],
            Combined::Ranked(candidates) => {
                let mut details: HashMap<String, (BTreeMap<MatchStrategy, f64>, f64)> =
                    HashMap::with_capacity(candidates.len());
                let scored: Vec<(String, f64)> = candidates
                    .into_iter()
                    .map(|c| {
                        let entry = (c.column.clone(), c.score);
                        details.insert(c.column, (c.components, c.raw));
                        entry
                    })
                    .collect();
                self.rerank(&field.name, columns, scored)
                    .into_iter()
                    .map(|s| {
                        let confidence = s.total();
                        let (components, raw) = details.remove(&s.column).unwrap_or_default();
                        CandidateExplanation {
                            column: s.column,
                            components,
                            raw,
                            score: s.base,
                            learned_boost: s.boost,
                            confidence,
                        }
                    })
                    .collect()
            }
        }
    }

    /// Cached combiner result, untruncated and without learned boosts.
    fn base_suggestion(
        &self,
        field: &FieldDescriptor,
        columns: &[ColumnDescriptor],
        context: &MatchContext,
    ) -> MappingSuggestion {
        if !self.config.cache_enabled {
            return self.compute(field, columns, context);
        }
        let Some(key) = CacheKey::new(field, columns, context, &self.config) else {
            trace!(field = %field.name, "Cache key unavailable; computing directly");
            return self.compute(field, columns, context);
        };
        if let Some(hit) = self.cache.get(&key) {
            trace!(field = %field.name, "Cache hit");
            return hit;
        }
        trace!(field = %field.name, "Cache miss");
        let value = self.compute(field, columns, context);
        self.cache.set(key, value.clone(), None);
        value
    }

    fn compute(
        &self,
        field: &FieldDescriptor,
        columns: &[ColumnDescriptor],
        context: &MatchContext,
    ) -> MappingSuggestion {
        match self.combiner.combine(field, columns, context) {
            Combined::Exact { column, .. } => {
                MappingSuggestion::mapped(&field.name, column, 1.0, Algorithm::Exact)
            }
            Combined::Ranked(candidates) => {
                let mut iter = candidates.into_iter();
                let Some(best) = iter.next() else {
                    return MappingSuggestion::unmapped(&field.name, Algorithm::Hybrid);
                };
                let alternates = iter
                    .map(|c| Alternate {
                        column: c.column,
                        confidence: c.score,
                    })
                    .collect();
                MappingSuggestion::mapped(&field.name, best.column, best.score, Algorithm::Hybrid)
                    .with_alternates(alternates)
            }
        }
    }

    /// Add learned boosts and re-sort, dropping anything that ends at zero.
    ///
    /// Learned columns the combiner did not score enter with a base of 0.
    fn rerank(
        &self,
        field_name: &str,
        columns: &[ColumnDescriptor],
        scored: Vec<(String, f64)>,
    ) -> Vec<Scored> {
        let positions = first_positions(columns);
        let learned = self.learner.learned_columns(field_name);

        let mut ranked: Vec<Scored> = Vec::with_capacity(scored.len() + learned.len());
        for (column, base) in scored {
            let Some(&index) = positions.get(column.as_str()) else {
                continue;
            };
            if ranked.iter().any(|s| s.index == index) {
                continue;
            }
            let boost = learned.get(&column).copied().map_or(0.0, boost_for);
            ranked.push(Scored {
                column,
                index,
                base,
                boost,
            });
        }
        for (column, count) in &learned {
            let Some(&index) = positions.get(column.as_str()) else {
                continue;
            };
            if ranked.iter().any(|s| s.index == index) {
                continue;
            }
            ranked.push(Scored {
                column: column.clone(),
                index,
                base: 0.0,
                boost: boost_for(*count),
            });
        }

        ranked.retain(|s| s.total() > 0.0);
        ranked.sort_by(|a, b| {
            b.total()
                .partial_cmp(&a.total())
                .unwrap_or(Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });
        ranked
    }

    fn apply_learning(
        &self,
        base: MappingSuggestion,
        columns: &[ColumnDescriptor],
    ) -> Option<MappingSuggestion> {
        let max_alternates = self.config.max_alternates;
        if base.algorithm == Algorithm::Exact {
            return base.is_mapped().then_some(base);
        }

        let mut scored: Vec<(String, f64)> = Vec::with_capacity(base.alternates.len() + 1);
        if let Some(value) = &base.value {
            scored.push((value.clone(), base.confidence));
        }
        scored.extend(
            base.alternates
                .iter()
                .map(|a| (a.column.clone(), a.confidence)),
        );

        let mut ranked = self.rerank(&base.field_name, columns, scored).into_iter();
        let best = ranked.next()?;
        let alternates = ranked
            .take(max_alternates)
            .map(|s| Alternate {
                confidence: s.total(),
                column: s.column,
            })
            .collect();
        let algorithm = if best.boost > 0.0 {
            Algorithm::Learned
        } else {
            base.algorithm
        };
        let mut suggestion =
            MappingSuggestion::mapped(base.field_name, best.column.clone(), best.total(), algorithm)
                .with_alternates(alternates);
        suggestion.base_confidence = best.base;
        suggestion.learned_boost = best.boost;
        Some(suggestion)
    }
}
