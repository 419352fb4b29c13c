//! Matching strategies.
//!
//! Each strategy ranks every source column for one target field. Results are
//! sorted by descending score; ties keep the column's input order because the
//! sort is stable and columns are scored in the order they were supplied.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use onboard_model::{Algorithm, ColumnDescriptor, FieldDescriptor, MatchCandidate, MatchContext};
use serde::{Deserialize, Serialize};

use crate::config::MatcherConfig;
use crate::patterns::{ValuePattern, all_dates};
use crate::similarity::{TextVectorizer, TfIdfVectorizer, exact_score, fuzzy_score, lexical_score};
use crate::utils::{keywords, normalize_text};

const GROUP_BONUS: f64 = 0.3;
const TYPE_BONUS: f64 = 0.2;
const KEYWORD_BONUS: f64 = 0.1;
const KEYWORD_BONUS_MAX: f64 = 0.2;
const CONTEXT_KEYWORDS: [&str; 8] = [
    "id", "date", "amount", "code", "name", "number", "type", "status",
];

/// Identifies a matching strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    Exact,
    Fuzzy,
    Semantic,
    Context,
    Pattern,
}

impl MatchStrategy {
    /// Strategies whose weighted scores the hybrid combiner sums.
    pub const WEIGHTED: [MatchStrategy; 4] = [
        MatchStrategy::Fuzzy,
        MatchStrategy::Semantic,
        MatchStrategy::Context,
        MatchStrategy::Pattern,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::Semantic => "semantic",
            Self::Context => "context",
            Self::Pattern => "pattern",
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::Exact => Algorithm::Exact,
            Self::Fuzzy => Algorithm::Fuzzy,
            Self::Semantic => Algorithm::Semantic,
            Self::Context => Algorithm::Context,
            Self::Pattern => Algorithm::Pattern,
        }
    }
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ranks source columns for one target field.
pub trait Matcher: Send + Sync {
    fn strategy(&self) -> MatchStrategy;

    fn rank(
        &self,
        field: &FieldDescriptor,
        columns: &[ColumnDescriptor],
        context: &MatchContext,
    ) -> Vec<MatchCandidate>;
}

/// Score every column, keep those accepted by `keep`, sort descending (stable).
fn rank_columns(
    strategy: MatchStrategy,
    columns: &[ColumnDescriptor],
    keep: impl Fn(f64) -> bool,
    score: impl Fn(usize, &ColumnDescriptor) -> f64,
) -> Vec<MatchCandidate> {
    let mut candidates: Vec<MatchCandidate> = columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            MatchCandidate::new(&column.name, score(idx, column), strategy.algorithm())
        })
        .filter(|candidate| keep(candidate.score))
        .collect();
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    candidates
}

/// Case- and whitespace-insensitive equality. Only perfect matches survive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatcher;

impl Matcher for ExactMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Exact
    }

    fn rank(
        &self,
        field: &FieldDescriptor,
        columns: &[ColumnDescriptor],
        _context: &MatchContext,
    ) -> Vec<MatchCandidate> {
        rank_columns(
            MatchStrategy::Exact,
            columns,
            |score| score >= 1.0,
            |_, column| exact_score(&field.name, &column.name),
        )
    }
}

/// Edit-distance ratio with a cut-off.
#[derive(Debug, Clone, Copy)]
pub struct FuzzyMatcher {
    threshold: f64,
}

impl FuzzyMatcher {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl Matcher for FuzzyMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Fuzzy
    }

    fn rank(
        &self,
        field: &FieldDescriptor,
        columns: &[ColumnDescriptor],
        _context: &MatchContext,
    ) -> Vec<MatchCandidate> {
        let threshold = self.threshold;
        rank_columns(
            MatchStrategy::Fuzzy,
            columns,
            |score| score > 0.0 && score >= threshold,
            |_, column| fuzzy_score(&field.name, &column.name),
        )
    }
}

/// Lexical keyword overlap plus TF-IDF similarity of enriched text.
pub struct SemanticMatcher {
    vectorizer: Box<dyn TextVectorizer>,
}

impl SemanticMatcher {
    pub fn new(vectorizer: Box<dyn TextVectorizer>) -> Self {
        Self { vectorizer }
    }

    pub fn tfidf() -> Self {
        Self::new(Box::new(TfIdfVectorizer))
    }
}

impl fmt::Debug for SemanticMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticMatcher").finish_non_exhaustive()
    }
}

impl Matcher for SemanticMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Semantic
    }

    fn rank(
        &self,
        field: &FieldDescriptor,
        columns: &[ColumnDescriptor],
        context: &MatchContext,
    ) -> Vec<MatchCandidate> {
        if columns.is_empty() {
            return Vec::new();
        }
        let field_tokens = keywords(&field.name);
        let query = field_document(field, context);
        let documents: Vec<Vec<String>> = columns
            .iter()
            .map(|column| column_document(column, context))
            .collect();
        let similarities = self.vectorizer.similarities(&query, &documents);

        rank_columns(
            MatchStrategy::Semantic,
            columns,
            |score| score > 0.0,
            |idx, column| {
                let cosine = similarities.get(idx).copied().unwrap_or(0.0);
                (lexical_score(&field_tokens, &column.name) + cosine).min(1.0)
            },
        )
    }
}

fn field_document(field: &FieldDescriptor, context: &MatchContext) -> Vec<String> {
    let mut document = keywords(&field.name);
    if let Some(description) = field.description.as_deref() {
        document.extend(keywords(description));
    }
    if let Some(description) = context.description_of(&field.name) {
        document.extend(keywords(description));
    }
    document
}

fn column_document(column: &ColumnDescriptor, context: &MatchContext) -> Vec<String> {
    let mut document = keywords(&column.name);
    if let Some(label) = column.label.as_deref() {
        document.extend(keywords(label));
    }
    if let Some(description) = context.description_of(&column.name) {
        document.extend(keywords(description));
    }
    document
}

/// Coarse type family used to compare free-form type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Date,
    Numeric,
    Boolean,
    Text,
}

impl TypeFamily {
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() {
            return None;
        }
        if tag.contains("date") || tag.contains("time") {
            Some(Self::Date)
        } else if tag.contains("bool") {
            Some(Self::Boolean)
        } else if ["int", "float", "num", "decimal", "double", "amount", "currency", "money"]
            .iter()
            .any(|needle| tag.contains(needle))
        {
            Some(Self::Numeric)
        } else if ["str", "text", "char", "object", "category", "varchar"]
            .iter()
            .any(|needle| tag.contains(needle))
        {
            Some(Self::Text)
        } else {
            None
        }
    }

    /// Infer a family from sampled values; `None` without non-blank samples.
    pub fn infer(samples: &[String]) -> Option<Self> {
        let values: Vec<&str> = samples
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if values.is_empty() {
            return None;
        }
        if values.iter().all(|v| v.parse::<f64>().is_ok()) {
            return Some(Self::Numeric);
        }
        if all_dates(samples) {
            return Some(Self::Date);
        }
        if values.iter().all(|v| {
            matches!(
                v.to_lowercase().as_str(),
                "true" | "false" | "yes" | "no" | "y" | "n"
            )
        }) {
            return Some(Self::Boolean);
        }
        Some(Self::Text)
    }
}

/// Metadata-driven bonuses: shared group, compatible type, shared keywords.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextMatcher;

impl ContextMatcher {
    fn field_group(field: &FieldDescriptor, context: &MatchContext) -> Option<String> {
        field
            .category
            .as_deref()
            .or_else(|| context.group_of(&field.name))
            .map(normalize_text)
            .filter(|g| !g.is_empty())
    }

    fn field_family(field: &FieldDescriptor, context: &MatchContext) -> Option<TypeFamily> {
        field
            .expected_type
            .as_deref()
            .and_then(TypeFamily::from_tag)
            .or_else(|| context.type_of(&field.name).and_then(TypeFamily::from_tag))
    }

    fn column_family(column: &ColumnDescriptor, context: &MatchContext) -> Option<TypeFamily> {
        context
            .type_of(&column.name)
            .and_then(TypeFamily::from_tag)
            .or_else(|| TypeFamily::infer(&column.samples))
            .or_else(|| column.dtype.as_deref().and_then(TypeFamily::from_tag))
    }

    fn keyword_bonus(field_name: &str, column_name: &str) -> f64 {
        let field = field_name.to_lowercase();
        let column = column_name.to_lowercase();
        let shared = CONTEXT_KEYWORDS
            .iter()
            .filter(|keyword| field.contains(*keyword) && column.contains(*keyword))
            .count();
        (shared as f64 * KEYWORD_BONUS).min(KEYWORD_BONUS_MAX)
    }
}

impl Matcher for ContextMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Context
    }

    fn rank(
        &self,
        field: &FieldDescriptor,
        columns: &[ColumnDescriptor],
        context: &MatchContext,
    ) -> Vec<MatchCandidate> {
        let field_group = Self::field_group(field, context);
        let field_family = Self::field_family(field, context);

        rank_columns(
            MatchStrategy::Context,
            columns,
            |score| score > 0.0,
            |_, column| {
                let mut score = 0.0;
                if let Some(group) = &field_group
                    && context
                        .group_of(&column.name)
                        .map(normalize_text)
                        .is_some_and(|column_group| &column_group == group)
                {
                    score += GROUP_BONUS;
                }
                if let Some(family) = field_family
                    && Self::column_family(column, context) == Some(family)
                {
                    score += TYPE_BONUS;
                }
                score += Self::keyword_bonus(&field.name, &column.name);
                score.min(1.0)
            },
        )
    }
}

/// Share of sampled values whose shape fits the field (dates, ZIP, NPI, ...).
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternMatcher;

impl PatternMatcher {
    /// Field name first, then the type tag, then the example value.
    fn pattern_for(field: &FieldDescriptor) -> Option<ValuePattern> {
        ValuePattern::from_field_name(&field.name)
            .or_else(|| {
                field
                    .expected_type
                    .as_deref()
                    .and_then(ValuePattern::from_type_tag)
            })
            .or_else(|| {
                field
                    .example_value
                    .as_deref()
                    .and_then(ValuePattern::from_example)
            })
    }
}

impl Matcher for PatternMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Pattern
    }

    fn rank(
        &self,
        field: &FieldDescriptor,
        columns: &[ColumnDescriptor],
        _context: &MatchContext,
    ) -> Vec<MatchCandidate> {
        let Some(pattern) = Self::pattern_for(field) else {
            return Vec::new();
        };
        rank_columns(
            MatchStrategy::Pattern,
            columns,
            |score| score > 0.0,
            |_, column| pattern.match_ratio(&column.samples),
        )
    }
}

/// Stand-in for a strategy whose backend is unavailable. Never has an opinion.
#[derive(Debug, Clone, Copy)]
pub struct NoopMatcher {
    strategy: MatchStrategy,
}

impl NoopMatcher {
    pub fn new(strategy: MatchStrategy) -> Self {
        Self { strategy }
    }
}

impl Matcher for NoopMatcher {
    fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    fn rank(
        &self,
        _field: &FieldDescriptor,
        _columns: &[ColumnDescriptor],
        _context: &MatchContext,
    ) -> Vec<MatchCandidate> {
        Vec::new()
    }
}

/// Enum-keyed set of matcher implementations, built once per engine.
pub struct StrategyRegistry {
    matchers: BTreeMap<MatchStrategy, Box<dyn Matcher>>,
}

impl StrategyRegistry {
    /// An empty registry; every strategy ranks nothing until registered.
    pub fn empty() -> Self {
        Self {
            matchers: BTreeMap::new(),
        }
    }

    /// The standard set of matchers for a configuration.
    ///
    /// When semantic matching is disabled the Semantic slot holds a
    /// [`NoopMatcher`], so the pipeline runs unchanged without it.
    pub fn from_config(config: &MatcherConfig) -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(ExactMatcher));
        registry.register(Box::new(FuzzyMatcher::new(config.fuzzy_threshold)));
        if config.semantic_enabled {
            registry.register(Box::new(SemanticMatcher::tfidf()));
        } else {
            registry.register(Box::new(NoopMatcher::new(MatchStrategy::Semantic)));
        }
        registry.register(Box::new(ContextMatcher));
        registry.register(Box::new(PatternMatcher));
        registry
    }

    /// Register a matcher under its own strategy, replacing any previous one.
    pub fn register(&mut self, matcher: Box<dyn Matcher>) {
        self.matchers.insert(matcher.strategy(), matcher);
    }

    pub fn get(&self, strategy: MatchStrategy) -> Option<&dyn Matcher> {
        self.matchers.get(&strategy).map(AsRef::as_ref)
    }

    pub fn strategies(&self) -> impl Iterator<Item = MatchStrategy> + '_ {
        self.matchers.keys().copied()
    }

    /// Rank with one strategy; an unregistered strategy ranks nothing.
    pub fn rank(
        &self,
        strategy: MatchStrategy,
        field: &FieldDescriptor,
        columns: &[ColumnDescriptor],
        context: &MatchContext,
    ) -> Vec<MatchCandidate> {
        match self.get(strategy) {
            Some(matcher) => matcher.rank(field, columns, context),
            None => Vec::new(),
        }
    }
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry")
            .field("strategies", &self.matchers.keys().collect::<Vec<_>>())
            .finish()
    }
}
