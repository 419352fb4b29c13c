//! Field mapping suggestion engine.
//!
//! Given target field descriptors and source column descriptors, the engine
//! proposes which column should fill each field, with a confidence score.
//!
//! # Pipeline
//!
//! 1. **Exact**: a column whose name equals the field name (ignoring case and
//!    whitespace) wins outright with confidence 1.0.
//! 2. **Hybrid**: fuzzy, semantic, context and pattern strategies each rank
//!    the columns; their scores are weighted, summed and normalized.
//! 3. **Cache**: combiner results are memoized per input set.
//! 4. **Learning**: recorded user corrections add a bounded boost (at most
//!    0.3) on top of the normalized score.
//!
//! ```
//! use onboard_map::{MatcherConfig, SuggestionEngine};
//! use onboard_model::{ColumnDescriptor, FieldDescriptor, MatchContext};
//!
//! let engine = SuggestionEngine::new(MatcherConfig::default()).unwrap();
//! let fields = vec![FieldDescriptor::new("Patient_ID"), FieldDescriptor::new("DOB")];
//! let columns = vec![ColumnDescriptor::new("PatientID"), ColumnDescriptor::new("Date_of_Birth")];
//!
//! let suggestions = engine.batch_match(&fields, &columns, &MatchContext::default());
//! assert_eq!(suggestions.len(), 2);
//! ```

#![deny(unsafe_code)]

pub mod assistant;
pub mod cache;
pub mod confidence;
pub mod config;
pub mod engine;
pub mod error;
pub mod hybrid;
pub mod learner;
pub mod patterns;
pub mod similarity;
pub mod strategy;
pub mod summary;
pub mod utils;

pub use assistant::{RejectReason, RejectedEntry, ReplyParse, build_prompt, parse_reply};
pub use cache::{CacheKey, CacheStats, SuggestionCache};
pub use confidence::{ConfidenceLevel, ConfidenceThresholds};
pub use config::MatcherConfig;
pub use engine::{CandidateExplanation, SuggestionEngine};
pub use error::{ConfigError, Result};
pub use hybrid::{Combined, CombinedCandidate, HybridCombiner, Normalization, Weights};
pub use learner::{CorrectionLearner, LearnerSnapshot, MAX_CONFIDENCE_BOOST};
pub use patterns::ValuePattern;
pub use similarity::{
    TextVectorizer, TfIdfVectorizer, exact_score, fuzzy_score, lexical_score, pattern_score,
    semantic_score,
};
pub use strategy::{
    ContextMatcher, ExactMatcher, FuzzyMatcher, MatchStrategy, Matcher, NoopMatcher,
    PatternMatcher, SemanticMatcher, StrategyRegistry,
};
pub use summary::{MatchSummary, filter_by_level};
