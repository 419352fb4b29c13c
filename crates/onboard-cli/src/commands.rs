//! Command implementations. Each returns data; rendering lives in `output`.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde::de::DeserializeOwned;
use tracing::{debug, info, info_span, warn};

use onboard_map::{
    CandidateExplanation, CacheStats, CorrectionLearner, LearnerSnapshot, MatchSummary,
    MatcherConfig, ReplyParse, SuggestionEngine, build_prompt, parse_reply,
};
use onboard_model::{
    ColumnDescriptor, FieldDescriptor, MappingDict, MatchContext, SuggestionMap,
    validate_columns, validate_fields,
};

use crate::cli::{ExplainArgs, MatchArgs, ParseReplyArgs, PresetArg, SchemaArgs, SuggestArgs};

/// Validated source and target schemas.
#[derive(Debug, Clone)]
pub struct Schemas {
    pub fields: Vec<FieldDescriptor>,
    pub columns: Vec<ColumnDescriptor>,
}

/// Result of `onboard suggest`.
#[derive(Debug, Clone)]
pub struct SuggestReport {
    pub fields: Vec<FieldDescriptor>,
    pub suggestions: SuggestionMap,
    pub summary: MatchSummary,
    pub cache: CacheStats,
}

/// Result of `onboard explain`.
#[derive(Debug, Clone)]
pub struct ExplainReport {
    pub field: String,
    pub candidates: Vec<CandidateExplanation>,
}

pub fn run_suggest(args: &SuggestArgs) -> Result<SuggestReport> {
    let span = info_span!("suggest");
    let _guard = span.enter();
    let schemas = load_schemas(&args.inputs.schema)?;
    let context = load_context(args.inputs.context.as_deref())?;
    let engine = build_engine(&args.inputs)?;

    let suggestions = match &args.prior {
        Some(path) => {
            let prior: MappingDict = read_json(path, "prior mapping")?;
            engine.batch_match_with_prior(&schemas.fields, &schemas.columns, &context, &prior)
        }
        None if args.parallel => {
            engine.batch_match_parallel(&schemas.fields, &schemas.columns, &context)
        }
        None => engine.batch_match(&schemas.fields, &schemas.columns, &context),
    };
    let summary = MatchSummary::new(&schemas.fields, &suggestions);
    info!(
        fields = summary.fields_total,
        suggested = summary.suggested,
        auto_mapped = summary.auto_mapped,
        "Suggestion run complete"
    );
    Ok(SuggestReport {
        fields: schemas.fields,
        suggestions,
        summary,
        cache: engine.cache_stats(),
    })
}

pub fn run_explain(args: &ExplainArgs) -> Result<ExplainReport> {
    let span = info_span!("explain", field = %args.field);
    let _guard = span.enter();
    let schemas = load_schemas(&args.inputs.schema)?;
    let context = load_context(args.inputs.context.as_deref())?;
    let engine = build_engine(&args.inputs)?;

    let Some(field) = schemas.fields.iter().find(|f| f.name == args.field) else {
        bail!("unknown target field: {}", args.field);
    };
    let candidates = engine.explain(field, &schemas.columns, &context);
    debug!(candidates = candidates.len(), "Explained field");
    Ok(ExplainReport {
        field: field.name.clone(),
        candidates,
    })
}

pub fn run_parse_reply(args: &ParseReplyArgs) -> Result<ReplyParse> {
    let schemas = load_schemas(&args.schema)?;
    let reply = fs::read_to_string(&args.reply_file)
        .with_context(|| format!("read reply {}", args.reply_file.display()))?;
    let parsed = parse_reply(&reply, &schemas.fields, &schemas.columns);
    if !parsed.rejected.is_empty() {
        warn!(rejected = parsed.rejected.len(), "Reply entries rejected");
    }
    Ok(parsed)
}

pub fn run_prompt(args: &SchemaArgs) -> Result<String> {
    let schemas = load_schemas(args)?;
    Ok(build_prompt(&schemas.fields, &schemas.columns))
}

/// Read and validate both schema files.
pub fn load_schemas(args: &SchemaArgs) -> Result<Schemas> {
    let fields: Vec<FieldDescriptor> = read_json(&args.target, "target schema")?;
    validate_fields(&fields)
        .with_context(|| format!("invalid target schema {}", args.target.display()))?;
    let columns: Vec<ColumnDescriptor> = read_json(&args.source, "source schema")?;
    validate_columns(&columns)
        .with_context(|| format!("invalid source schema {}", args.source.display()))?;
    debug!(
        fields = fields.len(),
        columns = columns.len(),
        "Loaded schemas"
    );
    Ok(Schemas { fields, columns })
}

/// Context hints; a missing file argument means no hints.
pub fn load_context(path: Option<&Path>) -> Result<MatchContext> {
    match path {
        Some(path) => {
            let value: serde_json::Value = read_json(path, "context")?;
            Ok(MatchContext::from_value(&value))
        }
        None => Ok(MatchContext::default()),
    }
}

pub fn load_config(args: &MatchArgs) -> Result<MatcherConfig> {
    let config = match (&args.config, args.preset) {
        (Some(path), _) => read_json(path, "matcher config")?,
        (None, Some(PresetArg::Strict)) => MatcherConfig::strict(),
        (None, Some(PresetArg::Relaxed)) => MatcherConfig::relaxed(),
        (None, None) => MatcherConfig::default(),
    };
    Ok(config)
}

pub fn build_engine(args: &MatchArgs) -> Result<SuggestionEngine> {
    let config = load_config(args)?;
    let mut engine = SuggestionEngine::new(config).context("invalid matcher config")?;
    if let Some(path) = &args.corrections {
        let snapshot: LearnerSnapshot = read_json(path, "correction history")?;
        debug!(records = snapshot.records.len(), "Loaded correction history");
        engine = engine.with_learner(Arc::new(CorrectionLearner::from_snapshot(snapshot)));
    }
    Ok(engine)
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read {what} {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {what} {}", path.display()))
}
