//! End-to-end behavior of the suggestion engine.

use std::sync::Arc;

use onboard_map::{
    CorrectionLearner, MatchStrategy, Matcher, MatcherConfig, MatchSummary, StrategyRegistry,
    SuggestionCache, SuggestionEngine,
};
use onboard_model::{
    Algorithm, ColumnDescriptor, FieldDescriptor, MappingEntry, MatchCandidate, MatchContext,
};

fn engine() -> SuggestionEngine {
    SuggestionEngine::new(MatcherConfig::default()).expect("valid config")
}

fn fields(names: &[&str]) -> Vec<FieldDescriptor> {
    names.iter().map(|n| FieldDescriptor::new(*n)).collect()
}

fn columns(names: &[&str]) -> Vec<ColumnDescriptor> {
    names.iter().map(|n| ColumnDescriptor::new(*n)).collect()
}

#[test]
fn patient_scenario() {
    let engine = engine();
    let map = engine.batch_match(
        &fields(&["Patient_ID", "DOB"]),
        &columns(&["PatientID", "Date_of_Birth"]),
        &MatchContext::default(),
    );

    assert_eq!(map.len(), 2);
    let names: Vec<&str> = map.field_names().collect();
    assert_eq!(names, vec!["Patient_ID", "DOB"]);

    let pid = map.get("Patient_ID").expect("Patient_ID suggested");
    assert_eq!(pid.value.as_deref(), Some("PatientID"));
    assert!(pid.confidence >= 0.8, "got {}", pid.confidence);

    let dob = map.get("DOB").expect("DOB suggested");
    assert_eq!(dob.value.as_deref(), Some("Date_of_Birth"));
    assert!(dob.confidence >= 0.3, "got {}", dob.confidence);
}

#[test]
fn scenario_holds_with_absolute_scores() {
    let engine = SuggestionEngine::new(MatcherConfig {
        normalization: onboard_map::Normalization::Absolute,
        ..MatcherConfig::default()
    })
    .expect("valid config");
    let map = engine.batch_match(
        &fields(&["Patient_ID", "DOB"]),
        &columns(&["PatientID", "Date_of_Birth"]),
        &MatchContext::default(),
    );
    let pid = map.get("Patient_ID").expect("Patient_ID suggested");
    assert_eq!(pid.value.as_deref(), Some("PatientID"));
    assert!(pid.confidence < 1.0);
    let dob = map.get("DOB").expect("DOB suggested");
    assert_eq!(dob.value.as_deref(), Some("Date_of_Birth"));
    assert!(dob.confidence >= 0.3, "got {}", dob.confidence);
}

#[test]
fn exact_names_win_with_full_confidence() {
    let suggestion = engine()
        .suggest_mapping(
            &FieldDescriptor::new("  member id "),
            &columns(&["MemberNumber", "MEMBER ID"]),
            &MatchContext::default(),
        )
        .expect("suggestion");
    assert_eq!(suggestion.value.as_deref(), Some("MEMBER ID"));
    assert_eq!(suggestion.confidence, 1.0);
    assert_eq!(suggestion.algorithm, Algorithm::Exact);
}

#[test]
fn empty_inputs_are_safe() {
    let engine = engine();
    assert!(
        engine
            .batch_match(&[], &[], &MatchContext::default())
            .is_empty()
    );
    assert!(
        engine
            .suggest_mapping(&FieldDescriptor::new("DOB"), &[], &MatchContext::default())
            .is_none()
    );
    assert!(
        engine
            .batch_match(&fields(&["DOB"]), &[], &MatchContext::default())
            .is_empty()
    );
}

#[test]
fn unmatched_fields_are_omitted() {
    let map = engine().batch_match(
        &fields(&["Patient_ID", "Favorite_Color"]),
        &columns(&["PatientID"]),
        &MatchContext::default(),
    );
    assert!(map.contains("Patient_ID"));
    assert!(!map.contains("Favorite_Color"));
}

#[test]
fn cache_is_transparent() {
    let engine = engine();
    let field = FieldDescriptor::new("DOB");
    let cols = columns(&["PatientID", "Date_of_Birth", "BirthDate"]);
    let context = MatchContext::default();

    let first = engine.suggest_mapping(&field, &cols, &context);
    let cached = engine.suggest_mapping(&field, &cols, &context);
    engine.clear_cache();
    let recomputed = engine.suggest_mapping(&field, &cols, &context);

    assert_eq!(first, cached);
    assert_eq!(first, recomputed);
    let stats = engine.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 2);
}

#[test]
fn cache_disabled_gives_same_answers() {
    let cached = engine();
    let uncached = SuggestionEngine::new(MatcherConfig {
        cache_enabled: false,
        ..MatcherConfig::default()
    })
    .expect("valid config");
    let f = fields(&["Patient_ID", "DOB", "Zip"]);
    let c = columns(&["PatientID", "Date_of_Birth", "ZIP_CODE"]);
    let context = MatchContext::default();
    assert_eq!(
        cached.batch_match(&f, &c, &context),
        uncached.batch_match(&f, &c, &context)
    );
    assert_eq!(uncached.cache_stats().inserts, 0);
}

#[test]
fn corrections_apply_to_cached_results() {
    let engine = SuggestionEngine::new(MatcherConfig {
        normalization: onboard_map::Normalization::Absolute,
        ..MatcherConfig::default()
    })
    .expect("valid config");
    let field = FieldDescriptor::new("DOB");
    let cols = columns(&["Date_of_Birth", "BirthDate"]);
    let context = MatchContext::default();

    let before = engine
        .suggest_mapping(&field, &cols, &context)
        .expect("suggestion");
    assert_eq!(before.value.as_deref(), Some("Date_of_Birth"));

    engine.record_correction("DOB", Some("Date_of_Birth"), "BirthDate", None);
    let after = engine
        .suggest_mapping(&field, &cols, &context)
        .expect("suggestion");
    assert_eq!(after.value.as_deref(), Some("BirthDate"));
    assert_eq!(after.algorithm, Algorithm::Learned);
    assert_eq!(engine.cache_stats().hits, 1);
}

#[test]
fn learning_boost_caps_at_point_three() {
    let engine = engine();
    for _ in 0..100 {
        engine.record_correction("DOB", None, "BirthDate", None);
    }
    assert_eq!(engine.learner().get_confidence_boost("DOB", "BirthDate"), 0.3);
}

#[test]
fn shared_learner_and_cache() {
    let learner = Arc::new(CorrectionLearner::new());
    let cache = Arc::new(SuggestionCache::new());
    let a = engine()
        .with_learner(Arc::clone(&learner))
        .with_cache(Arc::clone(&cache));
    let b = engine()
        .with_learner(Arc::clone(&learner))
        .with_cache(Arc::clone(&cache));

    a.record_correction("Zip", None, "C7", None);
    assert_eq!(b.learner().count("Zip", "C7"), 1);

    let cols = columns(&["PatientID", "Date_of_Birth"]);
    a.suggest_mapping(&FieldDescriptor::new("DOB"), &cols, &MatchContext::default());
    b.suggest_mapping(&FieldDescriptor::new("DOB"), &cols, &MatchContext::default());
    assert_eq!(cache.stats().hits, 1);
}

#[test]
fn alternates_descend_and_are_capped() {
    let config = MatcherConfig {
        max_alternates: 2,
        ..MatcherConfig::relaxed()
    };
    let engine = SuggestionEngine::new(config).expect("valid config");
    let suggestion = engine
        .suggest_mapping(
            &FieldDescriptor::new("Amount"),
            &columns(&["AmountA", "AmountB", "Amounts", "Amt", "Total_Amount"]),
            &MatchContext::default(),
        )
        .expect("suggestion");
    assert!(suggestion.alternates.len() <= 2);
    let mut last = suggestion.confidence;
    for alternate in &suggestion.alternates {
        assert!(alternate.confidence <= last);
        last = alternate.confidence;
    }
}

#[test]
fn equal_scores_keep_column_order() {
    let suggestion = engine()
        .suggest_mapping(
            &FieldDescriptor::new("Amount"),
            &columns(&["AmountB", "AmountC", "AmountA"]),
            &MatchContext::default(),
        )
        .expect("suggestion");
    assert_eq!(suggestion.value.as_deref(), Some("AmountB"));
    let alternates: Vec<&str> = suggestion
        .alternates
        .iter()
        .map(|a| a.column.as_str())
        .collect();
    assert_eq!(alternates, vec!["AmountC", "AmountA"]);
    assert_eq!(suggestion.alternates[0].confidence, suggestion.confidence);
    assert_eq!(suggestion.alternates[1].confidence, suggestion.confidence);
}

#[test]
fn boost_that_ties_at_full_confidence_keeps_column_order() {
    let engine = engine();
    engine.record_correction("Amount", Some("AmountB"), "AmountA", None);
    let suggestion = engine
        .suggest_mapping(
            &FieldDescriptor::new("Amount"),
            &columns(&["AmountB", "AmountC", "AmountA"]),
            &MatchContext::default(),
        )
        .expect("suggestion");
    assert_eq!(suggestion.confidence, 1.0);
    assert_eq!(suggestion.value.as_deref(), Some("AmountB"));
    assert_eq!(suggestion.algorithm, Algorithm::Hybrid);
    let alternates: Vec<(&str, f64)> = suggestion
        .alternates
        .iter()
        .map(|a| (a.column.as_str(), a.confidence))
        .collect();
    assert_eq!(alternates, vec![("AmountC", 1.0), ("AmountA", 1.0)]);
}

#[test]
fn context_breaks_name_ties() {
    let field = FieldDescriptor::new("Phone").with_category("contact");
    let context = MatchContext::default()
        .with_group("Phone_1", "billing")
        .with_group("Phone_2", "contact");
    let suggestion = engine()
        .suggest_mapping(&field, &columns(&["Phone_1", "Phone_2"]), &context)
        .expect("suggestion");
    assert_eq!(suggestion.value.as_deref(), Some("Phone_2"));
    assert_eq!(suggestion.alternates[0].column, "Phone_1");
}

#[test]
fn sample_values_drive_pattern_matches() {
    let field = FieldDescriptor::new("Service_Date");
    let cols = vec![
        ColumnDescriptor::new("Col_A").with_samples(["Smith", "Jones"]),
        ColumnDescriptor::new("Col_B").with_samples(["2024-01-05", "2024-02-11"]),
    ];
    let suggestion = engine()
        .suggest_mapping(&field, &cols, &MatchContext::default())
        .expect("suggestion");
    assert_eq!(suggestion.value.as_deref(), Some("Col_B"));
}

#[test]
fn parallel_batch_matches_sequential() {
    let engine = engine();
    let f = fields(&["Patient_ID", "DOB", "Zip", "Claim_Amount", "Provider_NPI"]);
    let c = vec![
        ColumnDescriptor::new("PatientID"),
        ColumnDescriptor::new("Date_of_Birth"),
        ColumnDescriptor::new("postal").with_samples(["02139"]),
        ColumnDescriptor::new("amt_paid").with_dtype("float64"),
        ColumnDescriptor::new("npi_number").with_samples(["1234567893"]),
    ];
    let context = MatchContext::default();
    let sequential = engine.batch_match(&f, &c, &context);
    engine.clear_cache();
    let parallel = engine.batch_match_parallel(&f, &c, &context);
    assert_eq!(sequential, parallel);
}

#[test]
fn prior_mapping_round_trips() {
    let engine = engine();
    let f = fields(&["Patient_ID", "DOB"]);
    let c = columns(&["PatientID", "Date_of_Birth"]);
    let context = MatchContext::default();
    let first = engine.batch_match(&f, &c, &context);

    let prior = first.to_mapping_dict();
    assert_eq!(
        prior.get("DOB"),
        Some(&MappingEntry {
            value: Some("Date_of_Birth".to_string())
        })
    );
    let again = engine.batch_match_with_prior(&f, &c, &context, &prior);
    assert!(again.iter().all(|s| s.algorithm == Algorithm::Prior));
    assert_eq!(again.to_mapping_dict(), prior);
}

#[test]
fn summary_counts_auto_mapped() {
    let engine = engine();
    let f = fields(&["Patient_ID", "DOB", "Favorite_Color"]);
    let map = engine.batch_match(
        &f,
        &columns(&["PatientID", "Date_of_Birth"]),
        &MatchContext::default(),
    );
    let summary = MatchSummary::new(&f, &map);
    assert_eq!(summary.suggested, 2);
    assert_eq!(summary.unmapped, vec!["Favorite_Color".to_string()]);
    assert_eq!(summary.auto_mapped, 2);
}

/// Always prefers the last column.
struct LastColumnMatcher;

impl Matcher for LastColumnMatcher {
    fn strategy(&self) -> MatchStrategy {
        MatchStrategy::Context
    }

    fn rank(
        &self,
        _field: &FieldDescriptor,
        columns: &[ColumnDescriptor],
        _context: &MatchContext,
    ) -> Vec<MatchCandidate> {
        columns
            .last()
            .map(|c| vec![MatchCandidate::new(&c.name, 1.0, Algorithm::Context)])
            .unwrap_or_default()
    }
}

#[test]
fn custom_registry_is_used() {
    let mut registry = StrategyRegistry::empty();
    registry.register(Box::new(LastColumnMatcher));
    let engine = engine().with_registry(registry);
    let suggestion = engine
        .suggest_mapping(
            &FieldDescriptor::new("Anything"),
            &columns(&["First", "Last"]),
            &MatchContext::default(),
        )
        .expect("suggestion");
    assert_eq!(suggestion.value.as_deref(), Some("Last"));
    assert_eq!(suggestion.alternates.len(), 0);
}
