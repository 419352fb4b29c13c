//! Property tests over generated schemas.

use onboard_map::{MatcherConfig, SuggestionEngine, exact_score, fuzzy_score, semantic_score};
use onboard_model::{ColumnDescriptor, FieldDescriptor, MatchContext};
use proptest::prelude::*;

fn name() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z][A-Za-z0-9_ ]{0,14}",
        Just("Patient_ID".to_string()),
        Just("DOB".to_string()),
        Just("Date_of_Birth".to_string()),
        Just("ZIP".to_string()),
        Just("Claim Amount".to_string()),
    ]
}

fn sample() -> impl Strategy<Value = String> {
    prop_oneof![
        "[0-9]{5}",
        "[0-9]{10}",
        "20[0-9]{2}-0[1-9]-1[0-9]",
        "[a-z]{0,8}",
    ]
}

fn column() -> impl Strategy<Value = ColumnDescriptor> {
    (name(), prop::collection::vec(sample(), 0..4))
        .prop_map(|(name, samples)| ColumnDescriptor::new(name).with_samples(samples))
}

fn engine() -> SuggestionEngine {
    SuggestionEngine::new(MatcherConfig::default()).expect("valid config")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn primitives_are_bounded_and_symmetric(a in name(), b in name()) {
        for score in [exact_score(&a, &b), fuzzy_score(&a, &b), semantic_score(&a, &b)] {
            prop_assert!((0.0..=1.0).contains(&score));
        }
        prop_assert_eq!(fuzzy_score(&a, &b), fuzzy_score(&b, &a));
        prop_assert_eq!(exact_score(&a, &b), exact_score(&b, &a));
    }

    #[test]
    fn confidence_is_bounded(
        field in name(),
        columns in prop::collection::vec(column(), 0..6),
    ) {
        let engine = engine();
        if let Some(suggestion) =
            engine.suggest_mapping(&FieldDescriptor::new(field), &columns, &MatchContext::default())
        {
            prop_assert!((0.0..=1.0).contains(&suggestion.confidence));
            for alternate in &suggestion.alternates {
                prop_assert!((0.0..=1.0).contains(&alternate.confidence));
            }
        }
    }

    #[test]
    fn alternates_descend(
        field in name(),
        columns in prop::collection::vec(column(), 1..8),
    ) {
        let engine = engine();
        if let Some(suggestion) =
            engine.suggest_mapping(&FieldDescriptor::new(field), &columns, &MatchContext::default())
        {
            let mut last = suggestion.confidence;
            for alternate in &suggestion.alternates {
                prop_assert!(alternate.confidence <= last);
                last = alternate.confidence;
            }
        }
    }

    #[test]
    fn deterministic_and_cache_transparent(
        fields in prop::collection::vec(name(), 0..4),
        columns in prop::collection::vec(column(), 0..6),
    ) {
        let fields: Vec<FieldDescriptor> = fields.into_iter().map(FieldDescriptor::new).collect();
        let context = MatchContext::default();

        let engine = engine();
        let first = engine.batch_match(&fields, &columns, &context);
        let cached = engine.batch_match(&fields, &columns, &context);
        engine.clear_cache();
        let recomputed = engine.batch_match(&fields, &columns, &context);
        let fresh = self::engine().batch_match_parallel(&fields, &columns, &context);

        prop_assert_eq!(&first, &cached);
        prop_assert_eq!(&first, &recomputed);
        prop_assert_eq!(&first, &fresh);
    }

    #[test]
    fn exact_names_always_win(
        field in "[A-Za-z][A-Za-z0-9]{0,10}",
        others in prop::collection::vec(column(), 0..4),
    ) {
        let mut columns = others;
        columns.push(ColumnDescriptor::new(format!("  {}  ", field.to_uppercase())));
        let suggestion = engine()
            .suggest_mapping(&FieldDescriptor::new(field), &columns, &MatchContext::default())
            .expect("exact match present");
        prop_assert_eq!(suggestion.confidence, 1.0);
        prop_assert_eq!(suggestion.algorithm, onboard_model::Algorithm::Exact);
    }
}
