//! Batch result summaries.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use onboard_model::{FieldDescriptor, MappingSuggestion, SuggestionMap};
use serde::Serialize;

use crate::confidence::{ConfidenceLevel, ConfidenceThresholds};

/// Counts and confidence statistics for one batch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSummary {
    pub fields_total: usize,
    pub suggested: usize,
    /// Fields without a suggestion, in field order.
    pub unmapped: Vec<String>,
    pub by_level: BTreeMap<ConfidenceLevel, usize>,
    /// Suggestions below the low threshold.
    pub below_low: usize,
    /// Suggestions a UI would pre-fill without asking.
    pub auto_mapped: usize,
    pub mean_confidence: Option<f64>,
    pub min_confidence: Option<f64>,
    pub max_confidence: Option<f64>,
}

impl MatchSummary {
    /// Summarize with default thresholds.
    pub fn new(fields: &[FieldDescriptor], suggestions: &SuggestionMap) -> Self {
        Self::with_thresholds(fields, suggestions, &ConfidenceThresholds::default())
    }

    pub fn with_thresholds(
        fields: &[FieldDescriptor],
        suggestions: &SuggestionMap,
        thresholds: &ConfidenceThresholds,
    ) -> Self {
        let mapped: Vec<&MappingSuggestion> =
            suggestions.iter().filter(|s| s.is_mapped()).collect();

        let mut by_level = BTreeMap::new();
        let mut below_low = 0;
        for suggestion in &mapped {
            match thresholds.categorize(suggestion.confidence) {
                Some(level) => *by_level.entry(level).or_insert(0) += 1,
                None => below_low += 1,
            }
        }

        let confidences = || mapped.iter().map(|s| s.confidence);
        let mean_confidence = if mapped.is_empty() {
            None
        } else {
            Some(confidences().sum::<f64>() / mapped.len() as f64)
        };

        Self {
            fields_total: fields.len(),
            suggested: mapped.len(),
            unmapped: fields
                .iter()
                .filter(|f| !suggestions.get(&f.name).is_some_and(MappingSuggestion::is_mapped))
                .map(|f| f.name.clone())
                .collect(),
            by_level,
            below_low,
            auto_mapped: confidences().filter(|c| thresholds.is_auto_mapped(*c)).count(),
            mean_confidence,
            min_confidence: confidences()
                .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal)),
            max_confidence: confidences()
                .max_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal)),
        }
    }

    pub fn count(&self, level: ConfidenceLevel) -> usize {
        self.by_level.get(&level).copied().unwrap_or(0)
    }

    /// Share of fields that received a suggestion.
    pub fn coverage(&self) -> f64 {
        if self.fields_total == 0 {
            0.0
        } else {
            self.suggested as f64 / self.fields_total as f64
        }
    }
}

/// Suggestions at or above `min_level`, in field order.
pub fn filter_by_level<'a>(
    suggestions: &'a SuggestionMap,
    min_level: ConfidenceLevel,
    thresholds: &ConfidenceThresholds,
) -> Vec<&'a MappingSuggestion> {
    suggestions
        .iter()
        .filter(|s| {
            thresholds
                .categorize(s.confidence)
                .is_some_and(|level| level >= min_level)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use onboard_model::Algorithm;

    fn batch() -> (Vec<FieldDescriptor>, SuggestionMap) {
        let fields = vec![
            FieldDescriptor::new("A"),
            FieldDescriptor::new("B"),
            FieldDescriptor::new("C"),
            FieldDescriptor::new("D"),
        ];
        let map: SuggestionMap = [
            MappingSuggestion::mapped("A", "a", 1.0, Algorithm::Exact),
            MappingSuggestion::mapped("B", "b", 0.85, Algorithm::Hybrid),
            MappingSuggestion::mapped("C", "c", 0.4, Algorithm::Hybrid),
        ]
        .into_iter()
        .collect();
        (fields, map)
    }

    #[test]
    fn counts_levels_and_unmapped() {
        let (fields, map) = batch();
        let summary = MatchSummary::new(&fields, &map);
        assert_eq!(summary.fields_total, 4);
        assert_eq!(summary.suggested, 3);
        assert_eq!(summary.unmapped, vec!["D".to_string()]);
        assert_eq!(summary.count(ConfidenceLevel::High), 1);
        assert_eq!(summary.count(ConfidenceLevel::Medium), 1);
        assert_eq!(summary.count(ConfidenceLevel::Low), 0);
        assert_eq!(summary.below_low, 1);
        assert_eq!(summary.auto_mapped, 2);
        assert_eq!(summary.min_confidence, Some(0.4));
        assert_eq!(summary.max_confidence, Some(1.0));
        assert!((summary.coverage() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn empty_batch() {
        let summary = MatchSummary::new(&[], &SuggestionMap::new());
        assert_eq!(summary.mean_confidence, None);
        assert_eq!(summary.coverage(), 0.0);
    }

    #[test]
    fn filter_keeps_field_order() {
        let (_, map) = batch();
        let kept = filter_by_level(&map, ConfidenceLevel::Medium, &ConfidenceThresholds::default());
        let names: Vec<&str> = kept.iter().map(|s| s.field_name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }
}
