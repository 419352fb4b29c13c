//! Suggestion types produced by the mapping engine.
//!
//! A [`MappingSuggestion`] is the externally visible result unit: one per
//! target field per matching run. [`SuggestionMap`] keeps them in the order
//! the fields were supplied so UIs render them stably.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Which matching step produced a score or decided a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Exact,
    Fuzzy,
    Semantic,
    Context,
    Pattern,
    Hybrid,
    Learned,
    Prior,
    Assistant,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::Semantic => "semantic",
            Self::Context => "context",
            Self::Pattern => "pattern",
            Self::Hybrid => "hybrid",
            Self::Learned => "learned",
            Self::Prior => "prior",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column scored by one strategy. Score is always within `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub column_name: String,
    pub score: f64,
    pub algorithm: Algorithm,
}

impl MatchCandidate {
    /// Create a candidate, clamping the score into `0.0..=1.0`.
    pub fn new(column_name: impl Into<String>, score: f64, algorithm: Algorithm) -> Self {
        Self {
            column_name: column_name.into(),
            score: clamp_unit(score),
            algorithm,
        }
    }
}

/// A runner-up column for a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternate {
    pub column: String,
    pub confidence: f64,
}

/// The engine's proposal for one target field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingSuggestion {
    pub field_name: String,
    /// Chosen source column, or `None` when nothing qualified.
    pub value: Option<String>,
    /// Final confidence in `0.0..=1.0`.
    pub confidence: f64,
    pub algorithm: Algorithm,
    /// Confidence before any learned boost was added.
    #[serde(default)]
    pub base_confidence: f64,
    /// Boost contributed by recorded corrections for the chosen column.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub learned_boost: f64,
    /// Other candidates, highest confidence first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternates: Vec<Alternate>,
}

impl MappingSuggestion {
    /// A suggestion that maps `field_name` to `column`.
    pub fn mapped(
        field_name: impl Into<String>,
        column: impl Into<String>,
        confidence: f64,
        algorithm: Algorithm,
    ) -> Self {
        let confidence = clamp_unit(confidence);
        Self {
            field_name: field_name.into(),
            value: Some(column.into()),
            confidence,
            algorithm,
            base_confidence: confidence,
            learned_boost: 0.0,
            alternates: Vec::new(),
        }
    }

    /// A suggestion recording that no column qualified.
    pub fn unmapped(field_name: impl Into<String>, algorithm: Algorithm) -> Self {
        Self {
            field_name: field_name.into(),
            value: None,
            confidence: 0.0,
            algorithm,
            base_confidence: 0.0,
            learned_boost: 0.0,
            alternates: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_alternates(mut self, alternates: Vec<Alternate>) -> Self {
        self.alternates = alternates;
        self
    }

    pub fn is_mapped(&self) -> bool {
        self.value.is_some()
    }

    /// Flat record used by template storage and the assistant round-trip.
    pub fn to_record(&self) -> SuggestionRecord {
        SuggestionRecord {
            value: self.value.clone(),
            confidence: self.confidence,
            algorithm: self.algorithm,
        }
    }
}

/// Flat `(value, confidence, algorithm)` view of a suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionRecord {
    pub value: Option<String>,
    pub confidence: f64,
    pub algorithm: Algorithm,
}

/// `{"value": column}` entry of a mapping dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    pub value: Option<String>,
}

/// `{target_field: {"value": source_column}}` dictionary consumed by the
/// transformation pipeline.
pub type MappingDict = BTreeMap<String, MappingEntry>;

/// Suggestions keyed by field name, in the order fields were supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuggestionMap {
    entries: Vec<MappingSuggestion>,
    /// Field name to position in `entries`.
    index: HashMap<String, usize>,
}

impl SuggestionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a suggestion. A suggestion for an existing field replaces it in place.
    pub fn insert(&mut self, suggestion: MappingSuggestion) {
        match self.index.get(&suggestion.field_name) {
            Some(&position) => self.entries[position] = suggestion,
            None => {
                self.index.insert(suggestion.field_name.clone(), self.entries.len());
                self.entries.push(suggestion);
            }
        }
    }

    pub fn get(&self, field_name: &str) -> Option<&MappingSuggestion> {
        self.index
            .get(field_name)
            .and_then(|&position| self.entries.get(position))
    }

    pub fn contains(&self, field_name: &str) -> bool {
        self.get(field_name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MappingSuggestion> {
        self.entries.iter()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|s| s.field_name.as_str())
    }

    pub fn into_vec(self) -> Vec<MappingSuggestion> {
        self.entries
    }

    /// Convert to the `{field: {"value": column}}` shape.
    pub fn to_mapping_dict(&self) -> MappingDict {
        self.entries
            .iter()
            .map(|s| {
                (
                    s.field_name.clone(),
                    MappingEntry {
                        value: s.value.clone(),
                    },
                )
            })
            .collect()
    }

    /// Flat records in field order.
    pub fn to_records(&self) -> Vec<(String, SuggestionRecord)> {
        self.entries
            .iter()
            .map(|s| (s.field_name.clone(), s.to_record()))
            .collect()
    }
}

impl FromIterator<MappingSuggestion> for SuggestionMap {
    fn from_iter<T: IntoIterator<Item = MappingSuggestion>>(iter: T) -> Self {
        let mut map = Self::new();
        for suggestion in iter {
            map.insert(suggestion);
        }
        map
    }
}

impl IntoIterator for SuggestionMap {
    type Item = MappingSuggestion;
    type IntoIter = std::vec::IntoIter<MappingSuggestion>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for SuggestionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for suggestion in &self.entries {
            map.serialize_entry(&suggestion.field_name, suggestion)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SuggestionMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SuggestionMapVisitor;

        impl<'de> Visitor<'de> for SuggestionMapVisitor {
            type Value = SuggestionMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to suggestions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = SuggestionMap::new();
                while let Some((field_name, mut suggestion)) =
                    access.next_entry::<String, MappingSuggestion>()?
                {
                    suggestion.field_name = field_name;
                    map.insert(suggestion);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(SuggestionMapVisitor)
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn is_zero(value: &f64) -> bool {
    *value == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_score_is_clamped() {
        assert_eq!(MatchCandidate::new("A", 1.7, Algorithm::Fuzzy).score, 1.0);
        assert_eq!(MatchCandidate::new("A", -0.2, Algorithm::Fuzzy).score, 0.0);
        assert_eq!(MatchCandidate::new("A", f64::NAN, Algorithm::Fuzzy).score, 0.0);
    }

    #[test]
    fn mapping_dict_shape() {
        let mut map = SuggestionMap::new();
        map.insert(MappingSuggestion::mapped("DOB", "Date_of_Birth", 0.9, Algorithm::Hybrid));
        let json = serde_json::to_value(map.to_mapping_dict()).expect("serialize dict");
        assert_eq!(json["DOB"]["value"], "Date_of_Birth");
    }

    #[test]
    fn insert_replaces_existing_field() {
        let mut map = SuggestionMap::new();
        map.insert(MappingSuggestion::mapped("DOB", "A", 0.4, Algorithm::Fuzzy));
        map.insert(MappingSuggestion::mapped("DOB", "B", 0.9, Algorithm::Learned));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("DOB").and_then(|s| s.value.as_deref()), Some("B"));
    }

    #[test]
    fn replacing_keeps_field_position() {
        let mut map: SuggestionMap = ["Patient_ID", "DOB", "Zip"]
            .into_iter()
            .map(|field| MappingSuggestion::unmapped(field, Algorithm::Hybrid))
            .collect();
        map.insert(MappingSuggestion::mapped("DOB", "BirthDate", 0.8, Algorithm::Prior));
        map.insert(MappingSuggestion::unmapped("Phone", Algorithm::Hybrid));

        let names: Vec<&str> = map.field_names().collect();
        assert_eq!(names, vec!["Patient_ID", "DOB", "Zip", "Phone"]);
        assert_eq!(map.get("DOB").map(|s| s.algorithm), Some(Algorithm::Prior));
        assert!(map.contains("Phone"));
        assert!(map.get("Missing").is_none());

        let rebuilt: SuggestionMap = map.clone().into_iter().collect();
        assert_eq!(rebuilt, map);
    }

    #[test]
    fn record_is_flat() {
        let record = MappingSuggestion::mapped("DOB", "BirthDate", 0.75, Algorithm::Hybrid)
            .to_record();
        let json = serde_json::to_value(&record).expect("serialize record");
        assert_eq!(json["value"], "BirthDate");
        assert_eq!(json["algorithm"], "hybrid");
    }
}
