//! Learning from user corrections.
//!
//! Every correction increments a `(field, column)` counter. Counters turn
//! into a bounded confidence boost so learned bias can shift a ranking but
//! never fully override the algorithmic score.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use onboard_model::{ColumnDescriptor, CorrectionRecord, MatchContext};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cap on the boost a column can receive.
pub const MAX_CONFIDENCE_BOOST: f64 = 0.3;
/// Corrections needed for a full point of boost (before the cap).
pub const CORRECTIONS_PER_POINT: f64 = 10.0;

/// `field -> column -> correction count`.
pub type LearnedPatterns = BTreeMap<String, BTreeMap<String, u32>>;

/// Serializable correction history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerSnapshot {
    pub records: Vec<CorrectionRecord>,
    pub patterns: LearnedPatterns,
}

#[derive(Debug, Default)]
struct LearnerState {
    records: Vec<CorrectionRecord>,
    patterns: LearnedPatterns,
}

/// Append-only correction log plus derived counters.
#[derive(Debug, Default)]
pub struct CorrectionLearner {
    state: RwLock<LearnerState>,
}

impl CorrectionLearner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a learner from a snapshot.
    ///
    /// Counters are taken from the snapshot as-is; records that are not
    /// reflected in them are not replayed.
    pub fn from_snapshot(snapshot: LearnerSnapshot) -> Self {
        Self {
            state: RwLock::new(LearnerState {
                records: snapshot.records,
                patterns: snapshot.patterns,
            }),
        }
    }

    /// Rebuild counters by replaying a correction log.
    pub fn from_records(records: impl IntoIterator<Item = CorrectionRecord>) -> Self {
        let learner = Self::new();
        for record in records {
            learner.push(record);
        }
        learner
    }

    fn read(&self) -> RwLockReadGuard<'_, LearnerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, LearnerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that the user mapped `field_name` to `corrected_column`.
    pub fn record_correction(
        &self,
        field_name: &str,
        suggested_column: Option<&str>,
        corrected_column: &str,
        context: Option<MatchContext>,
    ) {
        let mut record = CorrectionRecord::new(
            field_name,
            suggested_column.map(str::to_string),
            corrected_column,
        );
        record.context = context;
        self.push(record);
    }

    /// Append an existing record.
    pub fn push(&self, record: CorrectionRecord) {
        let mut state = self.write();
        let count = state
            .patterns
            .entry(record.field_name.clone())
            .or_default()
            .entry(record.corrected_column.clone())
            .or_insert(0);
        *count = count.saturating_add(1);
        debug!(
            field = %record.field_name,
            column = %record.corrected_column,
            count = *count,
            confirmation = record.is_confirmation(),
            "Recorded correction"
        );
        state.records.push(record);
    }

    /// Correction count for a `(field, column)` pair.
    pub fn count(&self, field_name: &str, column_name: &str) -> u32 {
        self.read()
            .patterns
            .get(field_name)
            .and_then(|columns| columns.get(column_name))
            .copied()
            .unwrap_or(0)
    }

    /// Every learned column for a field with its count.
    pub fn learned_columns(&self, field_name: &str) -> BTreeMap<String, u32> {
        self.read()
            .patterns
            .get(field_name)
            .cloned()
            .unwrap_or_default()
    }

    /// The available column with the most corrections for `field_name`.
    ///
    /// Ties go to the column listed first in `available_columns`.
    pub fn get_learned_suggestion(
        &self,
        field_name: &str,
        available_columns: &[ColumnDescriptor],
    ) -> Option<String> {
        let state = self.read();
        let learned = state.patterns.get(field_name)?;
        let mut best: Option<(&str, u32)> = None;
        for column in available_columns {
            let Some(&count) = learned.get(&column.name) else {
                continue;
            };
            if count > 0 && best.is_none_or(|(_, top)| count > top) {
                best = Some((column.name.as_str(), count));
            }
        }
        best.map(|(name, _)| name.to_string())
    }

    /// `min(0.3, count / 10)`.
    pub fn get_confidence_boost(&self, field_name: &str, column_name: &str) -> f64 {
        boost_for(self.count(field_name, column_name))
    }

    /// Number of recorded corrections.
    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().records.is_empty()
    }

    pub fn records(&self) -> Vec<CorrectionRecord> {
        self.read().records.clone()
    }

    pub fn snapshot(&self) -> LearnerSnapshot {
        let state = self.read();
        LearnerSnapshot {
            records: state.records.clone(),
            patterns: state.patterns.clone(),
        }
    }

    /// Forget every correction.
    pub fn reset(&self) {
        let mut state = self.write();
        state.records.clear();
        state.patterns.clear();
    }
}

/// Boost earned by `count` corrections.
pub fn boost_for(count: u32) -> f64 {
    (f64::from(count) / CORRECTIONS_PER_POINT).min(MAX_CONFIDENCE_BOOST)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(names: &[&str]) -> Vec<ColumnDescriptor> {
        names.iter().map(|n| ColumnDescriptor::new(*n)).collect()
    }

    #[test]
    fn boost_is_capped() {
        let learner = CorrectionLearner::new();
        for _ in 0..100 {
            learner.record_correction("DOB", Some("DOD"), "BirthDate", None);
        }
        assert_eq!(learner.get_confidence_boost("DOB", "BirthDate"), 0.3);
        assert_eq!(learner.count("DOB", "BirthDate"), 100);
        assert_eq!(learner.len(), 100);
    }

    #[test]
    fn boost_grows_per_correction() {
        let learner = CorrectionLearner::new();
        assert_eq!(learner.get_confidence_boost("DOB", "BirthDate"), 0.0);
        learner.record_correction("DOB", None, "BirthDate", None);
        assert!((learner.get_confidence_boost("DOB", "BirthDate") - 0.1).abs() < 1e-12);
        learner.record_correction("DOB", None, "BirthDate", None);
        assert!((learner.get_confidence_boost("DOB", "BirthDate") - 0.2).abs() < 1e-12);
    }

    #[test]
    fn learned_suggestion_prefers_count_then_order() {
        let learner = CorrectionLearner::new();
        learner.record_correction("DOB", None, "B", None);
        learner.record_correction("DOB", None, "A", None);
        assert_eq!(
            learner.get_learned_suggestion("DOB", &columns(&["A", "B"])),
            Some("A".to_string())
        );
        learner.record_correction("DOB", None, "B", None);
        assert_eq!(
            learner.get_learned_suggestion("DOB", &columns(&["A", "B"])),
            Some("B".to_string())
        );
        assert_eq!(learner.get_learned_suggestion("DOB", &columns(&["C"])), None);
        assert_eq!(learner.get_learned_suggestion("Zip", &columns(&["A"])), None);
    }

    #[test]
    fn snapshot_round_trips() {
        let learner = CorrectionLearner::new();
        learner.record_correction(
            "DOB",
            Some("DOD"),
            "BirthDate",
            Some(MatchContext::default().with_group("DOB", "demographics")),
        );
        let json = serde_json::to_string(&learner.snapshot()).expect("serialize snapshot");
        let restored =
            CorrectionLearner::from_snapshot(serde_json::from_str(&json).expect("parse snapshot"));
        assert_eq!(restored.count("DOB", "BirthDate"), 1);
        assert_eq!(restored.records(), learner.records());
    }

    #[test]
    fn replay_rebuilds_counts() {
        let records = vec![
            CorrectionRecord::new("Zip", None, "POSTAL"),
            CorrectionRecord::new("Zip", Some("POSTAL".to_string()), "POSTAL"),
        ];
        let learner = CorrectionLearner::from_records(records);
        assert_eq!(learner.count("Zip", "POSTAL"), 2);
        assert!(learner.records()[1].is_confirmation());
        learner.reset();
        assert!(learner.is_empty());
        assert_eq!(learner.count("Zip", "POSTAL"), 0);
    }
}
