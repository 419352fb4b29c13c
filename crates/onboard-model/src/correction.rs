use serde::{Deserialize, Serialize};

use crate::context::MatchContext;

/// A user's override of a suggested mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRecord {
    pub field_name: String,
    /// The column the engine suggested, if it suggested one.
    #[serde(default)]
    pub suggested_column: Option<String>,
    /// The column the user picked instead.
    pub corrected_column: String,
    /// Context snapshot at the time of the correction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<MatchContext>,
}

impl CorrectionRecord {
    pub fn new(
        field_name: impl Into<String>,
        suggested_column: Option<String>,
        corrected_column: impl Into<String>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            suggested_column,
            corrected_column: corrected_column.into(),
            context: None,
        }
    }

    /// True when the user kept the suggested column.
    pub fn is_confirmation(&self) -> bool {
        self.suggested_column.as_deref() == Some(self.corrected_column.as_str())
    }
}
