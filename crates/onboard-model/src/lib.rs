//! Data model for mapping uploaded source columns onto a target layout.
//!
//! These types are shared by the suggestion engine and its callers. They carry
//! no behavior beyond construction, validation and serialization.

pub mod context;
pub mod correction;
pub mod descriptor;
pub mod error;
pub mod suggestion;

pub use context::MatchContext;
pub use correction::CorrectionRecord;
pub use descriptor::{
    ColumnDescriptor, FieldDescriptor, MAX_SAMPLE_VALUES, validate_columns, validate_fields,
};
pub use error::{ModelError, Result};
pub use suggestion::{
    Algorithm, Alternate, MappingDict, MappingEntry, MappingSuggestion, MatchCandidate,
    SuggestionMap, SuggestionRecord,
};
