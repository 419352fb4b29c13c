//! Target field and source column descriptors.
//!
//! Both are built fresh from the external schemas for each matching session
//! and are never mutated while the engine works on them.

use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ModelError, Result};

/// Upper bound on sample values kept per source column.
pub const MAX_SAMPLE_VALUES: usize = 10;

/// A named slot in the target layout that must be populated from source data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Target field identifier, unique within the layout.
    pub name: String,
    /// Optional free-text description from the layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional category or group the field belongs to.
    #[serde(default, alias = "group", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Free-form type tag (e.g. "date", "numeric", "text").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_type: Option<String>,
    /// Example value shown in the layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_value: Option<String>,
    /// Usage flag from the layout (e.g. "mandatory", "optional").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            category: None,
            expected_type: None,
            example_value: None,
            usage: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    #[must_use]
    pub fn with_expected_type(mut self, expected_type: impl Into<String>) -> Self {
        self.expected_type = Some(expected_type.into());
        self
    }

    #[must_use]
    pub fn with_example_value(mut self, example: impl Into<String>) -> Self {
        self.example_value = Some(example.into());
        self
    }
}

/// A column present in the uploaded source dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Source column identifier, unique within one source schema.
    pub name: String,
    /// Optional dtype tag reported by the file parser.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<String>,
    /// Ordered sample of raw values, at most [`MAX_SAMPLE_VALUES`].
    #[serde(
        default,
        deserialize_with = "deserialize_samples",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub samples: Vec<String>,
    /// Optional label or description carried by the source metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ColumnDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dtype: None,
            samples: Vec::new(),
            label: None,
        }
    }

    #[must_use]
    pub fn with_dtype(mut self, dtype: impl Into<String>) -> Self {
        self.dtype = Some(dtype.into());
        self
    }

    /// Attach sample values, keeping only the first [`MAX_SAMPLE_VALUES`].
    #[must_use]
    pub fn with_samples<I, S>(mut self, samples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.samples = samples
            .into_iter()
            .take(MAX_SAMPLE_VALUES)
            .map(Into::into)
            .collect();
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Scalar accepted as a sample value in JSON schemas.
#[derive(Deserialize)]
#[serde(untagged)]
enum SampleScalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl SampleScalar {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Integer(value) => value.to_string(),
            Self::Float(value) => value.to_string(),
            Self::Bool(value) => value.to_string(),
        }
    }
}

/// Accept strings, numbers, booleans and nulls; nulls become empty strings.
fn deserialize_samples<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Option<SampleScalar>> = Vec::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .take(MAX_SAMPLE_VALUES)
        .map(|value| value.map(SampleScalar::into_text).unwrap_or_default())
        .collect())
}

/// Check that every field has a non-empty, unique name.
pub fn validate_fields(fields: &[FieldDescriptor]) -> Result<()> {
    validate_names("field", fields.iter().map(|f| f.name.as_str()))
}

/// Check that every column has a non-empty, unique name.
pub fn validate_columns(columns: &[ColumnDescriptor]) -> Result<()> {
    validate_names("column", columns.iter().map(|c| c.name.as_str()))
}

fn validate_names<'a>(kind: &'static str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = BTreeSet::new();
    for (position, name) in names.enumerate() {
        if name.trim().is_empty() {
            return Err(ModelError::EmptyName { kind, position });
        }
        if !seen.insert(name) {
            return Err(ModelError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_are_truncated() {
        let column = ColumnDescriptor::new("ZIP").with_samples((0..25).map(|n| n.to_string()));
        assert_eq!(column.samples.len(), MAX_SAMPLE_VALUES);
        assert_eq!(column.samples[0], "0");
    }

    #[test]
    fn samples_accept_json_scalars() {
        let column: ColumnDescriptor =
            serde_json::from_str(r#"{"name":"AGE","samples":[42, "17", null, true, 1.5]}"#)
                .expect("parse column");
        assert_eq!(column.samples, vec!["42", "17", "", "true", "1.5"]);
    }

    #[test]
    fn field_group_alias() {
        let field: FieldDescriptor =
            serde_json::from_str(r#"{"name":"DOB","group":"demographics"}"#).expect("parse field");
        assert_eq!(field.category.as_deref(), Some("demographics"));
    }

    #[test]
    fn duplicate_column_rejected() {
        let columns = vec![ColumnDescriptor::new("A"), ColumnDescriptor::new("A")];
        let err = validate_columns(&columns).unwrap_err();
        assert_eq!(err.name(), Some("A"));
    }

    #[test]
    fn blank_field_rejected() {
        let fields = vec![FieldDescriptor::new("DOB"), FieldDescriptor::new("  ")];
        assert_eq!(
            validate_fields(&fields),
            Err(ModelError::EmptyName {
                kind: "field",
                position: 1
            })
        );
    }
}
