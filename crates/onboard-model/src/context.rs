//! Free-form context maps assembled by the caller from the target layout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Optional metadata keyed by field or column name.
///
/// Every map may be empty; a missing or malformed member never makes a
/// matching call fail, it only removes that signal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchContext {
    /// Name -> group/category.
    pub groups: BTreeMap<String, String>,
    /// Name -> type tag.
    pub types: BTreeMap<String, String>,
    /// Name -> free-text description.
    pub descriptions: BTreeMap<String, String>,
}

impl MatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from arbitrary JSON, ignoring anything unexpected.
    ///
    /// Non-object members are treated as empty maps, and non-scalar values
    /// inside a map are skipped.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };
        Self {
            groups: lenient_map(object.get("groups")),
            types: lenient_map(object.get("types")),
            descriptions: lenient_map(object.get("descriptions")),
        }
    }

    #[must_use]
    pub fn with_group(mut self, name: impl Into<String>, group: impl Into<String>) -> Self {
        self.groups.insert(name.into(), group.into());
        self
    }

    #[must_use]
    pub fn with_type(mut self, name: impl Into<String>, type_tag: impl Into<String>) -> Self {
        self.types.insert(name.into(), type_tag.into());
        self
    }

    #[must_use]
    pub fn with_description(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.descriptions.insert(name.into(), description.into());
        self
    }

    pub fn group_of(&self, name: &str) -> Option<&str> {
        self.groups.get(name).map(String::as_str)
    }

    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.types.get(name).map(String::as_str)
    }

    pub fn description_of(&self, name: &str) -> Option<&str> {
        self.descriptions.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.types.is_empty() && self.descriptions.is_empty()
    }
}

fn lenient_map(value: Option<&Value>) -> BTreeMap<String, String> {
    let Some(object) = value.and_then(Value::as_object) else {
        return BTreeMap::new();
    };
    object
        .iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(text) => text.clone(),
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                _ => return None,
            };
            Some((key.clone(), text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn malformed_members_become_empty() {
        let context = MatchContext::from_value(&json!({
            "groups": ["not", "a", "map"],
            "types": {"DOB": "date", "Nested": {"x": 1}},
        }));
        assert!(context.groups.is_empty());
        assert_eq!(context.type_of("DOB"), Some("date"));
        assert_eq!(context.type_of("Nested"), None);
        assert!(context.descriptions.is_empty());
    }

    #[test]
    fn non_object_is_empty() {
        assert!(MatchContext::from_value(&json!("oops")).is_empty());
    }
}
