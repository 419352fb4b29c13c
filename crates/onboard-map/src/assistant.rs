//! Bridge to an external chat assistant.
//!
//! [`build_prompt`] renders the schemas as a prompt the user pastes into an
//! assistant; [`parse_reply`] maps whatever comes back (JSON, fenced JSON or
//! `field -> column` lines) onto [`MappingSuggestion`]s. Sample values are
//! never included in the prompt.

use std::fmt::Write as _;
use std::sync::LazyLock;

use onboard_model::{
    Algorithm, ColumnDescriptor, FieldDescriptor, MappingSuggestion, SuggestionMap,
};
use rapidfuzz::distance::jaro_winkler;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::utils::normalize_text;

/// Confidence used when the reply does not state one.
pub const DEFAULT_ASSISTANT_CONFIDENCE: f64 = 0.8;
/// Minimum Jaro-Winkler similarity to accept a misspelled column name.
pub const COLUMN_SIMILARITY_MIN: f64 = 0.92;

static FENCED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*\s*\n(.*?)```").expect("Invalid fenced block regex")
});

static LINE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*]\s+|\d+[.)]\s+)?(.+?)\s*(?:->|=>|:)\s*(.+?)\s*$")
        .expect("Invalid reply line regex")
});

/// Why a reply entry was not turned into a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    UnknownField,
    UnknownColumn,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedEntry {
    pub field: String,
    pub column: Option<String>,
    pub reason: RejectReason,
}

/// Outcome of parsing an assistant reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplyParse {
    pub suggestions: SuggestionMap,
    pub rejected: Vec<RejectedEntry>,
}

/// Render a prompt asking for a JSON mapping of fields to columns.
pub fn build_prompt(fields: &[FieldDescriptor], columns: &[ColumnDescriptor]) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "Map each target field to the source column that should populate it.\n\
         Reply with a single JSON object keyed by target field name, for example:\n\
         {\"FIELD\": {\"value\": \"COLUMN\", \"confidence\": 0.9}}\n\
         Use null as the value when no column fits. Only use the names listed below.\n\n",
    );

    prompt.push_str("Target fields:\n");
    for field in fields {
        let _ = write!(prompt, "- {}", field.name);
        let details: Vec<String> = [
            field.description.as_deref().map(|d| format!("description: {d}")),
            field.category.as_deref().map(|c| format!("category: {c}")),
            field.expected_type.as_deref().map(|t| format!("type: {t}")),
            field.example_value.as_deref().map(|e| format!("example: {e}")),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !details.is_empty() {
            let _ = write!(prompt, " ({})", details.join("; "));
        }
        prompt.push('\n');
    }

    prompt.push_str("\nSource columns:\n");
    for column in columns {
        let _ = write!(prompt, "- {}", column.name);
        let details: Vec<String> = [
            column.dtype.as_deref().map(|d| format!("type: {d}")),
            column.label.as_deref().map(|l| format!("label: {l}")),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !details.is_empty() {
            let _ = write!(prompt, " ({})", details.join("; "));
        }
        prompt.push('\n');
    }
    prompt
}

/// One `(field, column, confidence)` triple as found in the reply.
#[derive(Debug)]
struct RawEntry {
    field: String,
    column: Option<String>,
    confidence: Option<f64>,
}

/// Parse an assistant reply into suggestions tagged `assistant`.
///
/// Names are resolved against the schemas case-insensitively; column names
/// may also be slightly misspelled. Entries whose value is null are treated
/// as "no column" and skipped. Confidences are clamped to `0.0..=1.0`.
pub fn parse_reply(
    reply: &str,
    fields: &[FieldDescriptor],
    columns: &[ColumnDescriptor],
) -> ReplyParse {
    let entries = extract_json(reply)
        .map(|value| entries_from_json(&value))
        .unwrap_or_else(|| entries_from_lines(reply));

    let mut found = SuggestionMap::new();
    let mut rejected = Vec::new();
    for entry in entries {
        let Some(field) = resolve_field(&entry.field, fields) else {
            rejected.push(RejectedEntry {
                field: entry.field,
                column: entry.column,
                reason: RejectReason::UnknownField,
            });
            continue;
        };
        let Some(raw_column) = entry.column else {
            continue;
        };
        let Some(column) = resolve_column(&raw_column, columns) else {
            rejected.push(RejectedEntry {
                field: entry.field,
                column: Some(raw_column),
                reason: RejectReason::UnknownColumn,
            });
            continue;
        };
        let confidence = entry
            .confidence
            .filter(|c| c.is_finite())
            .unwrap_or(DEFAULT_ASSISTANT_CONFIDENCE);
        found.insert(MappingSuggestion::mapped(
            field,
            column,
            confidence,
            Algorithm::Assistant,
        ));
    }
    // Later entries for the same field win; output follows field order.
    let parsed = ReplyParse {
        suggestions: fields
            .iter()
            .filter_map(|f| found.get(&f.name).cloned())
            .collect(),
        rejected,
    };
    debug!(
        suggestions = parsed.suggestions.len(),
        rejected = parsed.rejected.len(),
        "Parsed assistant reply"
    );
    parsed
}

/// Find a JSON object or array: fenced blocks first, then the outermost
/// braces or brackets of the whole reply.
fn extract_json(reply: &str) -> Option<Value> {
    for capture in FENCED_REGEX.captures_iter(reply) {
        if let Some(body) = capture.get(1)
            && let Ok(value) = serde_json::from_str::<Value>(body.as_str().trim())
            && (value.is_object() || value.is_array())
        {
            return Some(value);
        }
    }
    // Whichever bracket opens first encloses the payload.
    let mut spans = [('{', '}'), ('[', ']')];
    if reply.find('[').is_some_and(|arr| reply.find('{').is_none_or(|obj| arr < obj)) {
        spans.reverse();
    }
    for (open, close) in spans {
        let (Some(start), Some(end)) = (reply.find(open), reply.rfind(close)) else {
            continue;
        };
        if start < end
            && let Ok(value) = serde_json::from_str::<Value>(&reply[start..=end])
        {
            return Some(value);
        }
    }
    None
}

fn entries_from_json(value: &Value) -> Vec<RawEntry> {
    match value {
        Value::Object(object) => object
            .iter()
            .map(|(field, value)| {
                let (column, confidence) = column_and_confidence(value);
                RawEntry {
                    field: field.clone(),
                    column,
                    confidence,
                }
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let object = item.as_object()?;
                let field = ["field", "field_name", "target"]
                    .iter()
                    .find_map(|key| object.get(*key).and_then(Value::as_str))?;
                let column = ["value", "column", "source"]
                    .iter()
                    .find_map(|key| object.get(*key).and_then(Value::as_str))
                    .map(str::to_string);
                Some(RawEntry {
                    field: field.to_string(),
                    column,
                    confidence: object.get("confidence").and_then(number),
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn column_and_confidence(value: &Value) -> (Option<String>, Option<f64>) {
    match value {
        Value::String(column) => (Some(column.clone()), None),
        Value::Object(object) => {
            let column = ["value", "column", "source"]
                .iter()
                .find_map(|key| object.get(*key).and_then(Value::as_str))
                .map(str::to_string);
            (column, object.get("confidence").and_then(number))
        }
        _ => (None, None),
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn entries_from_lines(reply: &str) -> Vec<RawEntry> {
    reply
        .lines()
        .filter_map(|line| {
            let captures = LINE_REGEX.captures(line)?;
            let field = strip_quotes(captures.get(1)?.as_str());
            let column = strip_quotes(captures.get(2)?.as_str());
            if field.is_empty() {
                return None;
            }
            let column = match column.to_lowercase().as_str() {
                "" | "null" | "none" | "n/a" => None,
                _ => Some(column.to_string()),
            };
            Some(RawEntry {
                field: field.to_string(),
                column,
                confidence: None,
            })
        })
        .collect()
}

fn strip_quotes(raw: &str) -> &str {
    raw.trim().trim_matches(|c| matches!(c, '"' | '\'' | '`' | ',')).trim()
}

fn resolve_field<'a>(name: &str, fields: &'a [FieldDescriptor]) -> Option<&'a str> {
    if let Some(field) = fields.iter().find(|f| f.name == name) {
        return Some(field.name.as_str());
    }
    let wanted = normalize_text(name);
    fields
        .iter()
        .find(|f| normalize_text(&f.name) == wanted)
        .map(|f| f.name.as_str())
}

fn resolve_column<'a>(name: &str, columns: &'a [ColumnDescriptor]) -> Option<&'a str> {
    if let Some(column) = columns.iter().find(|c| c.name == name) {
        return Some(column.name.as_str());
    }
    let wanted = normalize_text(name);
    if wanted.is_empty() {
        return None;
    }
    if let Some(column) = columns.iter().find(|c| normalize_text(&c.name) == wanted) {
        return Some(column.name.as_str());
    }

    let mut best: Option<(&str, f64)> = None;
    for column in columns {
        let score = jaro_winkler::similarity(wanted.chars(), normalize_text(&column.name).chars());
        if score >= COLUMN_SIMILARITY_MIN && best.is_none_or(|(_, top)| score > top) {
            best = Some((column.name.as_str(), score));
        }
    }
    best.map(|(name, _)| name)
}
