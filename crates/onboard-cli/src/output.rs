//! Table and JSON rendering for command results.

use anyhow::{Context, Result};
use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use serde_json::json;

use onboard_map::{ConfidenceLevel, ConfidenceThresholds, RejectReason, ReplyParse};
use onboard_model::{Algorithm, MappingSuggestion};

use crate::commands::{ExplainReport, SuggestReport};

pub fn suggestions_table(report: &SuggestReport) -> Table {
    let thresholds = ConfidenceThresholds::default();
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Column"),
        header_cell("Confidence"),
        header_cell("Level"),
        header_cell("Algorithm"),
        header_cell("Alternates"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);

    for field in &report.fields {
        match report.suggestions.get(&field.name) {
            Some(suggestion) => table.add_row(vec![
                field_cell(&field.name),
                Cell::new(suggestion.value.as_deref().unwrap_or("-")),
                confidence_cell(suggestion.confidence, &thresholds),
                level_cell(thresholds.categorize(suggestion.confidence)),
                algorithm_cell(suggestion),
                alternates_cell(suggestion),
            ]),
            None => table.add_row(vec![
                field_cell(&field.name),
                dim_cell("unmapped"),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
                dim_cell("-"),
            ]),
        };
    }
    table
}

pub fn summary_line(report: &SuggestReport) -> String {
    let summary = &report.summary;
    let mut line = format!(
        "Suggested {}/{} fields ({:.0}%), {} auto-mapped",
        summary.suggested,
        summary.fields_total,
        summary.coverage() * 100.0,
        summary.auto_mapped
    );
    if let Some(mean) = summary.mean_confidence {
        line.push_str(&format!(", mean confidence {:.0}%", mean * 100.0));
    }
    line
}

pub fn suggestions_json(report: &SuggestReport) -> Result<String> {
    let value = json!({
        "suggestions": report.suggestions,
        "summary": report.summary,
        "cache": report.cache,
    });
    serde_json::to_string_pretty(&value).context("serialize suggestions")
}

pub fn explain_table(report: &ExplainReport) -> Table {
    let thresholds = ConfidenceThresholds::default();
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Rank"),
        header_cell("Column"),
        header_cell("Confidence"),
        header_cell("Raw"),
        header_cell("Breakdown"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Right);

    for (rank, candidate) in report.candidates.iter().enumerate() {
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(&candidate.column),
            confidence_cell(candidate.confidence, &thresholds),
            Cell::new(format!("{:.3}", candidate.raw)),
            Cell::new(candidate.explain()),
        ]);
    }
    table
}

pub fn explain_json(report: &ExplainReport) -> Result<String> {
    let value = json!({
        "field": report.field,
        "candidates": report.candidates,
    });
    serde_json::to_string_pretty(&value).context("serialize explanation")
}

pub fn reply_table(parsed: &ReplyParse) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Field"),
        header_cell("Column"),
        header_cell("Confidence"),
        header_cell("Status"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);

    for suggestion in parsed.suggestions.iter() {
        table.add_row(vec![
            field_cell(&suggestion.field_name),
            Cell::new(suggestion.value.as_deref().unwrap_or("-")),
            Cell::new(format!("{:.0}%", suggestion.confidence * 100.0)),
            Cell::new("accepted").fg(Color::Green),
        ]);
    }
    for entry in &parsed.rejected {
        let status = match entry.reason {
            RejectReason::UnknownField => "unknown field",
            RejectReason::UnknownColumn => "unknown column",
        };
        table.add_row(vec![
            dim_cell(&entry.field),
            dim_cell(entry.column.as_deref().unwrap_or("-")),
            dim_cell("-"),
            Cell::new(status).fg(Color::Yellow),
        ]);
    }
    table
}

pub fn reply_json(parsed: &ReplyParse) -> Result<String> {
    serde_json::to_string_pretty(parsed).context("serialize parsed reply")
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn field_cell(name: &str) -> Cell {
    Cell::new(name).add_attribute(Attribute::Bold)
}

fn confidence_cell(confidence: f64, thresholds: &ConfidenceThresholds) -> Cell {
    let cell = Cell::new(format!("{:.0}%", confidence * 100.0));
    match thresholds.categorize(confidence) {
        Some(ConfidenceLevel::High) => cell.fg(Color::Green),
        Some(ConfidenceLevel::Medium) => cell.fg(Color::Yellow),
        Some(ConfidenceLevel::Low) => cell.fg(Color::DarkYellow),
        None => cell.fg(Color::DarkGrey),
    }
}

fn level_cell(level: Option<ConfidenceLevel>) -> Cell {
    match level {
        Some(level) => Cell::new(level.as_str()),
        None => dim_cell("below low"),
    }
}

fn algorithm_cell(suggestion: &MappingSuggestion) -> Cell {
    let cell = Cell::new(suggestion.algorithm.as_str());
    match suggestion.algorithm {
        Algorithm::Learned => cell.fg(Color::Magenta),
        Algorithm::Exact | Algorithm::Prior => cell.fg(Color::Blue),
        _ => cell,
    }
}

fn alternates_cell(suggestion: &MappingSuggestion) -> Cell {
    if suggestion.alternates.is_empty() {
        return dim_cell("-");
    }
    let text = suggestion
        .alternates
        .iter()
        .map(|a| format!("{} ({:.0}%)", a.column, a.confidence * 100.0))
        .collect::<Vec<_>>()
        .join(", ");
    Cell::new(text)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
