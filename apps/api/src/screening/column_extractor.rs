//! Column extraction: evaluation criteria in, ordered column names out.
//!
//! Recovery order: structured model reply, then a heuristic read of the
//! criteria's "Output Requirements:" section, then a fixed default list.
//! This never fails; a broken model call is logged and recovered from.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::llm_client::{ChatMessage, ChatModel, ChatRequest, ResponseSchema};
use crate::screening::columns::display_scalar;
use crate::screening::extract::extract_json;
use crate::screening::prompts::{COLUMN_EXTRACTION_PROMPT_TEMPLATE, COLUMN_EXTRACTION_SYSTEM};

/// Columns used when neither the model nor the heuristic produce any.
pub const DEFAULT_COLUMNS: [&str; 10] = [
    "Candidate Name",
    "Current Role",
    "Years of Experience",
    "SQL Proficiency (1-5 Rating)",
    "Python Proficiency (1-5 Rating)",
    "AWS Skills",
    "AWS Experience (Years)",
    "Data Pipeline Experience",
    "Relevant Certifications",
    "Overall Fit (%)",
];

const MAX_HEURISTIC_COLUMNS: usize = 40;
const MAX_HEURISTIC_LINE_CHARS: usize = 140;
const MAX_FIELD_CHARS: usize = 100;
const MAX_FIELD_WORDS: usize = 8;
const MAX_PROSE_FIELD_WORDS: usize = 6;

/// Returns the output columns for one evaluation run. Never empty.
pub async fn extract_output_columns(
    llm: &dyn ChatModel,
    criteria: &str,
    model: &str,
) -> Vec<String> {
    info!("Extracting output columns (model: {model})");

    let request = ChatRequest {
        model: model.to_string(),
        messages: vec![
            ChatMessage::system(format!("{COLUMN_EXTRACTION_SYSTEM}\n{JSON_ONLY_INSTRUCTION}")),
            ChatMessage::user(COLUMN_EXTRACTION_PROMPT_TEMPLATE.replace("{criteria}", criteria)),
        ],
        response_format: Some(ResponseSchema {
            name: "output_columns".to_string(),
            schema: json!({
                "type": "object",
                "properties": {
                    "columns": {
                        "type": "array",
                        "items": { "type": "string", "minLength": 1 },
                        "description": "List of output column names"
                    }
                },
                "required": ["columns"]
            }),
        }),
    };

    let raw = match llm.invoke(&request).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Column extraction call failed: {e}");
            Value::Null
        }
    };
    debug!("Raw column extraction response: {raw}");

    if let Some(columns) = extract_json(&raw).and_then(|parsed| columns_from_parsed(&parsed)) {
        info!("Extracted {} columns from model response", columns.len());
        return columns;
    }

    warn!("No structured columns in model response; falling back to heuristics");
    let heuristic = heuristic_columns(criteria);
    if !heuristic.is_empty() {
        info!("Heuristic extracted {} columns", heuristic.len());
        return heuristic;
    }

    info!("Using default column list");
    default_columns()
}

pub fn default_columns() -> Vec<String> {
    DEFAULT_COLUMNS.iter().map(|c| c.to_string()).collect()
}

/// Pulls the `columns` array out of a parsed reply. A strictly valid array
/// (non-empty strings) is taken as is; anything else is coerced to strings.
fn columns_from_parsed(parsed: &Value) -> Option<Vec<String>> {
    let items = parsed.get("columns")?.as_array()?;

    let columns: Vec<String> = match validate_columns(items) {
        Ok(columns) => columns,
        Err(reason) => {
            warn!("Column list failed validation ({reason}); coercing raw array");
            items.iter().map(display_scalar).collect()
        }
    };

    let columns = dedup_trimmed(columns);
    (!columns.is_empty()).then_some(columns)
}

fn validate_columns(items: &[Value]) -> Result<Vec<String>, String> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::String(s) if !s.is_empty() => Ok(s.clone()),
            Value::String(_) => Err(format!("columns[{i}] is empty")),
            other => Err(format!("columns[{i}] is not a string: {other}")),
        })
        .collect()
}

fn dedup_trimmed(columns: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for column in columns {
        let column = column.trim();
        if !column.is_empty() && !out.iter().any(|c| c == column) {
            out.push(column.to_string());
        }
    }
    out
}

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)output\s+requirements\s*[:\-]").expect("marker regex is valid")
    })
}

fn bullet_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-*•\d.)\s]+").expect("bullet regex is valid"))
}

fn prose_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)[a-z]{5,}\s+[a-z]{5,}").expect("prose regex is valid"))
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex is valid"))
}

/// Reads field names from the lines under an "Output Requirements:" marker,
/// up to the next marker. Returns nothing when the marker is absent.
pub fn heuristic_columns(criteria: &str) -> Vec<String> {
    let Some(marker) = marker_regex().find(criteria) else {
        return Vec::new();
    };

    // The remainder of the marker line is a heading, not a field.
    let after = &criteria[marker.end()..];
    let section = after.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
    let section = match marker_regex().find(section) {
        Some(next) => &section[..next.start()],
        None => section,
    };

    let mut columns = Vec::new();
    for line in section.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.chars().count() > MAX_HEURISTIC_LINE_CHARS {
            break;
        }
        let cleaned = bullet_regex().replace(line, "");
        let field = cleaned
            .split(['-', '–', '—', ':'])
            .next()
            .unwrap_or_default()
            .trim();
        if field.is_empty() || field.chars().count() >= MAX_FIELD_CHARS {
            continue;
        }
        let words = field.split_whitespace().count();
        if words > MAX_FIELD_WORDS {
            continue;
        }
        if !prose_regex().is_match(field) || words <= MAX_PROSE_FIELD_WORDS {
            columns.push(whitespace_regex().replace_all(field, "_").into_owned());
        }
        if columns.len() >= MAX_HEURISTIC_COLUMNS {
            break;
        }
    }

    dedup_trimmed(columns)
}
