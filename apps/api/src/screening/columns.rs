//! Column kinds and the per-run candidate schema.
//!
//! A column's kind is inferred once from its name and then drives defaults,
//! validation, coercion of sloppy model output, and export formatting.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Semantic kind of an output column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnKind {
    Number,
    /// Bounded score in `[0, max]`; max is 5 or 100.
    Rating { max: f64 },
    Boolean,
    StringList,
    Text,
}

struct KindPatterns {
    boolean: Regex,
    duration: Regex,
    fit: Regex,
    rating: Regex,
    percent: Regex,
    list: Regex,
}

fn patterns() -> &'static KindPatterns {
    static PATTERNS: OnceLock<KindPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| KindPatterns {
        boolean: Regex::new(
            r"\b(data pipelines?|pipelines?|pipeline experience|etl|etl/elt|elt|built pipelines|yes/no|yes or no|true/false)\b",
        )
        .expect("boolean pattern is valid"),
        duration: Regex::new(r"\b(years?|yrs|experience|duration)\b")
            .expect("duration pattern is valid"),
        fit: Regex::new(r"\b(overall fit|overall|match)\b").expect("fit pattern is valid"),
        rating: Regex::new(r"\b(proficiency|rating|score|1-5|1 to 5|1–5)\b")
            .expect("rating pattern is valid"),
        percent: Regex::new(r"%|\b(percentage|percent)\b").expect("percent pattern is valid"),
        list: Regex::new(
            r"\b(skills?|aws|technology|technologies|tools?|certifications?|certs?)\b",
        )
        .expect("list pattern is valid"),
    })
}

fn normalize_name(column: &str) -> String {
    column.to_lowercase().replace('_', " ")
}

impl ColumnKind {
    /// Classifies a column by its name. Pattern groups are tried in order and
    /// the first hit wins.
    pub fn classify(column: &str) -> ColumnKind {
        let name = normalize_name(column);
        let p = patterns();
        if p.boolean.is_match(&name) {
            ColumnKind::Boolean
        } else if p.duration.is_match(&name) || p.fit.is_match(&name) {
            ColumnKind::Number
        } else if p.rating.is_match(&name) {
            let max = if p.percent.is_match(&name) { 100.0 } else { 5.0 };
            ColumnKind::Rating { max }
        } else if p.percent.is_match(&name) {
            ColumnKind::Number
        } else if p.list.is_match(&name) {
            ColumnKind::StringList
        } else {
            ColumnKind::Text
        }
    }

    pub fn default_value(&self) -> Value {
        match self {
            ColumnKind::Number | ColumnKind::Rating { .. } => json!(0),
            ColumnKind::Boolean => Value::Bool(false),
            ColumnKind::StringList => Value::Array(Vec::new()),
            ColumnKind::Text => Value::String(String::new()),
        }
    }

    /// Strict check: does `value` already have this kind's shape?
    pub fn validate(&self, value: &Value) -> Result<(), String> {
        match (self, value) {
            (ColumnKind::Number, Value::Number(_)) => Ok(()),
            (ColumnKind::Rating { max }, Value::Number(n)) => {
                let n = n.as_f64().unwrap_or(f64::NAN);
                if (0.0..=*max).contains(&n) {
                    Ok(())
                } else {
                    Err(format!("expected rating in [0, {max}], got {n}"))
                }
            }
            (ColumnKind::Boolean, Value::Bool(_)) => Ok(()),
            (ColumnKind::StringList, Value::Array(items)) if items.iter().all(Value::is_string) => {
                Ok(())
            }
            (ColumnKind::Text, Value::String(_)) => Ok(()),
            (kind, other) => Err(format!("expected {}, got {other}", kind.label())),
        }
    }

    /// Best-effort conversion of a value that failed `validate`. Values that
    /// cannot be converted are passed through untouched.
    pub fn coerce(&self, value: Value) -> Value {
        if value.is_null() {
            return self.default_value();
        }
        if self.validate(&value).is_ok() {
            return value;
        }
        self.try_coerce(&value).unwrap_or(value)
    }

    fn try_coerce(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (ColumnKind::Number, Value::String(s)) => parse_number(s).map(json_number),
            (ColumnKind::Rating { max }, Value::Number(n)) => {
                n.as_f64().map(|n| json_number(n.clamp(0.0, *max)))
            }
            (ColumnKind::Rating { max }, Value::String(s)) => {
                parse_number(s).map(|n| json_number(n.clamp(0.0, *max)))
            }
            (ColumnKind::Boolean, Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "yes" | "true" | "y" => Some(Value::Bool(true)),
                "no" | "false" | "n" => Some(Value::Bool(false)),
                _ => None,
            },
            (ColumnKind::StringList, Value::String(s)) => Some(Value::Array(
                s.split([';', ','])
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(|item| Value::String(item.to_string()))
                    .collect(),
            )),
            (ColumnKind::StringList, Value::Array(items)) => Some(Value::Array(
                items
                    .iter()
                    .map(|item| Value::String(display_scalar(item)))
                    .collect(),
            )),
            (ColumnKind::Text, Value::Number(_) | Value::Bool(_)) => {
                Some(Value::String(display_scalar(value)))
            }
            _ => None,
        }
    }

    /// Export formatting: lists joined with "; ", booleans as Yes/No, nulls
    /// as empty strings, everything else as-is.
    pub fn display(&self, value: Option<&Value>) -> Value {
        match self {
            ColumnKind::StringList => match value {
                Some(Value::Array(items)) => Value::String(
                    items
                        .iter()
                        .map(display_scalar)
                        .collect::<Vec<_>>()
                        .join("; "),
                ),
                Some(other) => Value::String(display_scalar(other)),
                None => Value::String(String::new()),
            },
            ColumnKind::Boolean => {
                let yes = value.map(is_truthy).unwrap_or(false);
                Value::String(if yes { "Yes" } else { "No" }.to_string())
            }
            _ => match value {
                None | Some(Value::Null) => Value::String(String::new()),
                Some(v) => v.clone(),
            },
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ColumnKind::Number => "number",
            ColumnKind::Rating { .. } => "rating",
            ColumnKind::Boolean => "boolean",
            ColumnKind::StringList => "array of strings",
            ColumnKind::Text => "string",
        }
    }

    fn json_schema(&self) -> Value {
        match self {
            ColumnKind::Number => json!({ "type": "number", "default": 0 }),
            ColumnKind::Rating { max } => {
                json!({ "type": "number", "minimum": 0, "maximum": max, "default": 0 })
            }
            ColumnKind::Boolean => json!({ "type": "boolean", "default": false }),
            ColumnKind::StringList => {
                json!({ "type": "array", "items": { "type": "string" }, "default": [] })
            }
            ColumnKind::Text => json!({ "type": "string", "default": "" }),
        }
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().trim_end_matches('%').trim().parse::<f64>().ok()
}

fn json_number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        json!(n as i64)
    } else {
        json!(n)
    }
}

/// String form of a scalar as it would appear in a spreadsheet cell.
pub fn display_scalar(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Loose truthiness: `false`, `0`, `""` and `null` are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// A candidate record: column name to value, in column order.
pub type CandidateRecord = Map<String, Value>;

/// The fixed column set of one run, each paired with its inferred kind.
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    columns: Vec<(String, ColumnKind)>,
    name_column: Option<String>,
}

impl ColumnSchema {
    pub fn new(columns: &[String]) -> Self {
        let name_column = columns
            .iter()
            .find(|c| normalize_name(c).trim() == "candidate name")
            .cloned();
        Self {
            columns: columns
                .iter()
                .map(|c| (c.clone(), ColumnKind::classify(c)))
                .collect(),
            name_column,
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, ColumnKind)> {
        self.columns.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    /// A record with every column at its kind default.
    pub fn default_record(&self) -> CandidateRecord {
        self.columns
            .iter()
            .map(|(name, kind)| (name.clone(), kind.default_value()))
            .collect()
    }

    /// Strict validation of one model-produced candidate object. Unknown keys
    /// are dropped, absent keys take their default, and any present value of
    /// the wrong shape fails the whole record.
    pub fn validate_record(&self, raw: &Value) -> Result<CandidateRecord, String> {
        let obj = raw
            .as_object()
            .ok_or_else(|| format!("candidate must be an object, got {raw}"))?;
        let mut record = CandidateRecord::new();
        for (name, kind) in &self.columns {
            let value = match obj.get(name) {
                None => kind.default_value(),
                Some(v) => {
                    kind.validate(v).map_err(|e| format!("{name}: {e}"))?;
                    v.clone()
                }
            };
            record.insert(name.clone(), value);
        }
        Ok(record)
    }

    /// Lenient counterpart of `validate_record`: copies recognised columns,
    /// coercing where possible, and defaults the rest. Never fails.
    pub fn normalize_record(&self, raw: &Value) -> CandidateRecord {
        let obj = raw.as_object();
        self.columns
            .iter()
            .map(|(name, kind)| {
                let value = obj
                    .and_then(|o| o.get(name))
                    .cloned()
                    .map(|v| kind.coerce(v))
                    .unwrap_or_else(|| kind.default_value());
                (name.clone(), value)
            })
            .collect()
    }

    /// Writes `file_name` into the name column when it is missing or blank.
    pub fn backfill_name(&self, record: &mut CandidateRecord, file_name: &str) {
        let Some(column) = &self.name_column else {
            return;
        };
        let blank = match record.get(column) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(other) => display_scalar(other).trim().is_empty(),
        };
        if blank {
            record.insert(column.clone(), Value::String(file_name.to_string()));
        }
    }

    /// JSON Schema for `{"candidates": [...]}` handed to the model as the
    /// structured response format.
    pub fn json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .columns
            .iter()
            .map(|(name, kind)| (name.clone(), kind.json_schema()))
            .collect();
        json!({
            "type": "object",
            "properties": {
                "candidates": {
                    "type": "array",
                    "items": { "type": "object", "properties": properties }
                }
            },
            "required": ["candidates"]
        })
    }
}
