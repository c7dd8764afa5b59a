//! Tolerant JSON recovery from model responses.
//!
//! A response object may carry a structured payload, a top-level output
//! field, a list of message turns, or only prose around a fenced blob.
//! `extract_json` runs the strategies below in order and returns the first
//! hit; each strategy is a plain function so it can be tested on its own.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::screening::columns::is_truthy;

/// A single recovery strategy.
pub type Strategy = fn(&Value) -> Option<Value>;

/// Strategies in priority order.
pub const STRATEGIES: [(&str, Strategy); 4] = [
    ("structured", from_structured_field),
    ("top_level", from_top_level_fields),
    ("messages", from_messages),
    ("serialized", from_serialized_response),
];

const STRUCTURED_KEYS: [&str; 4] = [
    "structuredResponse",
    "structured_response",
    "structured",
    "parsed_response",
];

const NESTED_KEYS: [&str; 5] = ["output", "value", "parsed", "result", "response"];

const TOP_LEVEL_KEYS: [&str; 5] = ["output", "result", "response", "value", "parsed"];

/// Best-effort JSON value from an opaque model response.
pub fn extract_json(raw: &Value) -> Option<Value> {
    if raw.is_null() {
        return None;
    }
    STRATEGIES.iter().find_map(|(name, strategy)| {
        let found = strategy(raw);
        if found.is_some() {
            tracing::debug!("JSON recovered via {name} strategy");
        }
        found
    })
}

/// True for `{"columns": [...]}` or `{"candidates": [...]}`.
pub fn has_target_shape(value: &Value) -> bool {
    ["columns", "candidates"]
        .iter()
        .any(|key| value.get(key).map(Value::is_array).unwrap_or(false))
}

fn present<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| is_truthy(v))
}

/// Strategy 1: a structured payload under one of several names.
pub fn from_structured_field(raw: &Value) -> Option<Value> {
    let structured = STRUCTURED_KEYS.iter().find_map(|key| present(raw, key))?;
    match structured {
        Value::String(text) => parse_json_text(text),
        Value::Object(_) | Value::Array(_) => {
            Some(drill_structured(structured).unwrap_or_else(|| structured.clone()))
        }
        _ => None,
    }
}

fn drill_structured(value: &Value) -> Option<Value> {
    if has_target_shape(value) {
        return Some(value.clone());
    }
    for key in NESTED_KEYS {
        match present(value, key) {
            Some(Value::String(text)) => {
                if let Some(parsed) = parse_json_text(text) {
                    return Some(parsed);
                }
            }
            Some(nested @ (Value::Object(_) | Value::Array(_))) => {
                return Some(drill_structured(nested).unwrap_or_else(|| nested.clone()));
            }
            _ => {}
        }
    }
    None
}

/// Strategy 2: common top-level output fields.
pub fn from_top_level_fields(raw: &Value) -> Option<Value> {
    for key in TOP_LEVEL_KEYS {
        match present(raw, key) {
            Some(Value::String(text)) => {
                if let Some(parsed) = parse_json_text(text) {
                    return Some(parsed);
                }
            }
            Some(value @ (Value::Object(_) | Value::Array(_))) => return Some(value.clone()),
            _ => {}
        }
    }
    None
}

/// Strategy 3: message turns, newest first.
pub fn from_messages(raw: &Value) -> Option<Value> {
    let messages = raw.get("messages")?.as_array()?;
    messages
        .iter()
        .rev()
        .filter_map(message_text)
        .find_map(|text| parse_json_text(&text))
}

fn message_text(message: &Value) -> Option<String> {
    if let Value::String(text) = message {
        return Some(text.clone());
    }
    let content = present(message, "content")
        .or_else(|| present(message, "text"))
        .or_else(|| message.pointer("/lc_kwargs/content").filter(|v| is_truthy(v)))?;
    match content {
        Value::String(text) => Some(text.clone()),
        Value::Array(parts) => {
            let text: Vec<&str> = parts
                .iter()
                .filter_map(|part| part.as_str().or_else(|| part.get("text")?.as_str()))
                .collect();
            if text.is_empty() {
                Some(content.to_string())
            } else {
                Some(text.join("\n"))
            }
        }
        Value::Object(obj) => match obj.get("text") {
            Some(Value::String(text)) => Some(text.clone()),
            _ => Some(content.to_string()),
        },
        other => Some(other.to_string()),
    }
}

/// Strategy 4: the whole response, serialized.
pub fn from_serialized_response(raw: &Value) -> Option<Value> {
    match raw {
        Value::String(text) => parse_json_text(text),
        other => parse_json_text(&other.to_string()),
    }
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)```(?:json)?\s*(.*?)```").expect("fence regex is valid"))
}

fn embedded_json_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}|\[.*\]").expect("embedded json regex is valid"))
}

/// Removes the first Markdown code fence, keeping its body.
pub fn strip_code_fence(text: &str) -> String {
    fence_regex().replace(text, "$1").trim().to_string()
}

/// Parses JSON out of free text: fence strip, direct parse, then the first
/// `{...}` or `[...]` span.
pub fn parse_json_text(text: &str) -> Option<Value> {
    let cleaned = strip_code_fence(text);
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        return Some(value);
    }
    let span = embedded_json_regex().find(&cleaned)?;
    serde_json::from_str(span.as_str()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_message_content_round_trips() {
        let raw = json!({
            "messages": [{ "role": "assistant", "content": "```json\n{\"columns\":[\"A\",\"B\"]}\n```" }]
        });
        assert_eq!(extract_json(&raw), Some(json!({"columns": ["A", "B"]})));
    }

    #[test]
    fn test_structured_payload_with_target_shape_returned_directly() {
        let raw = json!({
            "structuredResponse": { "candidates": [{ "Name": "x" }] },
            "messages": [{ "content": "{\"columns\": []}" }]
        });
        assert_eq!(
            extract_json(&raw),
            Some(json!({ "candidates": [{ "Name": "x" }] }))
        );
    }

    #[test]
    fn test_structured_nested_string_is_parsed() {
        let raw = json!({ "structured_response": { "output": "```{\"columns\":[\"X\"]}```" } });
        assert_eq!(from_structured_field(&raw), Some(json!({"columns": ["X"]})));
    }

    #[test]
    fn test_structured_nested_object_is_drilled() {
        let raw = json!({ "structured": { "result": { "value": { "columns": ["Y"] } } } });
        assert_eq!(from_structured_field(&raw), Some(json!({"columns": ["Y"]})));
    }

    #[test]
    fn test_structured_without_shape_returns_itself() {
        let raw = json!({ "structured": { "foo": 1 } });
        assert_eq!(from_structured_field(&raw), Some(json!({"foo": 1})));
    }

    #[test]
    fn test_top_level_string_field_parsed() {
        let raw = json!({ "output": "Here you go: {\"candidates\": []} thanks" });
        assert_eq!(from_top_level_fields(&raw), Some(json!({"candidates": []})));
    }

    #[test]
    fn test_top_level_skips_empty_and_unparseable() {
        let raw = json!({ "output": "", "result": "no json here", "value": { "a": 1 } });
        assert_eq!(from_top_level_fields(&raw), Some(json!({"a": 1})));
    }

    #[test]
    fn test_messages_scanned_newest_first() {
        let raw = json!({
            "messages": [
                { "content": "{\"columns\": [\"old\"]}" },
                { "content": "{\"columns\": [\"new\"]}" },
                { "content": "sorry, I cannot help" }
            ]
        });
        assert_eq!(from_messages(&raw), Some(json!({"columns": ["new"]})));
    }

    #[test]
    fn test_message_content_parts_and_lc_kwargs() {
        let parts = json!({
            "messages": [{ "content": [{ "type": "text", "text": "```json\n[1,2]\n```" }] }]
        });
        assert_eq!(from_messages(&parts), Some(json!([1, 2])));

        let lc = json!({ "messages": [{ "lc_kwargs": { "content": "{\"a\": true}" } }] });
        assert_eq!(from_messages(&lc), Some(json!({"a": true})));

        let plain = json!({ "messages": ["{\"b\": 2}"] });
        assert_eq!(from_messages(&plain), Some(json!({"b": 2})));
    }

    #[test]
    fn test_serialized_string_response() {
        let raw = json!("The answer is {\"columns\": [\"Z\"]}.");
        assert_eq!(extract_json(&raw), Some(json!({"columns": ["Z"]})));
    }

    #[test]
    fn test_nothing_usable_returns_none() {
        assert_eq!(extract_json(&Value::Null), None);
        assert_eq!(extract_json(&json!("plain prose, no braces")), None);
    }

    #[test]
    fn test_parse_json_text_recovers_embedded_object() {
        let text = "Sure! ```\nnot json\n``` Anyway: {\"x\": 1}";
        assert_eq!(parse_json_text(text), Some(json!({"x": 1})));
        assert_eq!(parse_json_text("{broken: json}"), None);
        assert_eq!(parse_json_text("prefix {\"x\": 1} suffix"), Some(json!({"x": 1})));
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```JSON\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fence("  {}  "), "{}");
    }

    #[test]
    fn test_has_target_shape() {
        assert!(has_target_shape(&json!({"columns": []})));
        assert!(has_target_shape(&json!({"candidates": [{}]})));
        assert!(!has_target_shape(&json!({"columns": "A,B"})));
        assert!(!has_target_shape(&json!([1])));
    }
}
