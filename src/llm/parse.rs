//! Decoding of free-text model output into findings.
//!
//! The model is asked for a bare JSON array but routinely wraps it in prose
//! or markdown fences, drops fields, or uses the wrong types. Nothing in here
//! returns an error: unusable output becomes an empty list and unusable
//! fields become defaults.

use crate::model::{Finding, Severity};
use crate::util::{sanitize_api_response, truncate_str};
use serde_json::Value;

const UNTITLED: &str = "Untitled finding";
const DEFAULT_CATEGORY: &str = "other";

/// Slice from the leftmost `[` to the rightmost `]`, if both exist in that order.
fn extract_array_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Parse model output into findings, in the order the model listed them.
pub fn parse_findings(text: &str) -> Vec<Finding> {
    let Some(candidate) = extract_array_span(text.trim()) else {
        tracing::debug!(
            preview = %sanitize_api_response(truncate_str(text, 120)),
            "model output contained no JSON array"
        );
        return Vec::new();
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Array(items)) => items.iter().map(decode_finding).collect(),
        Ok(_) => Vec::new(),
        Err(err) => {
            tracing::debug!(error = %err, "model output array was not valid JSON");
            Vec::new()
        }
    }
}

/// Map any JSON value onto a well-formed finding.
///
/// Non-object values decode to an all-defaults finding.
pub fn decode_finding(value: &Value) -> Finding {
    Finding {
        severity: field(value, "severity")
            .and_then(Value::as_str)
            .and_then(Severity::parse)
            .unwrap_or_default(),
        category: string_or(field(value, "category"), DEFAULT_CATEGORY),
        title: string_or(field(value, "title"), UNTITLED),
        file: string_or(field(value, "file"), ""),
        line: field(value, "line").and_then(line_number),
        description: string_or(field(value, "description"), ""),
        code_snippet: truthy_string(field(value, "codeSnippet")),
        fix: truthy_string(field(value, "fix")),
        source: truthy_string(field(value, "source")),
    }
}

fn field<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    value.as_object()?.get(name)
}

/// Strings pass through, other scalars are stringified; null or missing falls back.
fn string_or(value: Option<&Value>, default: &str) -> String {
    match value {
        None | Some(Value::Null) => default.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Optional fields are kept only when they carry something: empty strings,
/// `false`, `0` and `null` are dropped.
fn truthy_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn line_number(value: &Value) -> Option<u32> {
    let n = value.as_f64()?;
    if n.is_finite() && n >= 0.0 && n <= u32::MAX as f64 {
        Some(n as u32)
    } else {
        None
    }
}
