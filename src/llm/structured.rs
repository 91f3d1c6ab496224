//! Structured Response Parsing
//!
//! Every agent asks the model for JSON and every agent funnels the reply
//! through [`parse_or_default`]. A malformed reply degrades a single step to
//! its caller-supplied fallback; it never aborts the loop.
//!
//! The `lenient_*` helpers are meant for `#[serde(deserialize_with = ...)]` on
//! model-facing structs so that one badly typed field does not throw away the
//! rest of an otherwise usable reply.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

use crate::utils::text::truncate_chars;

/// Pull the JSON payload out of a model reply (code fences, chatter around
/// the object, or the bare text).
pub fn extract_json_payload(raw: &str) -> &str {
    let fenced = if raw.contains("```json") {
        raw.split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .unwrap_or(raw)
    } else if raw.contains("```") {
        raw.split("```").nth(1).unwrap_or(raw)
    } else {
        raw
    };
    let trimmed = fenced.trim();

    let start = trimmed.find(|c: char| c == '{' || c == '[');
    let end = trimmed.rfind(|c: char| c == '}' || c == ']');
    match (start, end) {
        (Some(s), Some(e)) if e > s => &trimmed[s..=e],
        _ => trimmed,
    }
}

/// Decode `raw` as `T`, returning `fallback` unchanged on any failure.
pub fn parse_or_default<T: DeserializeOwned>(raw: &str, fallback: T) -> T {
    let payload = extract_json_payload(raw);
    match serde_json::from_str::<T>(payload) {
        Ok(value) => value,
        Err(e) => {
            warn!(
                error = %e,
                preview = %truncate_chars(raw, 120),
                "Unparseable model response, using fallback"
            );
            fallback
        }
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Number or numeric string, anything else becomes `None`
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value))
}

/// Non-negative whole number, rounded
pub fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value)
        .filter(|v| *v >= 0.0 && *v <= u32::MAX as f64)
        .map(|v| v.round() as u32))
}

/// String, or the rendering of a number/bool
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// List of strings; a lone string becomes a one-item list, non-string items are dropped
pub fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s],
        _ => Vec::new(),
    })
}

/// List of section indices; tolerates numeric strings and a lone number
pub fn lenient_index_list<'de, D>(deserializer: D) -> Result<Vec<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let to_index = |v: &Value| {
        value_as_f64(v)
            .filter(|n| *n >= 0.0 && n.fract() == 0.0)
            .map(|n| n as usize)
    };
    Ok(match &value {
        Value::Array(items) => items.iter().filter_map(to_index).collect(),
        other => to_index(other).into_iter().collect(),
    })
}
