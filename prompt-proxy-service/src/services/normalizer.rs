//! Payload normalization.
//!
//! The callers of this service send the prompt in wildly different shapes:
//! a JSON object, a JSON-encoded string wrapping that object, a
//! form-urlencoded body whose `data` field holds an encoded object, or the
//! bare prompt text itself. Normalization runs an ordered list of candidate
//! decoders over the raw body; the first decoder that succeeds wins.

use serde_json::Value;
use thiserror::Error;

/// Prompt fields checked in order of precedence.
const PROMPT_FIELDS: [&str; 2] = ["inputText", "text"];

/// Form/JSON field conventionally wrapping an encoded payload.
const WRAPPER_FIELD: &str = "data";

/// Why a body could not be normalized into a prompt. Terminal for the
/// request; maps to a 400 upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("request body is empty")]
    EmptyBody,
    #[error("request body is not valid JSON")]
    MalformedJson,
    #[error("no usable inputText or text field present")]
    MissingField,
    #[error("prompt field is not a string")]
    WrongType,
}

impl ParseFailure {
    /// Stable label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::EmptyBody => "empty_body",
            Self::MalformedJson => "malformed_json",
            Self::MissingField => "missing_field",
            Self::WrongType => "wrong_type",
        }
    }
}

/// Extract a non-empty prompt from a raw request body.
pub fn extract_prompt(body: &[u8]) -> Result<String, ParseFailure> {
    let raw = std::str::from_utf8(body).map_err(|_| ParseFailure::MalformedJson)?;
    if raw.is_empty() {
        return Err(ParseFailure::EmptyBody);
    }

    let decoded = decode_body(raw)?;
    resolve_prompt(unwrap_nested(decoded))
}

/// Ordered candidate decoders, first success wins: form-urlencoded with an
/// encoded `data` field, whole-body JSON, raw-string fallback.
fn decode_body(raw: &str) -> Result<Value, ParseFailure> {
    if looks_form_encoded(raw) {
        if let Some(value) = decode_form(raw)? {
            return Ok(value);
        }
    }

    match serde_json::from_str::<Value>(raw) {
        Ok(value) => Ok(value),
        // A body that looks structured but does not parse is reported, not
        // silently treated as the prompt.
        Err(_) if looks_like_json(raw) => Err(ParseFailure::MalformedJson),
        Err(_) => Ok(Value::String(raw.to_string())),
    }
}

fn looks_form_encoded(raw: &str) -> bool {
    raw.contains('=') && !looks_like_json(raw)
}

fn looks_like_json(raw: &str) -> bool {
    matches!(
        raw.trim_start().chars().next(),
        Some('{') | Some('[') | Some('"')
    )
}

/// Decode a form-urlencoded body and JSON-decode its `data` field. Returns
/// `Ok(None)` when the body is not a form or carries no `data` field, so
/// the next candidate decoder can run.
fn decode_form(raw: &str) -> Result<Option<Value>, ParseFailure> {
    let fields: Vec<(String, String)> = match serde_urlencoded::from_str(raw) {
        Ok(fields) => fields,
        Err(_) => return Ok(None),
    };

    let Some((_, encoded)) = fields.iter().find(|(key, _)| key == WRAPPER_FIELD) else {
        return Ok(None);
    };

    serde_json::from_str(encoded)
        .map(Some)
        .map_err(|_| ParseFailure::MalformedJson)
}

/// Unwrap one extra encoding level: a JSON string wrapping an object, or an
/// object whose `data` field holds an encoded object.
fn unwrap_nested(value: Value) -> Value {
    match value {
        Value::String(s) => match serde_json::from_str::<Value>(&s) {
            Ok(inner @ Value::Object(_)) => inner,
            _ => Value::String(s),
        },
        Value::Object(map) => {
            if let Some(Value::String(encoded)) = map.get(WRAPPER_FIELD) {
                if let Ok(inner @ Value::Object(_)) = serde_json::from_str::<Value>(encoded) {
                    return inner;
                }
            }
            Value::Object(map)
        }
        other => other,
    }
}

fn resolve_prompt(value: Value) -> Result<String, ParseFailure> {
    match value {
        // The resolved body is the prompt itself.
        Value::String(s) if !s.is_empty() => Ok(s),
        Value::String(_) => Err(ParseFailure::MissingField),
        Value::Object(map) => {
            for field in PROMPT_FIELDS {
                match map.get(field) {
                    Some(Value::String(s)) if !s.is_empty() => return Ok(s.clone()),
                    // Present but empty counts the same as absent.
                    Some(Value::String(_)) => return Err(ParseFailure::MissingField),
                    Some(_) => return Err(ParseFailure::WrongType),
                    None => continue,
                }
            }
            Err(ParseFailure::MissingField)
        }
        _ => Err(ParseFailure::WrongType),
    }
}
