//! Worker reply extraction
//!
//! Workers return results in one of two conventions:
//! - an array of stage results, `[{ stageName, data: { response | result | reply } }, ...]`
//! - a flat object, `{ reply | response | result }`
//!
//! plus bare strings from simple workers. The stage-array convention is
//! checked first.

use serde_json::{Map, Value};

/// Returned when the worker produced nothing
pub const NO_RESPONSE: &str = "No response.";

/// Field priority inside a stage result
const STAGE_FIELDS: &[&str] = &["response", "result", "reply"];

/// Field priority inside a flat object result
const OBJECT_FIELDS: &[&str] = &["reply", "response", "result"];

/// Shape of a workflow result
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerReply<'a> {
    /// `null`
    Missing,
    /// Bare string
    Text(&'a str),
    /// Non-empty array of stage results
    Stages(&'a [Value]),
    /// Flat object
    Object(&'a Map<String, Value>),
    /// Anything else (numbers, booleans, empty arrays)
    Other(&'a Value),
}

impl<'a> From<&'a Value> for WorkerReply<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Self::Missing,
            Value::String(s) => Self::Text(s),
            Value::Array(items) if !items.is_empty() => Self::Stages(items),
            Value::Object(map) => Self::Object(map),
            other => Self::Other(other),
        }
    }
}

impl WorkerReply<'_> {
    /// Reply text for this shape, `None` when the shape has no recognised field
    fn text(&self) -> Option<String> {
        match self {
            Self::Missing => Some(NO_RESPONSE.to_string()),
            Self::Text(s) => Some((*s).to_string()),
            Self::Stages(items) => {
                let first = &items[0];
                let data = match first.get("data") {
                    Some(data) if !data.is_null() => data,
                    _ => first,
                };
                first_present(data, STAGE_FIELDS).map(stringify)
            }
            Self::Object(map) => {
                let text = OBJECT_FIELDS
                    .iter()
                    .find_map(|key| map.get(*key).filter(|v| !v.is_null()))?;
                match text {
                    Value::Object(inner) => match inner.get("response") {
                        Some(response) if !response.is_null() => Some(stringify(response)),
                        _ => Some(text.to_string()),
                    },
                    other => Some(stringify(other)),
                }
            }
            Self::Other(_) => None,
        }
    }
}

/// Turn a workflow result into reply text
#[must_use]
pub fn extract_reply(result: &Value) -> String {
    WorkerReply::from(result)
        .text()
        .unwrap_or_else(|| result.to_string())
}

fn first_present<'v>(value: &'v Value, fields: &[&str]) -> Option<&'v Value> {
    fields
        .iter()
        .find_map(|key| value.get(*key).filter(|v| !v.is_null()))
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
