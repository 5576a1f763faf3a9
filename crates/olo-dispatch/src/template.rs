//! Payload templates
//!
//! Templates live in a mounted directory and are read at request time:
//! - `<pipeline>_chat.tpl` for chat turns (e.g. `llama-oss_chat.tpl`)
//! - `upload.tpl` for document ingestion
//!
//! A template is plain text with `{{name}}` placeholders. After substitution
//! the text must parse as a JSON object. Any failure along the way (no
//! directory, missing file, unreadable file, invalid JSON) yields `None`, and
//! the command builder falls back to its computed defaults.

use crate::addressing::sanitize_identifier;
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

/// `{{identifier}}`, no nesting, no expressions
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([A-Za-z_][A-Za-z0-9_]*)\}\}").expect("PLACEHOLDER is a compile-time constant")
});

/// Which payload a template describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Conversation turn
    Chat,
    /// Document ingestion
    Upload,
}

impl TemplateKind {
    /// Suffix used in template file names
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Upload => "upload",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value substituted into a template
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateValue {
    /// Inserted verbatim
    Text(String),
    /// Inserted in decimal form
    Integer(i64),
    /// Serialized to JSON text before insertion
    Json(Value),
    /// Renders as the empty string
    Null,
}

impl TemplateValue {
    fn render(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(n) => n.to_string(),
            Self::Json(v) => v.to_string(),
            Self::Null => String::new(),
        }
    }
}

impl From<&str> for TemplateValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for TemplateValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for TemplateValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<Value> for TemplateValue {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<TemplateValue>> From<Option<T>> for TemplateValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Variables available to a template
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    values: HashMap<String, String>,
}

impl TemplateVars {
    /// Create an empty variable set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable (builder style)
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<TemplateValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add or replace a variable
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<TemplateValue>) {
        self.values.insert(name.into(), value.into().render());
    }

    /// Rendered form of a variable, if present
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Replace every `{{name}}` with its variable; unknown names render empty.
///
/// Substitution is a single pass over the template, so values that happen to
/// contain placeholder syntax are never expanded a second time.
#[must_use]
pub fn fill_template(template: &str, vars: &TemplateVars) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            vars.get(&caps[1]).unwrap_or_default().to_string()
        })
        .into_owned()
}

/// Loads and renders payload templates from a directory
#[derive(Debug, Clone, Default)]
pub struct TemplateRenderer {
    dir: Option<PathBuf>,
}

impl TemplateRenderer {
    /// Create a renderer reading from `dir` (None disables templates)
    #[must_use]
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    /// Renderer with no template directory; every lookup falls back to defaults
    #[must_use]
    pub fn disabled() -> Self {
        Self { dir: None }
    }

    /// Configured directory, if it exists on disk
    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref().filter(|d| d.is_dir())
    }

    /// Template file name for a pipeline and kind
    #[must_use]
    pub fn file_name(pipeline_id: Option<&str>, kind: TemplateKind) -> String {
        match kind {
            TemplateKind::Upload => "upload.tpl".to_string(),
            TemplateKind::Chat => format!(
                "{}_{}.tpl",
                sanitize_identifier(pipeline_id.unwrap_or("default")),
                kind
            ),
        }
    }

    /// Read the raw template text
    #[must_use]
    pub fn load(&self, pipeline_id: Option<&str>, kind: TemplateKind) -> Option<String> {
        let dir = self.dir()?;
        let path = dir.join(Self::file_name(pipeline_id, kind));
        if !path.is_file() {
            debug!(path = %path.display(), "No template file, using defaults");
            return None;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Template load failed");
                None
            }
        }
    }

    /// Load, fill and parse a template into a JSON object
    #[must_use]
    pub fn render(
        &self,
        pipeline_id: Option<&str>,
        kind: TemplateKind,
        vars: &TemplateVars,
    ) -> Option<Map<String, Value>> {
        let raw = self.load(pipeline_id, kind)?;
        let filled = fill_template(&raw, vars);
        match serde_json::from_str::<Value>(&filled) {
            Ok(Value::Object(map)) => Some(map),
            Ok(other) => {
                warn!(
                    kind = %kind,
                    json_type = json_type(&other),
                    "Template did not produce a JSON object, using default payload"
                );
                None
            }
            Err(e) => {
                warn!(kind = %kind, error = %e, "Template fill/parse failed, using default payload");
                None
            }
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
