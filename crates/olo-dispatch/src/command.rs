//! Execution commands
//!
//! Workers expect every unit of work to carry an `ExecutionCommand`:
//! `{ tenantId, userId, operation, input, pipelineName, metadata [, debug, debugID] }`.
//!
//! The builder renders the matching template (if any) and then fills each
//! field from the template object when it sets that field, otherwise from a
//! computed default. The result is always fully populated.

use crate::addressing::sanitize_identifier;
use crate::config::{non_blank, DispatchConfig};
use crate::template::{TemplateKind, TemplateRenderer, TemplateVars};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Pipeline used for chat when the conversation has none
pub const DEFAULT_CHAT_PIPELINE: &str = "llama-oss";

/// Operation for chat turns
pub const CHAT_OPERATION: &str = "question-answer";

/// Operation for document ingestion
pub const INGESTION_OPERATION: &str = "documentIngestion";

/// One entry of the conversation history sent to workers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "user" or "assistant"
    pub role: String,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Create a history entry
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Payload submitted as the single workflow argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionCommand {
    /// Tenant the work belongs to
    pub tenant_id: String,
    /// User the work belongs to
    pub user_id: String,
    /// Worker operation name
    pub operation: String,
    /// Operation input
    pub input: Value,
    /// Pipeline the worker should run
    pub pipeline_name: String,
    /// Free-form metadata, at least `{ragTag, timestamp}`
    pub metadata: Value,
    /// Debug mode flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    /// Debug correlation id
    #[serde(rename = "debugID", default, skip_serializing_if = "Option::is_none")]
    pub debug_id: Option<String>,
}

/// Per-call command options
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOptions {
    /// Request debug mode from workers
    pub debug: bool,
    /// Correlation id; debug fields are only emitted when this is set
    pub debug_id: Option<String>,
}

impl CommandOptions {
    /// Debug options with a correlation id
    pub fn debug(debug_id: impl Into<String>) -> Self {
        Self {
            debug: true,
            debug_id: Some(debug_id.into()),
        }
    }

    fn apply(&self, command: &mut ExecutionCommand) {
        if !self.debug {
            return;
        }
        if let Some(id) = non_blank(self.debug_id.as_deref()) {
            command.debug = Some(true);
            command.debug_id = Some(id.to_string());
        }
    }
}

/// Tenant and user used when a template does not set them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDefaults {
    /// Default tenant id
    pub tenant_id: String,
    /// Default user id
    pub user_id: String,
}

impl Default for CommandDefaults {
    fn default() -> Self {
        Self {
            tenant_id: "default".to_string(),
            user_id: "default".to_string(),
        }
    }
}

impl CommandDefaults {
    /// Take tenant/user from config, falling back to "default"
    #[must_use]
    pub fn from_config(config: &DispatchConfig) -> Self {
        let fallback = Self::default();
        Self {
            tenant_id: non_blank(config.tenant_id.as_deref())
                .map_or(fallback.tenant_id, str::to_string),
            user_id: non_blank(config.user_id.as_deref())
                .map_or(fallback.user_id, str::to_string),
        }
    }
}

/// Builds execution commands from templates and defaults
#[derive(Debug, Clone, Default)]
pub struct CommandBuilder {
    renderer: TemplateRenderer,
    defaults: CommandDefaults,
}

impl CommandBuilder {
    /// Create a builder
    #[must_use]
    pub fn new(renderer: TemplateRenderer, defaults: CommandDefaults) -> Self {
        Self { renderer, defaults }
    }

    /// Create a builder from dispatch config
    #[must_use]
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(
            TemplateRenderer::new(config.templates_dir.clone()),
            CommandDefaults::from_config(config),
        )
    }

    /// Build the command for a chat turn
    #[must_use]
    pub fn build_chat_command(
        &self,
        pipeline_id: Option<&str>,
        rag_tag: Option<&str>,
        history: &[ChatMessage],
        options: &CommandOptions,
    ) -> ExecutionCommand {
        self.chat_command_at(pipeline_id, rag_tag, history, options, now_millis())
    }

    /// Build the command for a document upload
    #[must_use]
    pub fn build_upload_command(
        &self,
        rag_tag: Option<&str>,
        file_names: &[String],
        options: &CommandOptions,
    ) -> ExecutionCommand {
        self.upload_command_at(rag_tag, file_names, options, now_millis())
    }

    pub(crate) fn chat_command_at(
        &self,
        pipeline_id: Option<&str>,
        rag_tag: Option<&str>,
        history: &[ChatMessage],
        options: &CommandOptions,
        timestamp: i64,
    ) -> ExecutionCommand {
        let pipeline_name = non_blank(pipeline_id).unwrap_or(DEFAULT_CHAT_PIPELINE);
        let rag_tag = non_blank(rag_tag);
        let messages = serde_json::to_value(history).unwrap_or_else(|_| json!([]));

        let vars = TemplateVars::new()
            .with("pipelineName", pipeline_name)
            .with("ragTag", rag_tag.unwrap_or_default())
            .with("messages", messages.clone())
            .with("timestamp", timestamp);
        let raw = self
            .renderer
            .render(pipeline_id, TemplateKind::Chat, &vars);

        let defaults = ExecutionCommand {
            tenant_id: self.defaults.tenant_id.clone(),
            user_id: self.defaults.user_id.clone(),
            operation: CHAT_OPERATION.to_string(),
            input: json!({ "messages": messages }),
            pipeline_name: pipeline_name.to_string(),
            metadata: json!({ "ragTag": rag_tag, "timestamp": timestamp }),
            debug: None,
            debug_id: None,
        };

        let mut command = overlay(raw.as_ref(), defaults);
        options.apply(&mut command);
        command
    }

    pub(crate) fn upload_command_at(
        &self,
        rag_tag: Option<&str>,
        file_names: &[String],
        options: &CommandOptions,
        timestamp: i64,
    ) -> ExecutionCommand {
        let rag_tag = non_blank(rag_tag);

        let vars = TemplateVars::new()
            .with("ragTag", rag_tag.unwrap_or_default())
            .with("fileNames", json!(file_names))
            .with("timestamp", timestamp);
        let raw = self.renderer.render(None, TemplateKind::Upload, &vars);

        let defaults = ExecutionCommand {
            tenant_id: self.defaults.tenant_id.clone(),
            user_id: self.defaults.user_id.clone(),
            operation: INGESTION_OPERATION.to_string(),
            input: json!({
                "ragTag": rag_tag,
                "fileNames": file_names,
                "timestamp": timestamp,
            }),
            pipeline_name: ingestion_pipeline_name(rag_tag),
            metadata: json!({ "ragTag": rag_tag, "timestamp": timestamp }),
            debug: None,
            debug_id: None,
        };

        let mut command = overlay(raw.as_ref(), defaults);
        options.apply(&mut command);
        command
    }
}

/// Default pipeline name for ingestion of a tag
#[must_use]
pub fn ingestion_pipeline_name(rag_tag: Option<&str>) -> String {
    format!("doc-{}", sanitize_identifier(rag_tag.unwrap_or("default")))
}

/// Per-field overlay: a field set (non-null) in the template wins.
fn overlay(raw: Option<&Map<String, Value>>, defaults: ExecutionCommand) -> ExecutionCommand {
    let Some(raw) = raw else {
        return defaults;
    };

    ExecutionCommand {
        tenant_id: text_field(raw, "tenantId").unwrap_or(defaults.tenant_id),
        user_id: text_field(raw, "userId").unwrap_or(defaults.user_id),
        operation: text_field(raw, "operation").unwrap_or(defaults.operation),
        input: value_field(raw, "input").unwrap_or(defaults.input),
        pipeline_name: text_field(raw, "pipelineName")
            .or_else(|| text_field(raw, "pipelineId"))
            .unwrap_or(defaults.pipeline_name),
        metadata: value_field(raw, "metadata").unwrap_or(defaults.metadata),
        debug: None,
        debug_id: None,
    }
}

fn value_field(raw: &Map<String, Value>, key: &str) -> Option<Value> {
    raw.get(key).filter(|v| !v.is_null()).cloned()
}

fn text_field(raw: &Map<String, Value>, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests;
