//! Dispatch configuration
//!
//! Deserialized from the `[temporal]` section of the application config.
//! Every field has a default so an empty section is valid.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Canonical workflow type every worker registers
pub const DEFAULT_WORKFLOW_NAME: &str = "CoreWorkflow";

/// Task queue used when no override is configured
pub const DEFAULT_TASK_QUEUE: &str = "core-task-queue";

/// Default chat workflow id template
pub const DEFAULT_CHAT_WORKFLOW_ID_TEMPLATE: &str = "chat-{{pipelineId}}-{{timestamp}}";

/// Default ingestion workflow id template
pub const DEFAULT_DOC_WORKFLOW_ID_TEMPLATE: &str = "doc-ingest-{{ragTag}}-{{timestamp}}";

/// Default chat result deadline (2 minutes)
pub const DEFAULT_CHAT_RESULT_TIMEOUT_MS: u64 = 120_000;

/// Orchestration backend and payload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Temporal HTTP API address
    #[serde(default = "default_address")]
    pub address: String,
    /// Temporal namespace
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Global task queue override
    #[serde(default)]
    pub task_queue: Option<String>,
    /// Chat-specific task queue override (may contain `{{pipelineId}}`)
    #[serde(default)]
    pub chat_task_queue: Option<String>,
    /// Ingestion-specific task queue override
    #[serde(default)]
    pub doc_task_queue: Option<String>,
    /// Chat workflow type template
    #[serde(default = "default_workflow_name")]
    pub chat_workflow: String,
    /// Ingestion workflow type template
    #[serde(default = "default_workflow_name")]
    pub doc_workflow: String,
    /// Chat workflow id template
    #[serde(default = "default_chat_workflow_id_template")]
    pub chat_workflow_id_template: String,
    /// Ingestion workflow id template
    #[serde(default = "default_doc_workflow_id_template")]
    pub doc_workflow_id_template: String,
    /// Chat result deadline in milliseconds; `0` means the default
    #[serde(
        default = "default_chat_result_timeout_ms",
        deserialize_with = "deserialize_timeout_ms"
    )]
    pub chat_result_timeout_ms: u64,
    /// Tenant id placed in commands when the template does not set one
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// User id placed in commands when the template does not set one
    #[serde(default)]
    pub user_id: Option<String>,
    /// Reply with a canned echo when the backend is unreachable
    #[serde(default)]
    pub use_stub_llm: bool,
    /// Directory holding `<pipeline>_chat.tpl` and `upload.tpl`
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
}

fn default_address() -> String {
    "http://localhost:7243".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_workflow_name() -> String {
    DEFAULT_WORKFLOW_NAME.to_string()
}

fn default_chat_workflow_id_template() -> String {
    DEFAULT_CHAT_WORKFLOW_ID_TEMPLATE.to_string()
}

fn default_doc_workflow_id_template() -> String {
    DEFAULT_DOC_WORKFLOW_ID_TEMPLATE.to_string()
}

fn default_chat_result_timeout_ms() -> u64 {
    DEFAULT_CHAT_RESULT_TIMEOUT_MS
}

fn deserialize_timeout_ms<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = u64::deserialize(deserializer)?;
    Ok(if ms == 0 {
        DEFAULT_CHAT_RESULT_TIMEOUT_MS
    } else {
        ms
    })
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            namespace: default_namespace(),
            task_queue: None,
            chat_task_queue: None,
            doc_task_queue: None,
            chat_workflow: default_workflow_name(),
            doc_workflow: default_workflow_name(),
            chat_workflow_id_template: default_chat_workflow_id_template(),
            doc_workflow_id_template: default_doc_workflow_id_template(),
            chat_result_timeout_ms: default_chat_result_timeout_ms(),
            tenant_id: None,
            user_id: None,
            use_stub_llm: false,
            templates_dir: None,
        }
    }
}

impl DispatchConfig {
    /// How long a chat turn waits for the workflow result
    #[must_use]
    pub fn chat_result_timeout(&self) -> Duration {
        match self.chat_result_timeout_ms {
            0 => Duration::from_millis(DEFAULT_CHAT_RESULT_TIMEOUT_MS),
            ms => Duration::from_millis(ms),
        }
    }

    /// Task queue for chat: chat override, then global override, then default
    #[must_use]
    pub fn chat_queue_template(&self) -> &str {
        non_blank(self.chat_task_queue.as_deref())
            .or_else(|| non_blank(self.task_queue.as_deref()))
            .unwrap_or(DEFAULT_TASK_QUEUE)
    }

    /// Task queue for ingestion: ingestion override, then global override, then default
    #[must_use]
    pub fn doc_queue_template(&self) -> &str {
        non_blank(self.doc_task_queue.as_deref())
            .or_else(|| non_blank(self.task_queue.as_deref()))
            .unwrap_or(DEFAULT_TASK_QUEUE)
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests;
