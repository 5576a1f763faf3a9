//! Dispatch addressing
//!
//! Resolves where a unit of work goes: workflow type name, workflow id and
//! task queue. All three come from configurable templates rendered with the
//! same `{{name}}` rule as payload templates, against sanitized runtime
//! variables (`pipelineId` or `ragTag`, plus `timestamp`).

use crate::config::{DispatchConfig, DEFAULT_WORKFLOW_NAME};
use crate::template::{fill_template, TemplateVars};
use serde::Serialize;
use std::collections::BTreeMap;

/// Workflow type names from older worker deployments, all served by `CoreWorkflow` now
pub const LEGACY_WORKFLOW_NAMES: &[&str] = &["chatPipelineWorkflow", "documentIngestionWorkflow"];

/// Indexed attributes attached to a workflow. Keyword attributes are list-typed.
pub type SearchAttributes = BTreeMap<String, Vec<String>>;

/// Replace every character outside `[A-Za-z0-9_-]` with `_`
#[must_use]
pub fn sanitize_identifier(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Map legacy and blank workflow names to the canonical one
#[must_use]
pub fn normalize_workflow_name(raw: &str) -> &str {
    let trimmed = raw.trim();
    if trimmed.is_empty() || LEGACY_WORKFLOW_NAMES.contains(&trimmed) {
        DEFAULT_WORKFLOW_NAME
    } else {
        trimmed
    }
}

/// Resolved destination for a unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchAddress {
    /// Workflow type name
    pub workflow_name: String,
    /// Workflow id
    pub workflow_id: String,
    /// Task queue
    pub task_queue: String,
}

/// Candidate values for search attributes
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeValues<'a> {
    /// Pipeline name
    pub pipeline_name: Option<&'a str>,
    /// Operation
    pub operation: Option<&'a str>,
    /// Tenant id
    pub tenant_id: Option<&'a str>,
    /// User id
    pub user_id: Option<&'a str>,
}

/// Build search attributes, dropping blank values. `None` when nothing is left.
#[must_use]
pub fn build_search_attributes(values: &AttributeValues<'_>) -> Option<SearchAttributes> {
    let attrs: SearchAttributes = [
        ("pipelineName", values.pipeline_name),
        ("operation", values.operation),
        ("tenantId", values.tenant_id),
        ("userId", values.user_id),
    ]
    .into_iter()
    .filter_map(|(key, value)| {
        let value = value?.trim();
        (!value.is_empty()).then(|| (key.to_string(), vec![value.to_string()]))
    })
    .collect();

    (!attrs.is_empty()).then_some(attrs)
}

/// Address templates for chat and ingestion
#[derive(Debug, Clone)]
pub struct Addressing {
    chat_workflow: String,
    chat_workflow_id: String,
    chat_queue: String,
    doc_workflow: String,
    doc_workflow_id: String,
    doc_queue: String,
}

impl Default for Addressing {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

impl Addressing {
    /// Take templates from dispatch config
    #[must_use]
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            chat_workflow: config.chat_workflow.clone(),
            chat_workflow_id: config.chat_workflow_id_template.clone(),
            chat_queue: config.chat_queue_template().to_string(),
            doc_workflow: config.doc_workflow.clone(),
            doc_workflow_id: config.doc_workflow_id_template.clone(),
            doc_queue: config.doc_queue_template().to_string(),
        }
    }

    /// Address for a chat turn
    #[must_use]
    pub fn chat(&self, pipeline_id: Option<&str>, timestamp: i64) -> DispatchAddress {
        resolve(
            &self.chat_workflow,
            &self.chat_workflow_id,
            &self.chat_queue,
            "pipelineId",
            pipeline_id,
            timestamp,
        )
    }

    /// Address for a document ingestion
    #[must_use]
    pub fn ingestion(&self, rag_tag: Option<&str>, timestamp: i64) -> DispatchAddress {
        resolve(
            &self.doc_workflow,
            &self.doc_workflow_id,
            &self.doc_queue,
            "ragTag",
            rag_tag,
            timestamp,
        )
    }
}

fn resolve(
    name_template: &str,
    id_template: &str,
    queue_template: &str,
    var_name: &str,
    var_value: Option<&str>,
    timestamp: i64,
) -> DispatchAddress {
    let value = sanitize_identifier(
        var_value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("default"),
    );
    let timestamp_text = timestamp.to_string();
    let vars = TemplateVars::new()
        .with(var_name, value.as_str())
        .with("timestamp", timestamp);

    let workflow_name = fill_template(normalize_workflow_name(name_template), &vars);
    let workflow_id = repair_placeholders(
        fill_template(id_template, &vars),
        &[(var_name, value.as_str()), ("timestamp", timestamp_text.as_str())],
    );
    let task_queue = fill_template(queue_template, &vars);

    DispatchAddress {
        workflow_name,
        workflow_id,
        task_queue,
    }
}

/// Fill placeholders a typo left behind, e.g. `{{ragTag}-{{timestamp}}`.
fn repair_placeholders(mut id: String, vars: &[(&str, &str)]) -> String {
    for (name, value) in vars {
        let full = format!("{{{{{name}}}}}");
        let open = format!("{{{{{name}}}");
        if id.contains(&open) {
            id = id.replace(&full, value).replace(&open, value);
        }
    }
    id
}
