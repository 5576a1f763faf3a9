//! Pipeline catalog
//!
//! Two lists: chat pipelines (no retrieval) and RAG pipelines. Either list
//! can be replaced from config with a comma-separated `id:Label` string;
//! entries without a label use the id.

use serde::{Deserialize, Serialize};

const DEFAULT_CHAT_PIPELINES: &[(&str, &str)] = &[
    ("llama-oss", "Llama OSS"),
    ("openai-oss", "OpenAI OSS"),
    ("both", "Both models"),
    ("chat-mistral", "Mistral"),
    ("chat-llama3.2", "Llama 3.2"),
    ("chat-phi3", "Phi-3"),
    ("chat-gemma2-2b", "Gemma 2 2B"),
    ("chat-qwen2-1.5b", "Qwen2 1.5B"),
    ("query-all-models", "Query all models"),
];

const DEFAULT_RAG_PIPELINES: &[(&str, &str)] = &[
    ("question-answer", "Question-Answer (RAG)"),
    ("rag-llama-oss", "RAG Llama OSS"),
    ("rag-openai-oss", "RAG OpenAI OSS"),
    ("rag-both", "RAG Both models"),
    ("rag-mistral", "RAG Mistral"),
    ("rag-llama3.2", "RAG Llama 3.2"),
    ("rag-phi3", "RAG Phi-3"),
    ("rag-gemma2-2b", "RAG Gemma 2 2B"),
    ("rag-qwen2-1.5b", "RAG Qwen2 1.5B"),
];

/// `[pipelines]` config section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelinesConfig {
    /// Chat list override
    #[serde(default)]
    pub chat: Option<String>,
    /// RAG list override
    #[serde(default)]
    pub rag: Option<String>,
}

/// A selectable pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOption {
    /// Pipeline id sent to workers
    pub id: String,
    /// Display label
    pub label: String,
}

impl PipelineOption {
    fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
        }
    }
}

/// Chat and RAG pipeline lists
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineCatalog {
    /// Chat pipelines
    pub pipelines: Vec<PipelineOption>,
    /// RAG pipelines
    pub pipelines_rag: Vec<PipelineOption>,
}

impl Default for PipelineCatalog {
    fn default() -> Self {
        Self::from_config(&PipelinesConfig::default())
    }
}

impl PipelineCatalog {
    /// Build the catalog, applying overrides
    #[must_use]
    pub fn from_config(config: &PipelinesConfig) -> Self {
        Self {
            pipelines: parse_pipeline_options(config.chat.as_deref(), DEFAULT_CHAT_PIPELINES),
            pipelines_rag: parse_pipeline_options(config.rag.as_deref(), DEFAULT_RAG_PIPELINES),
        }
    }
}

/// Parse `id:Label,id2` into options; blank input yields the defaults
#[must_use]
pub fn parse_pipeline_options(raw: Option<&str>, defaults: &[(&str, &str)]) -> Vec<PipelineOption> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return defaults
            .iter()
            .map(|(id, label)| PipelineOption::new(id, label))
            .collect();
    }

    raw.split(',')
        .map(str::trim)
        .filter_map(|entry| match entry.split_once(':') {
            Some((id, label)) if !id.trim().is_empty() => {
                Some(PipelineOption::new(id.trim(), label.trim()))
            }
            Some(_) => None,
            None if !entry.is_empty() => Some(PipelineOption::new(entry, entry)),
            None => None,
        })
        .collect()
}
