//! Document uploads
//!
//! The gateway never stores document content. An upload registers its RAG
//! tag and starts an ingestion workflow with the file names; the workers do
//! the rest.

use crate::error::UploadError;
use olo_dispatch::{CommandOptions, WorkflowDispatcher};
use olo_store::ConversationStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

/// Most files accepted in one upload
pub const MAX_UPLOAD_FILES: usize = 20;

/// Accepted upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAccepted {
    /// Trimmed tag
    pub rag_tag: String,
    /// Names of the uploaded files
    pub file_names: Vec<String>,
    /// Ingestion workflow id
    pub workflow_id: Option<String>,
    /// Ingestion run id
    pub run_id: Option<String>,
}

/// Starts document ingestion
#[derive(Clone)]
pub struct DocumentService {
    store: Arc<dyn ConversationStore>,
    dispatcher: Arc<WorkflowDispatcher>,
}

impl DocumentService {
    /// Create a document service
    #[must_use]
    pub fn new(store: Arc<dyn ConversationStore>, dispatcher: Arc<WorkflowDispatcher>) -> Self {
        Self { store, dispatcher }
    }

    /// Register the tag and start ingestion of `file_names`
    pub async fn upload(
        &self,
        rag_tag: &str,
        file_names: Vec<String>,
        options: &CommandOptions,
    ) -> Result<UploadAccepted, UploadError> {
        let tag = rag_tag.trim();
        if tag.is_empty() {
            return Err(UploadError::MissingTag);
        }
        if file_names.is_empty() {
            return Err(UploadError::NoFiles);
        }

        self.store.register_rag_tag(tag).await?;

        let outcome = self
            .dispatcher
            .dispatch_ingestion(Some(tag), &file_names, options)
            .await;

        if !outcome.started {
            if let Some(detail) = outcome.error {
                error!(rag_tag = %tag, error = %detail, "Document ingestion not started");
                return Err(UploadError::DispatchFailed { detail });
            }
        }

        info!(
            rag_tag = %tag,
            files = file_names.len(),
            workflow_id = ?outcome.workflow_id,
            "Upload accepted"
        );
        Ok(UploadAccepted {
            rag_tag: tag.to_string(),
            file_names,
            workflow_id: outcome.workflow_id,
            run_id: outcome.run_id,
        })
    }
}
