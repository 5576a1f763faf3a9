//! Workflow dispatcher
//!
//! Submits chat turns and document ingestions to the orchestration backend.
//! The backend connection is established lazily on first use and cached for
//! the life of the process; a failed attempt leaves nothing cached, so the
//! next call tries again.
//!
//! Nothing here returns an error to the caller. Every path ends in an
//! [`IngestionOutcome`] or [`ChatOutcome`] carrying a human-readable message.

use crate::addressing::{
    build_search_attributes, Addressing, AttributeValues, DispatchAddress, SearchAttributes,
};
use crate::command::{ChatMessage, CommandBuilder, CommandOptions, ExecutionCommand};
use crate::config::DispatchConfig;
use crate::error::{Error, Result};
use crate::extract::extract_reply;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

/// Error text when there is no backend to talk to
pub const NOT_CONFIGURED: &str = "Temporal not configured";

/// Chat error text when there is no backend and stub replies are off
pub const NOT_CONFIGURED_CHAT: &str =
    "Temporal not configured. Set OLO_TEMPORAL__USE_STUB_LLM=true for stub replies.";

/// Characters of the user's message echoed back by the stub
const STUB_ECHO_CHARS: usize = 100;

/// Request to start one workflow execution
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartWorkflowRequest {
    /// Workflow type name
    pub workflow_name: String,
    /// Task queue
    pub task_queue: String,
    /// Workflow id
    pub workflow_id: String,
    /// Workflow arguments; always a single command
    pub args: Vec<ExecutionCommand>,
    /// Indexed attributes, omitted when empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_attributes: Option<SearchAttributes>,
}

/// Started workflow execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowHandle {
    /// Workflow id
    pub workflow_id: String,
    /// Run id of the first execution, when the backend reports one
    pub run_id: Option<String>,
}

/// Connected orchestration backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowClient: Send + Sync {
    /// Start a workflow execution
    async fn start_workflow(&self, request: &StartWorkflowRequest) -> Result<WorkflowHandle>;

    /// Wait for the execution to close and return its result
    async fn await_result(&self, handle: &WorkflowHandle) -> Result<Value>;
}

/// Opens a connection to the orchestration backend
#[async_trait]
pub trait WorkflowConnector: Send + Sync {
    /// Connect, or fail with the reason the backend is unavailable
    async fn connect(&self) -> Result<Arc<dyn WorkflowClient>>;
}

/// Result of an ingestion dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionOutcome {
    /// Whether the workflow was accepted
    pub started: bool,
    /// Workflow id (resolved id when submission failed)
    pub workflow_id: Option<String>,
    /// Run id
    pub run_id: Option<String>,
    /// Failure text
    pub error: Option<String>,
}

/// How a chat dispatch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// A reply was produced
    Completed,
    /// The local result deadline elapsed
    TimedOut,
    /// Not configured, rejected, or the workflow failed
    Failed,
}

/// Result of a chat dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatOutcome {
    /// Whether `reply` holds the assistant's answer
    pub success: bool,
    /// Reply text
    pub reply: Option<String>,
    /// Failure text
    pub error: Option<String>,
    /// Outcome classification
    pub status: DispatchStatus,
}

impl ChatOutcome {
    fn completed(reply: String) -> Self {
        Self {
            success: true,
            reply: Some(reply),
            error: None,
            status: DispatchStatus::Completed,
        }
    }

    fn failed(message: impl Into<String>, status: DispatchStatus) -> Self {
        Self {
            success: false,
            reply: None,
            error: Some(message.into()),
            status,
        }
    }

    fn from_error(err: &Error) -> Self {
        let status = if err.is_timeout() {
            DispatchStatus::TimedOut
        } else {
            DispatchStatus::Failed
        };
        Self::failed(err.to_string(), status)
    }
}

/// Dispatches chat and ingestion work
pub struct WorkflowDispatcher {
    connector: Arc<dyn WorkflowConnector>,
    client: OnceCell<Arc<dyn WorkflowClient>>,
    builder: CommandBuilder,
    addressing: Addressing,
    result_timeout: Duration,
    use_stub_llm: bool,
}

impl WorkflowDispatcher {
    /// Create a dispatcher from config and a backend connector
    #[must_use]
    pub fn new(config: &DispatchConfig, connector: Arc<dyn WorkflowConnector>) -> Self {
        Self {
            connector,
            client: OnceCell::new(),
            builder: CommandBuilder::from_config(config),
            addressing: Addressing::from_config(config),
            result_timeout: config.chat_result_timeout(),
            use_stub_llm: config.use_stub_llm,
        }
    }

    /// Replace the command builder
    #[must_use]
    pub fn with_builder(mut self, builder: CommandBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Whether a backend connection is cached
    pub fn is_connected(&self) -> bool {
        self.client.initialized()
    }

    /// Cached client, connecting on first use
    async fn client(&self) -> Option<Arc<dyn WorkflowClient>> {
        match self
            .client
            .get_or_try_init(|| self.connector.connect())
            .await
        {
            Ok(client) => Some(Arc::clone(client)),
            Err(e) => {
                warn!(error = %e, "Workflow backend not available");
                None
            }
        }
    }

    /// Start document ingestion without waiting for it
    pub async fn dispatch_ingestion(
        &self,
        rag_tag: Option<&str>,
        file_names: &[String],
        options: &CommandOptions,
    ) -> IngestionOutcome {
        let Some(client) = self.client().await else {
            return IngestionOutcome {
                started: false,
                workflow_id: None,
                run_id: None,
                error: Some(NOT_CONFIGURED.to_string()),
            };
        };

        let timestamp = Utc::now().timestamp_millis();
        let command = self
            .builder
            .upload_command_at(rag_tag, file_names, options, timestamp);
        let address = self.addressing.ingestion(rag_tag, timestamp);
        let request = start_request(address, command);

        log_submit("document ingestion", &request);

        match client.start_workflow(&request).await {
            Ok(handle) => {
                info!(
                    workflow_id = %handle.workflow_id,
                    run_id = ?handle.run_id,
                    "Document ingestion started"
                );
                IngestionOutcome {
                    started: true,
                    workflow_id: Some(handle.workflow_id),
                    run_id: handle.run_id,
                    error: None,
                }
            }
            Err(e) => {
                error!(workflow_id = %request.workflow_id, error = %e, "Document ingestion failed to start");
                IngestionOutcome {
                    started: false,
                    workflow_id: Some(request.workflow_id),
                    run_id: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Run a chat turn and wait, bounded, for the reply
    pub async fn dispatch_chat(
        &self,
        pipeline_id: Option<&str>,
        rag_tag: Option<&str>,
        history: &[ChatMessage],
        options: &CommandOptions,
    ) -> ChatOutcome {
        let Some(client) = self.client().await else {
            if self.use_stub_llm {
                return ChatOutcome::completed(stub_reply(history));
            }
            return ChatOutcome::failed(NOT_CONFIGURED_CHAT, DispatchStatus::Failed);
        };

        let timestamp = Utc::now().timestamp_millis();
        let command = self
            .builder
            .chat_command_at(pipeline_id, rag_tag, history, options, timestamp);
        let address = self.addressing.chat(pipeline_id, timestamp);
        let request = start_request(address, command);

        log_submit("chat", &request);

        match self.run_chat(client.as_ref(), &request).await {
            Ok((handle, result)) => {
                info!(
                    workflow_id = %handle.workflow_id,
                    run_id = ?handle.run_id,
                    result = %result,
                    "Chat workflow completed"
                );
                ChatOutcome::completed(extract_reply(&result))
            }
            Err(e) => {
                error!(
                    workflow_id = %request.workflow_id,
                    timed_out = e.is_timeout(),
                    error = %e,
                    "Chat workflow failed"
                );
                ChatOutcome::from_error(&e)
            }
        }
    }

    async fn run_chat(
        &self,
        client: &dyn WorkflowClient,
        request: &StartWorkflowRequest,
    ) -> Result<(WorkflowHandle, Value)> {
        let handle = client.start_workflow(request).await?;

        // On expiry the wait is dropped locally; the workflow keeps running upstream.
        let result = tokio::time::timeout(self.result_timeout, client.await_result(&handle))
            .await
            .map_err(|_| Error::Timeout {
                timeout_ms: self.result_timeout.as_millis() as u64,
                task_queue: request.task_queue.clone(),
                workflow_name: request.workflow_name.clone(),
            })??;

        Ok((handle, result))
    }
}

fn start_request(address: DispatchAddress, command: ExecutionCommand) -> StartWorkflowRequest {
    let search_attributes = build_search_attributes(&AttributeValues {
        pipeline_name: Some(command.pipeline_name.as_str()),
        operation: Some(command.operation.as_str()),
        tenant_id: Some(command.tenant_id.as_str()),
        user_id: Some(command.user_id.as_str()),
    });

    StartWorkflowRequest {
        workflow_name: address.workflow_name,
        task_queue: address.task_queue,
        workflow_id: address.workflow_id,
        args: vec![command],
        search_attributes,
    }
}

fn log_submit(kind: &str, request: &StartWorkflowRequest) {
    let payload = request
        .args
        .first()
        .and_then(|command| serde_json::to_string(command).ok())
        .unwrap_or_default();
    info!(
        kind,
        workflow_name = %request.workflow_name,
        workflow_id = %request.workflow_id,
        task_queue = %request.task_queue,
        search_attributes = ?request.search_attributes,
        payload = %payload,
        "Submitting workflow"
    );
}

/// Canned reply echoing the last user message
#[must_use]
pub fn stub_reply(history: &[ChatMessage]) -> String {
    let question: String = history
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.chars().take(STUB_ECHO_CHARS).collect())
        .unwrap_or_default();
    format!(
        "[Stub LLM] You said: \"{question}\". Configure Temporal and templates for real responses."
    )
}

#[cfg(test)]
mod tests;
