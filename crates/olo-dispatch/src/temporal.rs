//! Temporal - HTTP API client
//!
//! Talks to the Temporal frontend's HTTP API (`/api/v1/...`):
//! - namespace describe to probe the connection
//! - workflow start with a single JSON argument
//! - history long-poll filtered to the close event to await a result
//!
//! Payloads come back either in shorthand form (plain JSON values) or as
//! `{ metadata, data }` with base64 `data`; both are accepted.

use crate::config::DispatchConfig;
use crate::dispatcher::{StartWorkflowRequest, WorkflowClient, WorkflowConnector, WorkflowHandle};
use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Upper bound for one HTTP round trip, long polls included
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Connection probe timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StartWorkflowBody<'a> {
    workflow_id: &'a str,
    workflow_type: NamedRef<'a>,
    task_queue: NamedRef<'a>,
    input: &'a [crate::command::ExecutionCommand],
    #[serde(skip_serializing_if = "Option::is_none")]
    search_attributes: Option<IndexedFields<'a>>,
}

#[derive(Debug, Serialize)]
struct NamedRef<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexedFields<'a> {
    indexed_fields: &'a crate::addressing::SearchAttributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartWorkflowReply {
    #[serde(default)]
    run_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryReply {
    #[serde(default)]
    history: Option<History>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct History {
    #[serde(default)]
    events: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// How a workflow execution closed
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CloseEvent {
    /// Completed with a result (`Null` when the workflow returned nothing)
    Completed(Value),
    /// Failed, terminated, cancelled or timed out upstream
    Closed(String),
    /// Continued as new under another run id
    ContinuedAsNew(String),
}

// ============================================================================
// Connector
// ============================================================================

/// Connects to Temporal over its HTTP API
#[derive(Debug, Clone)]
pub struct TemporalConnector {
    address: String,
    namespace: String,
}

impl TemporalConnector {
    /// Create a connector from dispatch config
    #[must_use]
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            address: config.address.trim_end_matches('/').to_string(),
            namespace: config.namespace.clone(),
        }
    }
}

#[async_trait]
impl WorkflowConnector for TemporalConnector {
    async fn connect(&self) -> Result<Arc<dyn WorkflowClient>> {
        let client = TemporalClient::new(&self.address, &self.namespace)?;
        client.describe_namespace().await?;
        info!(address = %self.address, namespace = %self.namespace, "Connected to Temporal");
        Ok(Arc::new(client))
    }
}

// ============================================================================
// Client
// ============================================================================

/// Temporal HTTP API client bound to one namespace
#[derive(Debug, Clone)]
pub struct TemporalClient {
    http: Client,
    address: String,
    namespace: String,
}

impl TemporalClient {
    /// Create a client
    pub fn new(address: &str, namespace: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            http,
            address: address.trim_end_matches('/').to_string(),
            namespace: namespace.to_string(),
        })
    }

    fn namespace_url(&self) -> String {
        format!("{}/api/v1/namespaces/{}", self.address, self.namespace)
    }

    async fn describe_namespace(&self) -> Result<()> {
        let response = self
            .http
            .get(self.namespace_url())
            .timeout(CONNECT_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                Error::NotConfigured(format!(
                    "Failed to connect to Temporal at {}: {}",
                    self.address, e
                ))
            })?;

        if !response.status().is_success() {
            return Err(Error::NotConfigured(format!(
                "Temporal namespace \"{}\" unavailable: HTTP {}",
                self.namespace,
                response.status()
            )));
        }
        Ok(())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ApiError>(&body) {
                if !error.message.is_empty() {
                    return Err(Error::Api(error.message));
                }
            }
            return Err(Error::Api(format!("HTTP {}: {}", status, body)));
        }
        Ok(body)
    }

    async fn poll_close_event(&self, workflow_id: &str, run_id: Option<&str>) -> Result<CloseEvent> {
        let url = format!("{}/workflows/{}/history", self.namespace_url(), workflow_id);
        let mut page_token: Option<String> = None;

        loop {
            let mut query: Vec<(&str, &str)> = vec![
                ("waitNewEvent", "true"),
                (
                    "historyEventFilterType",
                    "HISTORY_EVENT_FILTER_TYPE_CLOSE_EVENT",
                ),
            ];
            if let Some(run_id) = run_id {
                query.push(("execution.runId", run_id));
            }
            if let Some(token) = page_token.as_deref() {
                query.push(("nextPageToken", token));
            }

            let body = self.send(self.http.get(&url).query(&query)).await?;
            let reply: HistoryReply = serde_json::from_str(&body)
                .map_err(|e| Error::InvalidResponse(format!("{}: {}", e, body)))?;

            let events = reply.history.unwrap_or_default().events;
            if let Some(event) = events.last() {
                return parse_close_event(event);
            }

            debug!(workflow_id, "No close event yet, polling again");
            page_token = reply.next_page_token.filter(|t| !t.is_empty());
        }
    }
}

#[async_trait]
impl WorkflowClient for TemporalClient {
    async fn start_workflow(&self, request: &StartWorkflowRequest) -> Result<WorkflowHandle> {
        let url = format!("{}/workflows/{}", self.namespace_url(), request.workflow_id);
        let body = StartWorkflowBody {
            workflow_id: &request.workflow_id,
            workflow_type: NamedRef {
                name: &request.workflow_name,
            },
            task_queue: NamedRef {
                name: &request.task_queue,
            },
            input: &request.args,
            search_attributes: request
                .search_attributes
                .as_ref()
                .map(|attrs| IndexedFields {
                    indexed_fields: attrs,
                }),
        };

        let text = self.send(self.http.post(&url).json(&body)).await?;
        let reply: StartWorkflowReply = serde_json::from_str(&text)
            .map_err(|e| Error::InvalidResponse(format!("{}: {}", e, text)))?;

        Ok(WorkflowHandle {
            workflow_id: request.workflow_id.clone(),
            run_id: reply.run_id.filter(|id| !id.is_empty()),
        })
    }

    async fn await_result(&self, handle: &WorkflowHandle) -> Result<Value> {
        let mut run_id = handle.run_id.clone();
        loop {
            match self
                .poll_close_event(&handle.workflow_id, run_id.as_deref())
                .await?
            {
                CloseEvent::Completed(result) => return Ok(result),
                CloseEvent::Closed(message) => return Err(Error::WorkflowFailed(message)),
                CloseEvent::ContinuedAsNew(next) => {
                    debug!(workflow_id = %handle.workflow_id, run_id = %next, "Workflow continued as new");
                    run_id = Some(next);
                }
            }
        }
    }
}

// ============================================================================
// Event decoding
// ============================================================================

pub(crate) fn parse_close_event(event: &Value) -> Result<CloseEvent> {
    if let Some(attrs) = event.get("workflowExecutionCompletedEventAttributes") {
        let first = attrs
            .pointer("/result/payloads/0")
            .map(decode_payload)
            .transpose()?;
        return Ok(CloseEvent::Completed(first.unwrap_or(Value::Null)));
    }

    if let Some(attrs) = event.get("workflowExecutionFailedEventAttributes") {
        let message = attrs
            .pointer("/failure/message")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .unwrap_or("Workflow execution failed");
        return Ok(CloseEvent::Closed(message.to_string()));
    }

    if let Some(attrs) = event.get("workflowExecutionContinuedAsNewEventAttributes") {
        if let Some(next) = attrs.get("newExecutionRunId").and_then(Value::as_str) {
            return Ok(CloseEvent::ContinuedAsNew(next.to_string()));
        }
    }

    let closed = [
        ("workflowExecutionTerminatedEventAttributes", "Workflow execution terminated"),
        ("workflowExecutionCanceledEventAttributes", "Workflow execution cancelled"),
        ("workflowExecutionTimedOutEventAttributes", "Workflow execution timed out"),
    ];
    for (key, message) in closed {
        if event.get(key).is_some() {
            return Ok(CloseEvent::Closed(message.to_string()));
        }
    }

    Err(Error::InvalidResponse(format!(
        "unexpected close event: {}",
        event
    )))
}

/// Decode one payload: shorthand JSON as is, `{metadata, data}` via base64
pub(crate) fn decode_payload(payload: &Value) -> Result<Value> {
    let encoded = match (payload.get("metadata"), payload.get("data")) {
        (Some(_), Some(Value::String(data))) => data,
        _ => return Ok(payload.clone()),
    };

    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| Error::InvalidResponse(format!("payload is not base64: {}", e)))?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned())))
}
