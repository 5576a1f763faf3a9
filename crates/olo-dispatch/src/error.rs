//! Error types for olo-dispatch

use thiserror::Error;

/// Dispatch error type
#[derive(Debug, Error)]
pub enum Error {
    /// Orchestration backend not configured or unreachable
    #[error("{0}")]
    NotConfigured(String),

    /// Network error talking to the backend
    #[error("network error: {0}")]
    Network(String),

    /// Backend rejected the request
    #[error("{0}")]
    Api(String),

    /// Backend replied with something we could not decode
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Workflow closed without a result (failed, terminated, cancelled, timed out upstream)
    #[error("{0}")]
    WorkflowFailed(String),

    /// Local deadline for the workflow result elapsed
    #[error(
        "Workflow did not complete within {secs}s. Ensure a Worker is running on task queue \"{task_queue}\" with workflow \"{workflow_name}\".",
        secs = as_secs(.timeout_ms)
    )]
    Timeout {
        /// Deadline in milliseconds
        timeout_ms: u64,
        /// Task queue the workflow was submitted to
        task_queue: String,
        /// Workflow type name
        workflow_name: String,
    },
}

impl Error {
    /// Whether this error is the local result deadline
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

fn as_secs(timeout_ms: &u64) -> f64 {
    *timeout_ms as f64 / 1000.0
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
