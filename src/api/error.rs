//! API error responses
//!
//! Every failure renders as JSON with at least an `error` field.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use olo_core::{ChatError, UploadError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Shown with a failed ingestion start
pub const INGESTION_HINT: &str =
    "Ensure Temporal server is running and CoreWorkflow is registered.";

/// Error returned by API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Document ingestion could not be started.")]
    IngestionNotStarted { detail: String },

    #[error("{0}")]
    Store(#[from] olo_store::Error),
}

impl ApiError {
    pub fn conversation_not_found() -> Self {
        Self::NotFound("Conversation not found".to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::IngestionNotStarted { .. } => StatusCode::BAD_GATEWAY,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::IngestionNotStarted { detail } => json!({
                "error": self.to_string(),
                "detail": detail,
                "hint": INGESTION_HINT,
            }),
            Self::Store(e) => {
                error!(error = %e, "Store request failed");
                json!({ "error": self.to_string() })
            }
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::InvalidInput(msg) => Self::BadRequest(msg),
            ChatError::ConversationNotFound(_) => Self::conversation_not_found(),
            ChatError::Store(e) => Self::Store(e),
        }
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::MissingTag | UploadError::NoFiles => Self::BadRequest(err.to_string()),
            UploadError::DispatchFailed { detail } => Self::IngestionNotStarted { detail },
            UploadError::Store(e) => Self::Store(e),
        }
    }
}

/// Handler result
pub type ApiResult<T> = std::result::Result<T, ApiError>;
