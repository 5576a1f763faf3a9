//! Chat API endpoint
//!
//! `POST /api/chat` runs one turn and waits for the pipeline's reply (bounded
//! by the configured chat deadline).

use super::error::{ApiError, ApiResult};
use axum::{extract::Extension, response::Json, routing::post, Router};
use olo_core::ChatService;
use olo_dispatch::CommandOptions;
use serde::{Deserialize, Serialize};

/// Chat request body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub debug_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssistantMessage {
    pub role: &'static str,
    pub content: String,
}

/// Chat response body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: AssistantMessage,
    pub pipeline_id: String,
    pub rag_tag: Option<String>,
}

async fn send_chat(
    Extension(chat): Extension<ChatService>,
    body: Option<Json<ChatRequest>>,
) -> ApiResult<Json<ChatResponse>> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let (Some(conversation_id), Some(content)) = (request.conversation_id, request.content) else {
        return Err(ApiError::BadRequest(
            "conversationId and content required".to_string(),
        ));
    };

    let options = CommandOptions {
        debug: request.debug,
        debug_id: request.debug_id,
    };
    let turn = chat
        .send_message(&conversation_id, &content, &options)
        .await?;

    Ok(Json(ChatResponse {
        message: AssistantMessage {
            role: "assistant",
            content: turn.reply,
        },
        pipeline_id: turn.pipeline_id,
        rag_tag: turn.rag_tag,
    }))
}

/// Create chat routes
pub fn chat_routes() -> Router {
    Router::new().route("/api/chat", post(send_chat))
}
