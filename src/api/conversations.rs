//! Conversation API endpoints
//!
//! Creating a conversation only touches the store; no workflow is started
//! until the first chat turn.

use super::error::{ApiError, ApiResult};
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use olo_store::{Bucket, Conversation, ConversationStore, Message};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Query parameters for listing conversations
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// `rag` or `chat` (anything else means chat)
    pub scope: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConversationList {
    pub conversations: Vec<Conversation>,
}

#[derive(Debug, Serialize)]
pub struct MessageList {
    pub messages: Vec<Message>,
}

/// Create request; both fields optional
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConversationRequest {
    #[serde(default)]
    pub rag_tag: Option<String>,
    #[serde(default)]
    pub pipeline_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RenameRequest {
    #[serde(default)]
    pub title: Option<String>,
}

async fn list_conversations(
    Extension(store): Extension<Arc<dyn ConversationStore>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ConversationList>> {
    let bucket = Bucket::from_scope(query.scope.as_deref());
    let conversations = store.list_conversations(bucket).await?;
    Ok(Json(ConversationList { conversations }))
}

async fn create_conversation(
    Extension(store): Extension<Arc<dyn ConversationStore>>,
    body: Option<Json<CreateConversationRequest>>,
) -> ApiResult<impl IntoResponse> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let conv = store
        .create_conversation(request.rag_tag.as_deref(), request.pipeline_id.as_deref())
        .await?;

    info!(id = %conv.id, bucket = %conv.bucket, "Conversation created");
    Ok((StatusCode::CREATED, Json(conv)))
}

async fn get_conversation(
    Extension(store): Extension<Arc<dyn ConversationStore>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Conversation>> {
    store
        .get_conversation(&id)
        .await?
        .map(Json)
        .ok_or_else(ApiError::conversation_not_found)
}

async fn get_messages(
    Extension(store): Extension<Arc<dyn ConversationStore>>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageList>> {
    let messages = store.get_messages(&id).await?;
    Ok(Json(MessageList { messages }))
}

async fn rename_conversation(
    Extension(store): Extension<Arc<dyn ConversationStore>>,
    Path(id): Path<String>,
    body: Option<Json<RenameRequest>>,
) -> ApiResult<Json<Conversation>> {
    let title = body
        .and_then(|Json(request)| request.title)
        .ok_or_else(|| ApiError::BadRequest("title required".to_string()))?;

    store
        .update_conversation_title(&id, &title)
        .await?
        .map(Json)
        .ok_or_else(ApiError::conversation_not_found)
}

async fn delete_conversation(
    Extension(store): Extension<Arc<dyn ConversationStore>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if store.delete_conversation(&id).await? {
        info!(id = %id, "Conversation deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::conversation_not_found())
    }
}

/// Create conversation routes
pub fn conversations_routes() -> Router {
    Router::new()
        .route(
            "/api/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/api/conversations/:id",
            get(get_conversation)
                .patch(rename_conversation)
                .delete(delete_conversation),
        )
        .route("/api/conversations/:id/messages", get(get_messages))
}
