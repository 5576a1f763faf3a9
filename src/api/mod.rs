//! Web API module for Olo
//!
//! Provides REST API endpoints for:
//! - Health and store backend reporting
//! - Conversations and their messages
//! - Chat turns
//! - Document uploads and RAG tags
//! - The pipeline catalog
//! - Clearing the Redis store

pub mod chat;
pub mod conversations;
pub mod documents;
pub mod error;
pub mod health;
pub mod pipelines;
pub mod store;

use axum::extract::DefaultBodyLimit;
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Json, Response};
use axum::{Extension, Router};
use olo_core::{ChatService, DocumentService, PipelineCatalog};
use olo_dispatch::WorkflowDispatcher;
use olo_store::ConversationStore;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use chat::chat_routes;
pub use conversations::conversations_routes;
pub use documents::documents_routes;
pub use health::health_routes;
pub use pipelines::pipelines_routes;
pub use store::store_routes;

/// JSON request body limit
const JSON_BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Create the API router with all endpoints
pub fn api_router() -> Router {
    Router::new()
        .merge(health_routes())
        .merge(conversations_routes())
        .merge(chat_routes())
        .merge(documents_routes())
        .merge(pipelines_routes())
        .merge(store_routes())
        .fallback(not_found)
}

/// The full application: routes, shared services and middleware
pub fn app(
    store: Arc<dyn ConversationStore>,
    dispatcher: Arc<WorkflowDispatcher>,
    catalog: PipelineCatalog,
) -> Router {
    let chat = ChatService::new(store.clone(), dispatcher.clone());
    let documents = DocumentService::new(store.clone(), dispatcher);

    api_router()
        .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT))
        .layer(Extension(store))
        .layer(Extension(chat))
        .layer(Extension(documents))
        .layer(Extension(Arc::new(catalog)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Unknown `/api/*` paths get a JSON 404 naming the path below `/api`
async fn not_found(uri: Uri) -> Response {
    match uri.path().strip_prefix("/api") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => {
            let path = if rest.is_empty() { "/" } else { rest };
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Not found", "path": path })),
            )
                .into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
