//! Store maintenance endpoint
//!
//! `POST /api/store/clear` wipes every key under the Redis namespace. The
//! memory backend refuses.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use olo_store::{BackendKind, ConversationStore};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

async fn clear_store(Extension(store): Extension<Arc<dyn ConversationStore>>) -> Response {
    if store.backend_kind() != BackendKind::Redis {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "cleared": false,
                "error": "Redis not in use. Clear all only applies to Redis store.",
            })),
        )
            .into_response();
    }

    match store.clear_all().await {
        Ok(outcome) if outcome.cleared => Json(outcome).into_response(),
        Ok(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "cleared": false, "error": "Clear failed or Redis unavailable." })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Store clear failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "cleared": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

/// Create store routes
pub fn store_routes() -> Router {
    Router::new().route("/api/store/clear", post(clear_store))
}
