//! Health check endpoint

use axum::extract::Extension;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use olo_store::{BackendKind, ConversationStore};
use serde::Serialize;
use std::sync::Arc;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub store: BackendKind,
}

/// Liveness plus the storage backend chosen at startup
pub async fn health_check(
    Extension(store): Extension<Arc<dyn ConversationStore>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        store: store.backend_kind(),
    })
}

/// Create health routes
pub fn health_routes() -> Router {
    Router::new().route("/api/health", get(health_check))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health_reports_backend() {
        let (app, _) = stub_app();

        let (status, body) = send(&app, get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
        assert_eq!(body["store"], "memory");
    }
}
