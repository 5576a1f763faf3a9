//! Pipeline catalog endpoint

use axum::{extract::Extension, response::Json, routing::get, Router};
use olo_core::PipelineCatalog;
use std::sync::Arc;

async fn list_pipelines(Extension(catalog): Extension<Arc<PipelineCatalog>>) -> Json<PipelineCatalog> {
    Json(catalog.as_ref().clone())
}

/// Create pipeline routes
pub fn pipelines_routes() -> Router {
    Router::new().route("/api/pipelines", get(list_pipelines))
}
