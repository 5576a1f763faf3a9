//! Document API endpoints
//!
//! Uploads are multipart forms with a `ragTag` (or `tag`) text field and up
//! to 20 `files` parts. File bodies are streamed chunk by chunk to enforce
//! the size limit and then dropped; only the names travel to the ingestion
//! workflow.

use super::error::{ApiError, ApiResult};
use axum::{
    extract::{DefaultBodyLimit, Extension, Multipart},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use olo_core::{DocumentService, MAX_UPLOAD_FILES};
use olo_dispatch::CommandOptions;
use olo_store::ConversationStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Largest accepted file (50 MiB)
pub const MAX_FILE_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RagTagList {
    pub rag_tags: Vec<String>,
}

/// 202 body for an accepted upload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: &'static str,
    pub rag_tag: String,
    pub file_names: Vec<String>,
    pub workflow_id: Option<String>,
    pub run_id: Option<String>,
}

#[derive(Debug, Default)]
struct UploadForm {
    rag_tag: Option<String>,
    tag: Option<String>,
    file_names: Vec<String>,
}

impl UploadForm {
    /// `ragTag` wins over `tag`
    fn tag(&self) -> &str {
        self.rag_tag
            .as_deref()
            .or(self.tag.as_deref())
            .unwrap_or_default()
    }
}

async fn read_form(mut multipart: Multipart, max_file_bytes: usize) -> ApiResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        warn!(error = %e, "Failed to read multipart field");
        ApiError::BadRequest(format!("Invalid upload: {}", e))
    })? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "ragTag" | "tag" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid {} field: {}", name, e)))?;
                if name == "ragTag" {
                    form.rag_tag = Some(text);
                } else {
                    form.tag = Some(text);
                }
            }
            "files" => {
                if form.file_names.len() >= MAX_UPLOAD_FILES {
                    return Err(ApiError::BadRequest(format!(
                        "Too many files (max {})",
                        MAX_UPLOAD_FILES
                    )));
                }
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| "files".to_string());
                let mut size = 0;
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid file data: {}", e)))?
                {
                    size += chunk.len();
                    if size > max_file_bytes {
                        return Err(ApiError::PayloadTooLarge(file_name));
                    }
                }
                debug!(file = %file_name, bytes = size, "Upload file received");
                form.file_names.push(file_name);
            }
            other => debug!(field = %other, "Ignoring multipart field"),
        }
    }

    Ok(form)
}

async fn upload(
    Extension(documents): Extension<DocumentService>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = read_form(multipart, MAX_FILE_BYTES).await?;
    let accepted = documents
        .upload(form.tag(), form.file_names.clone(), &CommandOptions::default())
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            message: "Upload accepted for processing",
            rag_tag: accepted.rag_tag,
            file_names: accepted.file_names,
            workflow_id: accepted.workflow_id,
            run_id: accepted.run_id,
        }),
    ))
}

async fn list_rag_tags(
    Extension(store): Extension<Arc<dyn ConversationStore>>,
) -> ApiResult<Json<RagTagList>> {
    let rag_tags = store.list_rag_tags().await?;
    Ok(Json(RagTagList { rag_tags }))
}

/// Create document routes
pub fn documents_routes() -> Router {
    Router::new()
        .route("/api/documents/rag-tags", get(list_rag_tags))
        .route(
            "/api/documents/upload",
            post(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_FILES * MAX_FILE_BYTES)),
        )
}

#[cfg(test)]
mod tests {
    use super::read_form;
    use crate::api::error::ApiError;
    use crate::api::test_support::*;
    use axum::body::Body;
    use axum::extract::{FromRequest, Multipart};
    use axum::http::{Request, StatusCode};
    use olo_store::ConversationStore;
    use serde_json::json;

    const BOUNDARY: &str = "olo-test-boundary";

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str),
    }

    fn multipart(parts: &[Part<'_>]) -> Request<Body> {
        let mut body = String::new();
        for part in parts {
            body.push_str(&format!("--{}\r\n", BOUNDARY));
            match part {
                Part::Text(name, value) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    name, value
                )),
                Part::File(file_name) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"files\"; filename=\"{}\"\r\n\
                     Content-Type: text/plain\r\n\r\ncontent of {}\r\n",
                    file_name, file_name
                )),
            }
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));

        Request::post("/api/documents/upload")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_accepted() {
        let (app, store, client) = online_app();

        let (status, body) = send(
            &app,
            multipart(&[
                Part::Text("ragTag", " manuals "),
                Part::File("a.pdf"),
                Part::File("b.txt"),
            ]),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["message"], "Upload accepted for processing");
        assert_eq!(body["ragTag"], "manuals");
        assert_eq!(body["fileNames"], json!(["a.pdf", "b.txt"]));
        assert_eq!(body["runId"], "run-1");
        assert!(body["workflowId"]
            .as_str()
            .unwrap()
            .starts_with("doc-ingest-manuals-"));

        assert_eq!(store.list_rag_tags().await.unwrap(), ["manuals"]);
        let requests = client.requests.lock().unwrap();
        assert_eq!(requests[0].args[0].pipeline_name, "doc-manuals");
    }

    #[tokio::test]
    async fn test_tag_field_alias() {
        let (app, _, _) = online_app();

        let (status, body) = send(
            &app,
            multipart(&[Part::Text("tag", "docs"), Part::File("a.md")]),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["ragTag"], "docs");
    }

    #[tokio::test]
    async fn test_upload_validation() {
        let (app, store, _) = online_app();

        let (status, body) = send(&app, multipart(&[Part::File("a.pdf")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "ragTag (or tag) is required");

        let (status, body) = send(&app, multipart(&[Part::Text("ragTag", "docs")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "At least one file is required");

        let names: Vec<String> = (0..21).map(|i| format!("f{}.txt", i)).collect();
        let mut parts = vec![Part::Text("ragTag", "docs")];
        parts.extend(names.iter().map(|n| Part::File(n)));
        let (status, _) = send(&app, multipart(&parts)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        assert!(store.list_rag_tags().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_file_rejected() {
        let request = multipart(&[Part::Text("ragTag", "docs"), Part::File("big.pdf")]);
        let form = Multipart::from_request(request, &()).await.unwrap();

        // "content of big.pdf" is 18 bytes
        match read_form(form, 8).await {
            Err(ApiError::PayloadTooLarge(name)) => assert_eq!(name, "big.pdf"),
            _ => panic!("expected payload too large"),
        }

        let request = multipart(&[Part::Text("ragTag", "docs"), Part::File("big.pdf")]);
        let form = Multipart::from_request(request, &()).await.unwrap();
        let form = match read_form(form, 18).await {
            Ok(form) => form,
            Err(_) => panic!("file at the limit should be accepted"),
        };
        assert_eq!(form.file_names, ["big.pdf"]);
        assert_eq!(form.tag(), "docs");
    }

    #[tokio::test]
    async fn test_ingestion_not_started() {
        let (app, store) = stub_app();

        let (status, body) = send(
            &app,
            multipart(&[Part::Text("ragTag", "docs"), Part::File("a.pdf")]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Document ingestion could not be started.");
        assert_eq!(body["detail"], "Temporal not configured");
        assert_eq!(
            body["hint"],
            "Ensure Temporal server is running and CoreWorkflow is registered."
        );

        // the tag is registered before dispatch
        assert_eq!(store.list_rag_tags().await.unwrap(), ["docs"]);
    }

    #[tokio::test]
    async fn test_rag_tags() {
        let (app, store) = stub_app();
        store.register_rag_tag("zeta").await.unwrap();
        store.register_rag_tag("alpha").await.unwrap();

        let (status, body) = send(&app, get("/api/documents/rag-tags")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ragTags"], json!(["alpha", "zeta"]));
    }
}
