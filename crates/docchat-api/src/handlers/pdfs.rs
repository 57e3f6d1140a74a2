//! Document upload, listing, deletion and inline viewing.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use docchat_core::defaults::UPLOAD_PREFIX;
use docchat_core::extract::GENERATED_PDF_PREFIX;
use docchat_core::StoredObject;

use crate::{ApiError, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadedDocument {
    pub storage_key: String,
    pub file_name: String,
    pub chunks: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    pub message: String,
    pub data: UploadedDocument,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListResponse {
    pub message: String,
    pub count: usize,
    pub data: Vec<StoredObject>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub message: String,
    pub storage_key: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteParams {
    /// Storage key of the uploaded document, e.g. `pdfs/20250101_120000_report.pdf`
    pub key: String,
}

/// Upload a PDF, store it and index its text.
///
/// Expects a multipart form with a `file` field.
///
/// # Returns
/// - 200 OK with the storage key and chunk count
/// - 400 Bad Request if the file is missing, empty, not a PDF or has no text
/// - 413 Payload Too Large if the body exceeds the upload limit
#[utoipa::path(post, path = "/api/pdfs/upload", tag = "Documents",
    responses(
        (status = 200, description = "Document indexed", body = UploadResponse),
        (status = 400, description = "Invalid upload"),
        (status = 413, description = "Upload too large")
    ))]
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Missing filename".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?
            .to_vec();
        upload = Some((file_name, data));
    }

    let (file_name, data) =
        upload.ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;
    if !file_name.to_lowercase().ends_with(".pdf") {
        return Err(ApiError::BadRequest("Only PDF files are allowed".to_string()));
    }
    if data.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }
    if data.len() > state.config.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "File exceeds the {} byte upload limit",
            state.config.max_upload_bytes
        )));
    }

    let outcome = state.ingestor.ingest_pdf(&file_name, data).await?;
    info!(
        storage_key = %outcome.storage_key,
        chunk_count = outcome.chunk_count,
        "Document uploaded"
    );

    Ok(Json(UploadResponse {
        message: "PDF uploaded and indexed successfully".to_string(),
        data: UploadedDocument {
            storage_key: outcome.storage_key,
            file_name,
            chunks: outcome.chunk_count,
        },
    }))
}

/// List uploaded documents, newest first.
#[utoipa::path(get, path = "/api/pdfs", tag = "Documents",
    responses((status = 200, description = "Uploaded documents", body = ListResponse)))]
pub async fn list(State(state): State<AppState>) -> Result<Json<ListResponse>, ApiError> {
    let data = state.ingestor.list().await?;
    Ok(Json(ListResponse {
        message: "PDFs retrieved successfully".to_string(),
        count: data.len(),
        data,
    }))
}

/// Delete an uploaded document and its indexed chunks.
///
/// # Returns
/// - 200 OK with the deleted key
/// - 400 Bad Request if the key is not an uploaded document
/// - 404 Not Found if nothing is stored under the key
#[utoipa::path(delete, path = "/api/pdfs", tag = "Documents",
    params(DeleteParams),
    responses(
        (status = 200, description = "Document deleted", body = DeleteResponse),
        (status = 400, description = "Invalid key"),
        (status = 404, description = "Document not found")
    ))]
pub async fn delete(
    State(state): State<AppState>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let key = params.key.trim();
    if !key.starts_with(UPLOAD_PREFIX) {
        return Err(ApiError::BadRequest(format!(
            "Key must start with '{}'",
            UPLOAD_PREFIX
        )));
    }

    state.ingestor.delete(key).await?;
    info!(storage_key = %key, "Document deleted");

    Ok(Json(DeleteResponse {
        message: "PDF deleted successfully".to_string(),
        storage_key: key.to_string(),
    }))
}

/// Serve a stored PDF inline.
///
/// Works for both uploaded documents and generated reports; this is the
/// target of the download links in chat replies.
#[utoipa::path(get, path = "/api/pdfs/view/{key}", tag = "Documents",
    params(("key" = String, Path, description = "Storage key")),
    responses(
        (status = 200, description = "PDF bytes", content_type = "application/pdf"),
        (status = 404, description = "Not found")
    ))]
pub async fn view(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let key = key.trim_start_matches('/');
    if !key.starts_with(UPLOAD_PREFIX) && !key.starts_with(GENERATED_PDF_PREFIX) {
        return Err(ApiError::NotFound(format!("PDF not found: {}", key)));
    }

    let bytes = state.store.get(key).await?;
    let file_name = key.rsplit('/').next().unwrap_or(key).replace('"', "_");

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    let disposition = HeaderValue::from_str(&format!("inline; filename=\"{}\"", file_name))
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));

    Ok((StatusCode::OK, headers, bytes))
}
