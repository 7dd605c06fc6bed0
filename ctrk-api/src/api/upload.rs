//! File upload handlers
//!
//! `POST /api/upload` commits an uploaded CSV/Excel/JSON payload through
//! the ingestion pipeline; `POST /api/upload/preview` runs the same
//! pipeline through validation only, for human review before committing.
//! File type and size are rejected before any decoding starts.

use crate::error::{ApiError, ApiResult};
use crate::ingest::{CommitSummary, IngestError, PreviewSummary, UploadFormat};
use crate::AppState;
use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};

/// The uploaded file extracted from a multipart request
struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

/// Pull the `file` field out of the multipart body
async fn read_upload(mut multipart: Multipart) -> ApiResult<UploadedFile> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|name| name.to_string())
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::BadRequest("No file selected".to_string()))?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?
            .to_vec();

        return Ok(UploadedFile { filename, bytes });
    }

    Err(ApiError::BadRequest("No file provided".to_string()))
}

/// Validate type and size before any decoding happens
fn admit_upload(state: &AppState, upload: &UploadedFile) -> ApiResult<UploadFormat> {
    let format = UploadFormat::from_filename(&upload.filename).ok_or_else(|| {
        ApiError::BadRequest(
            "File type not supported. Please upload CSV, Excel, or JSON files.".to_string(),
        )
    })?;

    if upload.bytes.len() > state.config.max_upload_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "File exceeds the {} byte upload limit",
            state.config.max_upload_bytes
        )));
    }

    Ok(format)
}

/// Opaque actor identifier for attribution; never authenticated here
fn actor_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-actor")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "anonymous".to_string())
}

/// POST /api/upload - ingest and commit an uploaded file
pub async fn upload_commit(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> ApiResult<Json<CommitSummary>> {
    let upload = read_upload(multipart).await?;
    let format = admit_upload(&state, &upload)?;
    let actor = actor_from_headers(&headers);

    let summary = state
        .orchestrator()
        .ingest(&upload.bytes, format, &upload.filename, &actor)
        .await
        .map_err(|e| match e {
            IngestError::Decode(decode) => ApiError::BadRequest(decode.to_string()),
            IngestError::Store(store) => ApiError::Internal(store.to_string()),
        })?;

    Ok(Json(summary))
}

/// POST /api/upload/preview - validate without persisting
pub async fn upload_preview(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<PreviewSummary>> {
    let upload = read_upload(multipart).await?;
    let format = admit_upload(&state, &upload)?;

    let summary = state
        .orchestrator()
        .preview(&upload.bytes, format, &upload.filename)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(Json(summary))
}

/// Build upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/api/upload", post(upload_commit))
        .route("/api/upload/preview", post(upload_preview))
}
