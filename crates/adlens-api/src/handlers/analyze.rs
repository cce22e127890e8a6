use std::sync::Arc;

use adlens_core::{content_type_for_extension, AnalyzeRequest, MediaAnalysis};
use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::header,
    response::IntoResponse,
    Json,
};

use crate::error::{ApiError, ErrorResponse};
use crate::services::analysis;
use crate::state::AppState;

/// Analyze uploaded or staged media.
///
/// Accepts either a multipart form with the media bytes in a `file`
/// (or `video`) part, or a JSON body pointing at an already staged
/// blob URL or provider file URI.
#[utoipa::path(
    post,
    path = "/api/analyze",
    tag = "analysis",
    request_body(content = AnalyzeRequest, description = "Staged media reference; multipart uploads use the `file` part instead"),
    responses(
        (status = 200, description = "Structured analysis of the media", body = MediaAnalysis),
        (status = 400, description = "Missing media reference or unsupported media type", body = ErrorResponse),
        (status = 413, description = "Upload exceeds the size limit", body = ErrorResponse),
        (status = 500, description = "Provider or storage failure", body = ErrorResponse),
        (status = 504, description = "Analysis timed out", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "analyze_media"))]
pub async fn analyze_media(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<impl IntoResponse, ApiError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let analysis = if content_type.starts_with("multipart/form-data") {
        analyze_multipart(&state, request).await?
    } else {
        analyze_json(&state, request).await?
    };
    Ok(Json(analysis))
}

async fn analyze_multipart(
    state: &Arc<AppState>,
    request: Request,
) -> Result<MediaAnalysis, ApiError> {
    let mut multipart = Multipart::from_request(request, &()).await.map_err(|e| {
        tracing::warn!(error = %e, "Rejected malformed multipart body");
        ApiError::Validation("Invalid multipart form data".to_string())
    })?;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!(error = %e, "Failed to read multipart field");
        ApiError::Validation("Invalid multipart form data".to_string())
    })? {
        let name = field.name().unwrap_or("").to_string();
        if name != "file" && name != "video" {
            continue;
        }

        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .map(|ct| ct.to_string())
            .or_else(|| content_type_from_name(&file_name))
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let data = field.bytes().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to buffer multipart field");
            ApiError::Validation("Invalid multipart form data".to_string())
        })?;

        if data.len() > state.config.max_upload_size_bytes {
            return Err(ApiError::PayloadTooLarge(format!(
                "{} bytes exceeds the {} byte upload limit",
                data.len(),
                state.config.max_upload_size_bytes
            )));
        }
        return analysis::analyze_bytes(state, data.to_vec(), &content_type, &file_name).await;
    }

    Err(ApiError::Validation("No file provided".to_string()))
}

async fn analyze_json(state: &Arc<AppState>, request: Request) -> Result<MediaAnalysis, ApiError> {
    let Json(body) = Json::<AnalyzeRequest>::from_request(request, &())
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Rejected analyze request body");
            ApiError::Validation("Missing blob URL or mime type".to_string())
        })?;

    // A provider file URI skips the blob fetch entirely.
    if let Some(file_uri) = body.file_uri.as_deref() {
        let mime_type = body.mime_type.as_deref().ok_or_else(|| {
            ApiError::Validation("Missing blob URL or mime type".to_string())
        })?;
        return analysis::analyze_remote(state, file_uri, mime_type).await;
    }

    let blob_url = body.blob_url.as_deref().ok_or_else(|| {
        ApiError::Validation("Missing blob URL or mime type".to_string())
    })?;
    let mime_type = body.mime_type.as_deref().ok_or_else(|| {
        ApiError::Validation("Missing blob URL or mime type".to_string())
    })?;
    let file_name = body.file_name.as_deref().unwrap_or("upload");
    analysis::analyze_blob(state, blob_url, mime_type, file_name).await
}

fn content_type_from_name(file_name: &str) -> Option<String> {
    file_name
        .rsplit_once('.')
        .and_then(|(_, ext)| content_type_for_extension(ext))
        .map(str::to_string)
}
