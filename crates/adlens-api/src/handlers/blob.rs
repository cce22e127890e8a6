use std::sync::Arc;

use adlens_core::{content_type_for_extension, PutBlobResult, UploadCompletedPayload, UploadEvent};
use adlens_storage::keys::{sanitize_pathname, with_random_suffix};
use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{ApiError, ErrorResponse};
use crate::state::{AppState, BlobState};

/// Token-authorized direct upload into the blob store.
///
/// The client presents the token issued by the upload handshake; the
/// grant inside it pins the pathname, content types, and size limit.
#[utoipa::path(
    put,
    path = "/api/blob/{pathname}",
    tag = "blobs",
    params(
        ("pathname" = String, Path, description = "Relative blob pathname, e.g. videos/demo.mp4")
    ),
    request_body(content_type = "application/octet-stream", description = "Raw blob bytes"),
    responses(
        (status = 200, description = "Stored blob descriptor", body = PutBlobResult),
        (status = 400, description = "Invalid pathname, content type, or empty body", body = ErrorResponse),
        (status = 401, description = "Missing, invalid, or expired upload token", body = ErrorResponse),
        (status = 413, description = "Body exceeds the granted size limit", body = ErrorResponse),
        (status = 500, description = "Blob storage not configured or write failed", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, headers, body), fields(operation = "put_blob"))]
pub async fn put_blob(
    State(state): State<Arc<AppState>>,
    Path(pathname): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| ApiError::Unauthorized("Missing upload token".to_string()))?;
    let signer = state.blobs.signer.as_ref().ok_or_else(|| {
        tracing::error!("Blob signing key not configured, refusing blob write");
        ApiError::Internal("Blob storage not configured".to_string())
    })?;
    let grant = signer.verify(token)?;

    let requested = sanitize_pathname(&pathname)?;
    if requested != grant.pathname {
        tracing::warn!(
            requested = %requested,
            granted = %grant.pathname,
            "Upload token presented for a different pathname"
        );
        return Err(ApiError::Unauthorized(
            "Upload token does not cover this pathname".to_string(),
        ));
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(normalize_content_type)
        .ok_or_else(|| ApiError::Validation("Missing content type".to_string()))?;
    if !grant.allowed_content_types.contains(&content_type) {
        return Err(ApiError::Validation(format!(
            "Content type {} is not allowed for this upload",
            content_type
        )));
    }

    if body.is_empty() {
        return Err(ApiError::Validation("File is empty".to_string()));
    }
    if body.len() as u64 > grant.maximum_size_in_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "{} bytes exceeds the {} byte upload limit",
            body.len(),
            grant.maximum_size_in_bytes
        )));
    }

    let stored = if grant.add_random_suffix {
        with_random_suffix(&grant.pathname)
    } else {
        grant.pathname.clone()
    };
    let size_bytes = body.len();
    let (stored_pathname, url) = state
        .blobs
        .storage
        .put(&stored, &content_type, body.to_vec())
        .await?;

    let file_name = stored_pathname
        .rsplit('/')
        .next()
        .unwrap_or(&stored_pathname)
        .to_string();
    let result = PutBlobResult {
        url: url.clone(),
        download_url: url,
        pathname: stored_pathname,
        content_type,
        content_disposition: format!("attachment; filename=\"{}\"", file_name),
    };
    tracing::info!(pathname = %result.pathname, size_bytes, "Blob stored");

    // Best-effort completion callback; delivery failures never fail the upload.
    if let Some(callback_url) = grant.callback_url.clone() {
        let event = UploadEvent::UploadCompleted(UploadCompletedPayload {
            blob: result.clone(),
            token_payload: grant.payload.clone(),
        });
        let client = state.providers.http_client.clone();
        tokio::spawn(async move {
            match client.post(&callback_url).json(&event).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(url = %callback_url, "Upload completion callback delivered");
                }
                Ok(response) => {
                    tracing::warn!(
                        url = %callback_url,
                        status = %response.status(),
                        "Upload completion callback rejected"
                    );
                }
                Err(e) => {
                    tracing::warn!(url = %callback_url, error = %e, "Upload completion callback failed");
                }
            }
        });
    }

    Ok(Json(result))
}

/// Serve stored blob bytes with the content type inferred from the
/// pathname extension.
#[utoipa::path(
    get,
    path = "/api/blob/{pathname}",
    tag = "blobs",
    params(
        ("pathname" = String, Path, description = "Relative blob pathname")
    ),
    responses(
        (status = 200, description = "Blob bytes", content_type = "application/octet-stream"),
        (status = 400, description = "Invalid pathname", body = ErrorResponse),
        (status = 404, description = "Blob not found", body = ErrorResponse)
    )
)]
pub async fn get_blob(
    State(blobs): State<BlobState>,
    Path(pathname): Path<String>,
) -> Result<Response, ApiError> {
    let pathname = sanitize_pathname(&pathname)?;
    let data = blobs.storage.get(&pathname).await?;

    let content_type = pathname
        .rsplit_once('.')
        .and_then(|(_, ext)| content_type_for_extension(ext))
        .unwrap_or("application/octet-stream");
    let file_name = pathname.rsplit('/').next().unwrap_or(&pathname);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", file_name),
        )
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .body(Body::from(data))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build blob response");
            ApiError::Internal(e.to_string())
        })?;
    Ok(response)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

fn normalize_content_type(raw: &str) -> String {
    raw.split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}
