//! Media analysis pipeline: acquire bytes, stage them on disk, run the
//! provider analysis, then best-effort enrichment.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use adlens_core::{MediaAnalysis, MediaKind};
use chrono::Utc;
use futures::StreamExt;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::error::ApiError;
use crate::state::AppState;

const BLOB_FETCH_MAX_ATTEMPTS: u32 = 3;
const BLOB_FETCH_INITIAL_DELAY_MS: u64 = 500;
const BLOB_FETCH_MAX_DELAY_MS: u64 = 5_000;

/// Fetch the media from a blob URL, stage it, and analyze it.
#[tracing::instrument(skip(state), fields(operation = "analyze_blob"))]
pub async fn analyze_blob(
    state: &Arc<AppState>,
    blob_url: &str,
    mime_type: &str,
    file_name: &str,
) -> Result<MediaAnalysis, ApiError> {
    let kind = media_kind(mime_type)?;

    // On the error paths below the staged file is removed by RAII.
    let staged = named_temp_file(file_name)?;
    fetch_blob_into(state, blob_url, staged.path()).await?;
    let data = read_and_discard(staged).await?;

    tracing::debug!(size_bytes = data.len(), kind = %kind, "Fetched blob for analysis");
    let mut analysis = run_analysis(state, kind, data, mime_type, file_name).await?;
    enrich(state, &mut analysis).await;
    Ok(analysis)
}

/// Stage an uploaded body and analyze it.
#[tracing::instrument(skip(state, data), fields(operation = "analyze_upload", size_bytes = data.len()))]
pub async fn analyze_bytes(
    state: &Arc<AppState>,
    data: Vec<u8>,
    content_type: &str,
    file_name: &str,
) -> Result<MediaAnalysis, ApiError> {
    let kind = media_kind(content_type)?;

    let staged = named_temp_file(file_name)?;
    tokio::fs::write(staged.path(), &data).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to stage uploaded media");
        ApiError::Internal("Failed to stage uploaded media".to_string())
    })?;
    let data = read_and_discard(staged).await?;

    let mut analysis = run_analysis(state, kind, data, content_type, file_name).await?;
    enrich(state, &mut analysis).await;
    Ok(analysis)
}

/// Analyze media already staged with the provider; no acquisition step.
#[tracing::instrument(skip(state), fields(operation = "analyze_remote"))]
pub async fn analyze_remote(
    state: &Arc<AppState>,
    file_uri: &str,
    mime_type: &str,
) -> Result<MediaAnalysis, ApiError> {
    let kind = media_kind(mime_type)?;

    let mut analysis = match kind {
        MediaKind::Video => MediaAnalysis::Video(
            state
                .providers
                .gemini
                .analyze_video_uri(file_uri, mime_type)
                .await?,
        ),
        MediaKind::Image => MediaAnalysis::Image(
            state
                .providers
                .gemini
                .analyze_image_uri(file_uri, mime_type)
                .await?,
        ),
    };
    enrich(state, &mut analysis).await;
    Ok(analysis)
}

async fn run_analysis(
    state: &Arc<AppState>,
    kind: MediaKind,
    data: Vec<u8>,
    content_type: &str,
    file_name: &str,
) -> Result<MediaAnalysis, ApiError> {
    match kind {
        MediaKind::Video => {
            let video = state
                .providers
                .gemini
                .analyze_video(data, content_type, file_name)
                .await?;
            Ok(MediaAnalysis::Video(video))
        }
        MediaKind::Image => {
            let image = state
                .providers
                .gemini
                .analyze_image(&data, content_type)
                .await?;
            Ok(MediaAnalysis::Image(image))
        }
    }
}

/// Attach generated ad copy when the copy client is configured.
/// Enrichment failures are logged and swallowed; the analysis result
/// stands on its own.
async fn enrich(state: &Arc<AppState>, analysis: &mut MediaAnalysis) {
    let Some(anthropic) = state.providers.anthropic.as_ref() else {
        tracing::debug!("Copy generation not configured, skipping enrichment");
        return;
    };
    let generated = match analysis {
        MediaAnalysis::Video(v) => {
            anthropic
                .generate_ad_copy(&v.description, Some(&v.transcript), &v.scenes)
                .await
        }
        MediaAnalysis::Image(i) => anthropic.generate_ad_copy(&i.description, None, &[]).await,
    };
    match generated {
        Ok(copy) => analysis.set_claude_ad_copy(copy),
        Err(e) => tracing::warn!(error = %e, "Ad copy enrichment failed"),
    }
}

async fn fetch_blob_into(
    state: &Arc<AppState>,
    blob_url: &str,
    path: &Path,
) -> Result<(), ApiError> {
    let response = fetch_with_retries(state, blob_url).await?;

    let mut file = tokio::fs::File::create(path).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to open staging file");
        ApiError::Internal("Failed to download file from Blob".to_string())
    })?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            tracing::error!(error = %e, "Blob download stream failed");
            ApiError::Internal("Failed to download file from Blob".to_string())
        })?;
        file.write_all(&chunk).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to write staged media");
            ApiError::Internal("Failed to download file from Blob".to_string())
        })?;
    }
    file.flush().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to flush staged media");
        ApiError::Internal("Failed to download file from Blob".to_string())
    })?;
    Ok(())
}

async fn fetch_with_retries(
    state: &Arc<AppState>,
    blob_url: &str,
) -> Result<reqwest::Response, ApiError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match state.providers.http_client.get(blob_url).send().await {
            Ok(response) if response.status().is_success() => return Ok(response),
            Ok(response) => {
                let status = response.status();
                if attempt >= BLOB_FETCH_MAX_ATTEMPTS {
                    tracing::error!(url = %blob_url, %status, "Giving up fetching blob");
                    return Err(ApiError::Internal(
                        "Failed to download file from Blob".to_string(),
                    ));
                }
                tracing::warn!(url = %blob_url, %status, attempt, "Blob fetch failed, retrying");
            }
            Err(e) => {
                if attempt >= BLOB_FETCH_MAX_ATTEMPTS {
                    tracing::error!(url = %blob_url, error = %e, "Giving up fetching blob");
                    return Err(ApiError::Internal(
                        "Failed to download file from Blob".to_string(),
                    ));
                }
                tracing::warn!(url = %blob_url, error = %e, attempt, "Blob fetch failed, retrying");
            }
        }
        tokio::time::sleep(backoff_delay(attempt)).await;
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let ms = BLOB_FETCH_INITIAL_DELAY_MS.saturating_mul(1u64 << exponent);
    Duration::from_millis(ms.min(BLOB_FETCH_MAX_DELAY_MS))
}

async fn read_and_discard(staged: NamedTempFile) -> Result<Vec<u8>, ApiError> {
    let result = tokio::fs::read(staged.path()).await;
    discard_staged(staged);
    result.map_err(|e| {
        tracing::error!(error = %e, "Failed to read staged media");
        ApiError::Internal("Failed to read staged media".to_string())
    })
}

fn discard_staged(staged: NamedTempFile) {
    match staged.close() {
        Ok(()) => tracing::debug!("Removed staged media"),
        Err(e) => tracing::warn!(error = %e, "Failed to remove staged media"),
    }
}

fn named_temp_file(file_name: &str) -> Result<NamedTempFile, ApiError> {
    let sanitized = sanitize_for_temp(file_name);
    tempfile::Builder::new()
        .prefix(&format!("{}-", Utc::now().timestamp_millis()))
        .suffix(&format!("-{}", sanitized))
        .tempfile()
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create staging file");
            ApiError::Internal("Failed to stage uploaded media".to_string())
        })
}

fn media_kind(content_type: &str) -> Result<MediaKind, ApiError> {
    MediaKind::from_content_type(content_type)
        .ok_or_else(|| ApiError::Validation("File must be a video or image".to_string()))
}

/// Keep only filesystem-safe characters from the client filename before
/// it lands in a temp file name.
fn sanitize_for_temp(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "upload".to_string()
    } else {
        cleaned
    }
}
