use std::sync::Arc;

use adlens_core::ProviderConfigResponse;
use axum::{extract::State, response::IntoResponse, Json};

use crate::error::{ApiError, ErrorResponse};
use crate::state::AppState;

/// Expose the media-provider API key for clients that upload straight
/// to the provider's file API. The key leaves the server here, so every
/// hit is logged loudly.
#[utoipa::path(
    get,
    path = "/api/provider-config",
    tag = "config",
    responses(
        (status = 200, description = "Provider key for direct client uploads", body = ProviderConfigResponse),
        (status = 500, description = "Provider key not configured", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state), fields(operation = "provider_config"))]
pub async fn provider_config(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let api_key = state.config.gemini_api_key.clone();
    if api_key.trim().is_empty() {
        return Err(ApiError::Internal(
            "Gemini API key not configured".to_string(),
        ));
    }

    tracing::warn!("Serving provider API key to a client for direct upload");
    Ok(Json(ProviderConfigResponse { api_key }))
}
