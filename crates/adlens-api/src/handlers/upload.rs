use std::sync::Arc;

use adlens_core::{CallbackAck, ClientTokenResponse, UploadEvent};
use adlens_storage::keys::sanitize_pathname;
use adlens_storage::token::UploadGrant;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};

use crate::error::{ApiError, ErrorResponse};
use crate::state::AppState;

/// Upload handshake endpoint.
///
/// Clients first request a signed token for a pathname, then after the
/// blob PUT succeeds the server posts the completion event back here.
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "uploads",
    request_body = UploadEvent,
    responses(
        (status = 200, description = "Client token or completion acknowledgement", body = ClientTokenResponse),
        (status = 400, description = "Invalid pathname", body = ErrorResponse),
        (status = 500, description = "Blob storage not configured", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, event), fields(operation = "upload_handshake"))]
pub async fn handle_upload(
    State(state): State<Arc<AppState>>,
    Json(event): Json<UploadEvent>,
) -> Result<Response, ApiError> {
    match event {
        UploadEvent::GenerateClientToken(payload) => {
            let signer = state.blobs.signer.as_ref().ok_or_else(|| {
                tracing::error!("Blob signing key not configured, cannot issue upload tokens");
                ApiError::Internal("Blob storage not configured".to_string())
            })?;

            let pathname = sanitize_pathname(&payload.pathname)?;
            let callback_url = payload.callback_url.unwrap_or_else(|| {
                format!(
                    "{}/api/upload",
                    state.config.public_base_url.trim_end_matches('/')
                )
            });
            let grant = UploadGrant {
                pathname: pathname.clone(),
                allowed_content_types: state.config.allowed_content_types.clone(),
                maximum_size_in_bytes: state.config.max_upload_size_bytes as u64,
                valid_until: UploadGrant::default_valid_until(),
                add_random_suffix: true,
                callback_url: Some(callback_url),
                payload: payload.client_payload,
            };
            let client_token = signer.sign(&grant)?;

            tracing::info!(pathname = %pathname, "Issued upload token");
            Ok(Json(ClientTokenResponse {
                event_type: "blob.generate-client-token".to_string(),
                client_token,
            })
            .into_response())
        }
        UploadEvent::UploadCompleted(payload) => {
            tracing::info!(
                url = %payload.blob.url,
                pathname = %payload.blob.pathname,
                "Upload completed"
            );
            Ok(Json(CallbackAck::ok()).into_response())
        }
    }
}
