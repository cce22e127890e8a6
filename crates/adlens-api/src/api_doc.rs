//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use adlens_core::models;

/// Returns the OpenAPI spec served at /api/openapi.json.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Adlens API",
        version = "0.1.0",
        description = "Media ad analysis API. Upload a video or image, stage it in blob storage, and get back a structured analysis with generated ad copy."
    ),
    paths(
        handlers::analyze::analyze_media,
        handlers::upload::handle_upload,
        handlers::blob::put_blob,
        handlers::blob::get_blob,
        handlers::config::provider_config,
    ),
    components(
        schemas(
            models::AnalyzeRequest,
            models::MediaAnalysis,
            models::VideoAnalysis,
            models::ImageAnalysis,
            models::AdCopy,
            models::MediaKind,
            models::UploadEvent,
            models::TokenRequestPayload,
            models::UploadCompletedPayload,
            models::ClientTokenResponse,
            models::CallbackAck,
            models::PutBlobResult,
            models::ProviderConfigResponse,
            error::ErrorResponse,
        )
    ),
    tags(
        (name = "analysis", description = "Media analysis operations"),
        (name = "uploads", description = "Client upload token handshake"),
        (name = "blobs", description = "Blob storage reads and writes"),
        (name = "config", description = "Client-facing provider configuration")
    )
)]
pub struct ApiDoc;
