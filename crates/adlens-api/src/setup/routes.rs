//! Route configuration and setup

use std::sync::Arc;
use std::time::Duration;

use adlens_core::Config;
use adlens_storage::BlobStorageError;
use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use tower::limit::ConcurrencyLimitLayer;
use tower::timeout::TimeoutLayer;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::error::ErrorResponse;
use crate::handlers;
use crate::state::AppState;

/// Setup all application routes
pub async fn setup_routes(
    config: &Config,
    state: Arc<AppState>,
) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let http_concurrency_limit = std::env::var("HTTP_CONCURRENCY_LIMIT")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(10_000)
        .max(1);
    tracing::info!(
        http_concurrency_limit = http_concurrency_limit,
        "HTTP concurrency limit layer enabled"
    );

    let request_timeout_secs = config.request_timeout_seconds.max(1);
    tracing::info!(request_timeout_secs, "Request timeout layer enabled");

    let app = api_routes(state.clone())
        .merge(public_routes(state.clone()))
        .merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"))
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(config.max_upload_size_bytes))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout_error))
                .layer(TimeoutLayer::new(Duration::from_secs(request_timeout_secs))),
        )
        .with_state(state);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let cors = if config.cors_origins.contains(&"*".to_string()) {
        tracing::warn!("CORS configured to allow all origins - not recommended for production");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            config.cors_origins.iter().map(|o| o.parse()).collect();
        CorsLayer::new()
            .allow_origin(origins.unwrap_or_default())
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
            .allow_headers(Any)
    };
    Ok(cors)
}

fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/analyze", post(handlers::analyze::analyze_media))
        .route("/api/upload", post(handlers::upload::handle_upload))
        .route("/api/blob/{*pathname}", put(handlers::blob::put_blob))
        .route("/api/blob/{*pathname}", get(handlers::blob::get_blob))
        .route(
            "/api/provider-config",
            get(handlers::config::provider_config),
        )
        .with_state(state)
}

fn public_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/health",
            get({
                let state = state.clone();
                move || {
                    let state = state.clone();
                    async { health_check(state).await }
                }
            }),
        )
        .with_state(state)
        .route(
            "/api/openapi.json",
            get(|| async { Json(crate::api_doc::get_openapi_spec()) }),
        )
}

async fn handle_timeout_error(err: tower::BoxError) -> impl IntoResponse {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::GATEWAY_TIMEOUT,
            Json(ErrorResponse {
                error: "Request timed out".to_string(),
            }),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Internal server error".to_string(),
            }),
        )
    }
}

#[derive(serde::Serialize)]
struct HealthCheckResponse {
    status: String,
    storage: String,
}

/// Basic health check - verifies the blob store is reachable.
async fn health_check(state: Arc<AppState>) -> impl IntoResponse {
    let storage = match tokio::time::timeout(
        Duration::from_secs(5),
        state.blobs.storage.get("health-check-non-existent-key"),
    )
    .await
    {
        // A miss still proves the store is reachable.
        Ok(Err(BlobStorageError::NotFound(_))) | Ok(Ok(_)) => "healthy".to_string(),
        Ok(Err(e)) => format!("degraded: {}", e),
        Err(_) => "timeout".to_string(),
    };

    let status = if storage == "healthy" {
        "healthy"
    } else {
        "degraded"
    };
    (
        StatusCode::OK,
        Json(HealthCheckResponse {
            status: status.to_string(),
            storage,
        }),
    )
}
