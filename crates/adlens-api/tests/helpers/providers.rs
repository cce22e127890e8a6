//! Mock provider servers for integration tests.
//!
//! Each mock binds 127.0.0.1:0 and serves the minimal wire surface the
//! provider clients touch. The Gemini mock reports uploads as ACTIVE
//! immediately so tests never wait on the activation poll.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

pub const VIDEO_TRANSCRIPT: &str = "Fresh espresso, every single morning.";
pub const VIDEO_DESCRIPTION: &str = "A barista pulls a shot in a sunlit cafe.";
pub const IMAGE_DESCRIPTION: &str = "A runner laces bright orange shoes at dawn.";
pub const AD_COPY_HEADLINE: &str = "Fresh Starts Daily";
pub const AD_COPY_DESCRIPTION: &str = "Espresso worth waking up for.";

/// Behavior knobs for the Gemini mock.
#[derive(Default)]
pub struct GeminiMockBehavior {
    /// Force this status on generateContent instead of succeeding.
    pub generate_status: Option<u16>,
    /// Stall generateContent before responding.
    pub generate_delay_ms: u64,
}

struct GeminiMockState {
    base_url: String,
    behavior: GeminiMockBehavior,
}

/// Spawn a mock Gemini server; returns its base URL.
pub async fn spawn_gemini_mock(behavior: GeminiMockBehavior) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock listener");
    let addr = listener.local_addr().expect("Failed to read mock address");
    let base_url = format!("http://{}", addr);
    let state = Arc::new(GeminiMockState {
        base_url: base_url.clone(),
        behavior,
    });

    let router = Router::new()
        .route("/upload/v1beta/files", post(start_upload))
        .route("/upload-session", post(finish_upload))
        .route("/v1beta/files/{id}", get(file_status))
        .route("/v1beta/models/{*rest}", post(generate_content))
        .with_state(state);

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Mock Gemini server failed");
    });
    base_url
}

async fn start_upload(State(state): State<Arc<GeminiMockState>>) -> impl IntoResponse {
    (
        [(
            "x-goog-upload-url",
            format!("{}/upload-session", state.base_url),
        )],
        Json(json!({})),
    )
}

async fn finish_upload(State(state): State<Arc<GeminiMockState>>) -> Json<Value> {
    Json(mock_file(&state.base_url))
}

async fn file_status(State(state): State<Arc<GeminiMockState>>) -> Json<Value> {
    Json(mock_file(&state.base_url)["file"].clone())
}

fn mock_file(base_url: &str) -> Value {
    json!({
        "file": {
            "name": "files/mock-upload",
            "uri": format!("{}/v1beta/files/mock-upload", base_url),
            "state": "ACTIVE",
            "mimeType": "video/mp4"
        }
    })
}

async fn generate_content(
    State(state): State<Arc<GeminiMockState>>,
    body: String,
) -> axum::response::Response {
    if state.behavior.generate_delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(state.behavior.generate_delay_ms)).await;
    }
    if let Some(status) = state.behavior.generate_status {
        return (
            StatusCode::from_u16(status).expect("Invalid mock status"),
            Json(json!({"error": {"message": "mock provider failure"}})),
        )
            .into_response();
    }

    // The video prompt asks for a transcript; the image prompt does not.
    let text = if body.contains("transcript") {
        json!({
            "transcript": VIDEO_TRANSCRIPT,
            "description": VIDEO_DESCRIPTION,
            "scenes": ["Close-up of espresso pouring", "Customer smiling at the counter"],
        })
        .to_string()
    } else {
        json!({
            "description": IMAGE_DESCRIPTION,
            "adCopy": ["Start faster.", "Own the morning."],
            "visualElements": ["orange running shoes", "sunrise light"],
        })
        .to_string()
    };

    Json(json!({
        "candidates": [{"content": {"parts": [{"text": text}]}}]
    }))
    .into_response()
}

/// Spawn a mock Anthropic server; returns its base URL.
pub async fn spawn_anthropic_mock(fails: bool) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock listener");
    let addr = listener.local_addr().expect("Failed to read mock address");
    let base_url = format!("http://{}", addr);

    let router = Router::new().route(
        "/messages",
        post(move || async move {
            if fails {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": {"message": "mock overloaded"}})),
                )
                    .into_response()
            } else {
                Json(json!({
                    "content": [
                        {"type": "text", "text": "Here is the copy you asked for."},
                        {"type": "tool_use", "id": "tu_1", "name": "ad_copy", "input": {
                            "headline": AD_COPY_HEADLINE,
                            "description": AD_COPY_DESCRIPTION
                        }}
                    ]
                }))
                .into_response()
            }
        }),
    );

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Mock Anthropic server failed");
    });
    base_url
}

/// Spawn a host serving one blob at `/files/{name}`; returns its base URL.
pub async fn spawn_blob_host(content_type: &'static str, data: Vec<u8>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock listener");
    let addr = listener.local_addr().expect("Failed to read mock address");
    let base_url = format!("http://{}", addr);

    let router = Router::new().route(
        "/files/{name}",
        get(move || {
            let data = data.clone();
            async move {
                (
                    [(axum::http::header::CONTENT_TYPE, content_type)],
                    data,
                )
                    .into_response()
            }
        }),
    );

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Mock blob host failed");
    });
    base_url
}
