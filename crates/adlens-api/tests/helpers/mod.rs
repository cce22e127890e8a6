//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p adlens-api --test analyze_test` or
//! `cargo test -p adlens-api`. Provider calls go to in-process mock servers;
//! blobs land in a per-test temp directory.

#![allow(dead_code)]

pub mod fixtures;
pub mod providers;

use std::sync::Arc;

use adlens_api::setup::routes;
use adlens_api::state::{AppState, BlobState, ProviderState};
use adlens_core::Config;
use adlens_services::{AnthropicConfig, AnthropicService, GeminiConfig, GeminiService};
use adlens_storage::{LocalBlobStorage, TokenSigner};
use axum_test::TestServer;
use tempfile::TempDir;

pub const TEST_SIGNING_SECRET: &str = "test-signing-secret";

/// Test application: server, config, and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub config: Config,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

/// Knobs for provider mock behavior and config overrides.
pub struct TestOptions {
    pub signing_key: Option<String>,
    pub anthropic_enabled: bool,
    pub anthropic_fails: bool,
    pub gemini_generate_status: Option<u16>,
    pub gemini_generate_delay_ms: u64,
    pub request_timeout_seconds: u64,
    pub gemini_api_key_in_config: String,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            signing_key: Some(TEST_SIGNING_SECRET.to_string()),
            anthropic_enabled: true,
            anthropic_fails: false,
            gemini_generate_status: None,
            gemini_generate_delay_ms: 0,
            request_timeout_seconds: 300,
            gemini_api_key_in_config: "test-key".to_string(),
        }
    }
}

/// Setup test app with default options.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(TestOptions::default()).await
}

/// Setup test app backed by mock provider servers and temp blob storage.
pub async fn setup_test_app_with(options: TestOptions) -> TestApp {
    let gemini_base = providers::spawn_gemini_mock(providers::GeminiMockBehavior {
        generate_status: options.gemini_generate_status,
        generate_delay_ms: options.gemini_generate_delay_ms,
    })
    .await;
    let anthropic_base = providers::spawn_anthropic_mock(options.anthropic_fails).await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let config = create_test_config(&options, &temp_dir.path().display().to_string());

    let mut gemini_config = GeminiConfig::new("test-key", "gemini-test");
    gemini_config.base_url = gemini_base;
    let gemini =
        Arc::new(GeminiService::new(gemini_config).expect("Failed to create Gemini client"));

    let anthropic = if options.anthropic_enabled {
        let mut anthropic_config = AnthropicConfig::new("test-key", "claude-test");
        anthropic_config.base_url = anthropic_base;
        Some(Arc::new(
            AnthropicService::new(anthropic_config).expect("Failed to create Anthropic client"),
        ))
    } else {
        None
    };

    let storage = LocalBlobStorage::new(
        temp_dir.path().to_path_buf(),
        "http://localhost:3000/api/blob".to_string(),
    )
    .await
    .expect("Failed to create blob storage");

    let state = Arc::new(AppState {
        providers: ProviderState {
            gemini,
            anthropic,
            http_client: reqwest::Client::new(),
        },
        blobs: BlobState {
            storage: Arc::new(storage),
            signer: options.signing_key.as_deref().map(TokenSigner::new),
        },
        config: config.clone(),
    });

    let app = routes::setup_routes(&config, state)
        .await
        .expect("Failed to setup routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        config,
        _temp_dir: temp_dir,
    }
}

fn create_test_config(options: &TestOptions, storage_path: &str) -> Config {
    Config {
        server_port: 3000,
        cors_origins: vec!["*".to_string()],
        environment: "test".to_string(),
        gemini_api_key: options.gemini_api_key_in_config.clone(),
        gemini_model: "gemini-test".to_string(),
        anthropic_api_key: options.anthropic_enabled.then(|| "test-key".to_string()),
        anthropic_model: "claude-test".to_string(),
        blob_signing_key: options.signing_key.clone(),
        blob_storage_path: storage_path.to_string(),
        public_base_url: "http://localhost:3000".to_string(),
        max_upload_size_bytes: 100 * 1024 * 1024,
        allowed_content_types: [
            "video/mp4",
            "video/quicktime",
            "video/x-msvideo",
            "image/jpeg",
            "image/png",
            "image/webp",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect(),
        request_timeout_seconds: options.request_timeout_seconds,
        file_poll_max_attempts: 5,
        file_poll_initial_delay_ms: 10,
        file_poll_max_delay_ms: 50,
    }
}
