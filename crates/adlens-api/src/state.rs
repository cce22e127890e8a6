//! Application state and sub-state extractors.
//!
//! AppState is split into sub-states so handlers can extract only what
//! they need via Axum's `FromRef`.

use std::sync::Arc;

use adlens_core::Config;
use adlens_services::{AnthropicService, GeminiService};
use adlens_storage::{BlobStorage, TokenSigner};

/// Provider clients and the shared HTTP client used for blob fetches
/// and callback delivery.
#[derive(Clone)]
pub struct ProviderState {
    pub gemini: Arc<GeminiService>,
    /// Enrichment is skipped when no copy-generation key is configured.
    pub anthropic: Option<Arc<AnthropicService>>,
    pub http_client: reqwest::Client,
}

/// Blob storage backend and upload-token signing.
#[derive(Clone)]
pub struct BlobState {
    pub storage: Arc<dyn BlobStorage>,
    /// None when no signing key is configured; the upload handshake and
    /// the blob PUT refuse at request time.
    pub signer: Option<TokenSigner>,
}

/// Main application state: aggregates sub-states for dependency injection.
#[derive(Clone)]
pub struct AppState {
    pub providers: ProviderState,
    pub blobs: BlobState,
    pub config: Config,
}

impl axum::extract::FromRef<Arc<AppState>> for BlobState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.blobs.clone()
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
