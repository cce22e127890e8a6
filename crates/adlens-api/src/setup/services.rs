//! Service initialization and application state setup

use std::sync::Arc;
use std::time::Duration;

use adlens_core::Config;
use adlens_services::{AnthropicConfig, AnthropicService, GeminiConfig, GeminiService};
use adlens_storage::{LocalBlobStorage, TokenSigner};
use anyhow::{Context, Result};

use crate::state::{AppState, BlobState, ProviderState};

/// Initialize provider clients and blob storage, returning the application state
pub async fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let gemini = Arc::new(
        GeminiService::new(GeminiConfig::from_config(config))
            .context("Failed to create Gemini client")?,
    );
    tracing::info!(model = %config.gemini_model, "Gemini client ready");

    let anthropic = match AnthropicConfig::from_config(config) {
        Some(cfg) => {
            let service =
                AnthropicService::new(cfg).context("Failed to create Anthropic client")?;
            tracing::info!(model = %config.anthropic_model, "Ad copy enrichment enabled");
            Some(Arc::new(service))
        }
        None => {
            tracing::info!("ANTHROPIC_API_KEY not set, ad copy enrichment disabled");
            None
        }
    };

    let blob_base_url = format!("{}/api/blob", config.public_base_url.trim_end_matches('/'));
    let storage = LocalBlobStorage::new(config.blob_storage_path.clone(), blob_base_url)
        .await
        .context("Failed to initialize blob storage")?;
    tracing::info!(path = %config.blob_storage_path, "Blob storage ready");

    let signer = match config.blob_signing_key.as_deref() {
        Some(key) => Some(TokenSigner::new(key)),
        None => {
            tracing::warn!(
                "BLOB_SIGNING_KEY not set, upload token endpoints will refuse requests"
            );
            None
        }
    };

    // Shared client for blob fetches and completion callbacks
    let http_client = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;

    Ok(Arc::new(AppState {
        providers: ProviderState {
            gemini,
            anthropic,
            http_client,
        },
        blobs: BlobState {
            storage: Arc::new(storage),
            signer,
        },
        config: config.clone(),
    }))
}
