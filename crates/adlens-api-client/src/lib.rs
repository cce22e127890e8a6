//! Shared HTTP client for the Adlens API.
//!
//! Provides a minimal client with generic GET/POST/PUT helpers and domain
//! methods (upload-token handshake, blob PUT, analyze, provider config).
//! The CLI uses this client directly.

pub mod api;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Error body shape returned by every failing API endpoint.
#[derive(Debug, serde::Deserialize)]
struct ErrorBody {
    error: String,
}

/// HTTP client for the Adlens API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create client from environment: ADLENS_API_URL (or API_URL),
    /// defaulting to a local server.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("ADLENS_API_URL")
            .or_else(|_| std::env::var("API_URL"))
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        Self::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Turn a non-success response into an error carrying the server's
    /// message. Falls back to the raw body when it is not `{"error": ...}`.
    async fn error_for(response: reqwest::Response) -> anyhow::Error {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = serde_json::from_str::<ErrorBody>(&error_text)
            .map(|body| body.error)
            .unwrap_or(error_text);
        anyhow::anyhow!("API request failed with status {}: {}", status, message)
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.build_url(path);
        let mut request = self.client.get(&url);

        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.context("Failed to send request")?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;

        Ok(body)
    }

    /// POST JSON body and deserialize response.
    pub async fn post_json<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.post_json_with_timeout(path, body, None).await
    }

    /// POST JSON body with a per-request timeout override.
    pub async fn post_json_with_timeout<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
        timeout: Option<Duration>,
    ) -> Result<T> {
        let url = self.build_url(path);
        let mut request = self.client.post(&url).json(body);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.context("Failed to send request")?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;

        Ok(body)
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
        timeout: Option<Duration>,
    ) -> Result<T> {
        let url = self.build_url(path);
        let mut request = self.client.post(&url).multipart(form);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.context("Failed to send request")?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;

        Ok(body)
    }

    /// PUT raw bytes with a bearer token and content type. Deserializes
    /// JSON response.
    pub async fn put_bytes<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<T> {
        let url = self.build_url(path);
        let request = self
            .client
            .put(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", content_type)
            .body(data);

        let response = request.send().await.context("Failed to send request")?;
        if !response.status().is_success() {
            return Err(Self::error_for(response).await);
        }

        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;

        Ok(body)
    }

    /// Raw client for custom requests.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

// Re-export wire types and the extension helper for convenience.
pub use adlens_core::models::{
    AdCopy, ClientTokenResponse, ImageAnalysis, MediaAnalysis, MediaKind, ProviderConfigResponse,
    PutBlobResult, VideoAnalysis,
};
pub use api::content_type_for_file_name;
