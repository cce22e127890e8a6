//! Domain methods for the Adlens API client.
//!
//! Wire types come from `adlens_core::models`; this module only adds the
//! calls and the local-file plumbing around them.

use crate::ApiClient;
use adlens_core::models::{
    content_type_for_extension, AnalyzeRequest, ClientTokenResponse, MediaAnalysis,
    ProviderConfigResponse, PutBlobResult, TokenRequestPayload, UploadEvent,
};
use anyhow::{Context, Result};
use std::time::Duration;

/// Outlasts the server's 300 second request ceiling.
const ANALYZE_TIMEOUT: Duration = Duration::from_secs(320);

impl ApiClient {
    /// Ask the server for a client upload token covering `pathname`.
    pub async fn request_upload_token(&self, pathname: &str) -> Result<ClientTokenResponse> {
        let event = UploadEvent::GenerateClientToken(TokenRequestPayload {
            pathname: pathname.to_string(),
            callback_url: None,
            client_payload: None,
        });
        self.post_json("/api/upload", &event).await
    }

    /// Upload bytes into the blob store under `pathname` using a token from
    /// `request_upload_token`. The server may suffix the pathname; the
    /// returned result carries the stored location.
    pub async fn put_blob(
        &self,
        pathname: &str,
        token: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<PutBlobResult> {
        let path = format!("/api/blob/{}", encode_pathname(pathname));
        self.put_bytes(&path, token, content_type, data).await
    }

    /// Analyze a blob previously stored via `put_blob`.
    pub async fn analyze_blob(
        &self,
        blob_url: &str,
        mime_type: &str,
        file_name: &str,
    ) -> Result<MediaAnalysis> {
        let request = AnalyzeRequest {
            blob_url: Some(blob_url.to_string()),
            file_uri: None,
            mime_type: Some(mime_type.to_string()),
            file_name: Some(file_name.to_string()),
        };
        self.post_json_with_timeout("/api/analyze", &request, Some(ANALYZE_TIMEOUT))
            .await
    }

    /// Analyze a local file by posting it as multipart, bypassing the blob
    /// handshake entirely.
    pub async fn analyze_file(&self, file_path: &str) -> Result<MediaAnalysis> {
        use std::io::Read;

        let path = std::path::Path::new(file_path);
        if path
            .components()
            .any(|c| c == std::path::Component::ParentDir)
        {
            return Err(anyhow::anyhow!("Invalid file path: {}", path.display()));
        }
        let mut file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open file: {}", file_path))?;

        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read file: {}", file_path))?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let mut part = reqwest::multipart::Part::bytes(buffer).file_name(file_name.clone());
        if let Some(content_type) = content_type_for_file_name(&file_name) {
            part = part
                .mime_str(content_type)
                .context("Failed to set content type on upload part")?;
        }
        let form = reqwest::multipart::Form::new().part("file", part);

        self.post_multipart("/api/analyze", form, Some(ANALYZE_TIMEOUT))
            .await
    }

    /// Fetch the media-provider key the server exposes for direct client
    /// uploads.
    pub async fn provider_config(&self) -> Result<ProviderConfigResponse> {
        self.get("/api/provider-config", &[]).await
    }
}

/// Infer a content type from a file name's extension.
pub fn content_type_for_file_name(file_name: &str) -> Option<&'static str> {
    let (_, extension) = file_name.rsplit_once('.')?;
    content_type_for_extension(extension)
}

/// Percent-encode each pathname segment, keeping the separators literal so
/// the server's wildcard route still sees the segments.
fn encode_pathname(pathname: &str) -> String {
    pathname
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
