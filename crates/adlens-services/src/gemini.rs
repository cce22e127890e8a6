//! Files + generateContent client for the media-understanding provider
//!
//! Videos go through the resumable upload protocol and are polled until
//! the remote file becomes active; images are sent inline. Callers that
//! already hold an active file URI can skip the upload entirely.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use adlens_core::{Config, ImageAnalysis, MediaKind, VideoAnalysis};
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderResult};
use crate::{extract, prompts};

const API_BASE: &str = "https://generativelanguage.googleapis.com";
const HTTP_TIMEOUT_SECS: u64 = 120;

/// Activation-poll tuning.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Status checks issued before giving up.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    /// Overridable for tests and proxies.
    pub base_url: String,
    pub poll: PollConfig,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: API_BASE.to_string(),
            poll: PollConfig::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            base_url: API_BASE.to_string(),
            poll: PollConfig {
                max_attempts: config.file_poll_max_attempts,
                initial_delay: Duration::from_millis(config.file_poll_initial_delay_ms),
                max_delay: Duration::from_millis(config.file_poll_max_delay_ms),
            },
        }
    }
}

/// Processing state of a remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    #[default]
    Processing,
    Active,
    Failed,
    #[serde(other)]
    Unknown,
}

impl FileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileState::Processing => "PROCESSING",
            FileState::Active => "ACTIVE",
            FileState::Failed => "FAILED",
            FileState::Unknown => "UNKNOWN",
        }
    }
}

/// Handle to an uploaded provider file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFile {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub state: FileState,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileEnvelope {
    file: RemoteFile,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: FileData<'a>,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData<'a> {
    mime_type: &'a str,
    file_uri: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Media-understanding provider client.
pub struct GeminiService {
    config: GeminiConfig,
    http_client: reqwest::Client,
}

impl Debug for GeminiService {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeminiService")
            .field("model", &self.config.model)
            .finish()
    }
}

impl GeminiService {
    pub fn new(config: GeminiConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Upload media through the resumable protocol and return the
    /// remote handle, usually still in the processing state.
    #[tracing::instrument(skip(self, data), fields(size_bytes = data.len()))]
    pub async fn upload_file(
        &self,
        data: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> ProviderResult<RemoteFile> {
        let start_url = format!(
            "{}/upload/v1beta/files?key={}",
            self.config.base_url, self.config.api_key
        );
        let start = self
            .http_client
            .post(&start_url)
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", data.len())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&serde_json::json!({ "file": { "display_name": display_name } }))
            .send()
            .await?;
        let start = ensure_success(start).await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(ProviderError::MalformedResponse(
                "upload start response is missing the session URL header",
            ))?;

        let response = self
            .http_client
            .post(&upload_url)
            .header("Content-Length", data.len())
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(data)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let envelope: FileEnvelope = response.json().await?;
        tracing::info!(
            name = %envelope.file.name,
            state = envelope.file.state.as_str(),
            "Uploaded file to provider"
        );
        Ok(envelope.file)
    }

    /// Fetch the current state of a remote file.
    pub async fn get_file(&self, name: &str) -> ProviderResult<RemoteFile> {
        let url = format!(
            "{}/v1beta/{}?key={}",
            self.config.base_url, name, self.config.api_key
        );
        let response = self.http_client.get(&url).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    /// Poll until the file is active, with exponentially backed-off
    /// delays capped at the configured maximum. A failed state aborts
    /// immediately; exhausting the attempt ceiling is an error.
    #[tracing::instrument(skip(self, file), fields(name = %file.name))]
    pub async fn wait_until_active(&self, mut file: RemoteFile) -> ProviderResult<RemoteFile> {
        let mut attempts = 0u32;
        loop {
            match file.state {
                FileState::Active => {
                    tracing::debug!(attempts, "File is active");
                    return Ok(file);
                }
                FileState::Failed => {
                    return Err(ProviderError::ProcessingFailed {
                        state: file.state.as_str().to_string(),
                    });
                }
                FileState::Processing | FileState::Unknown => {}
            }

            if attempts >= self.config.poll.max_attempts {
                return Err(ProviderError::ActivationTimeout { attempts });
            }

            tokio::time::sleep(self.backoff_delay(attempts)).await;
            attempts += 1;
            file = self.get_file(&file.name).await?;
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let delay = self
            .config
            .poll
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.config.poll.max_delay)
    }

    async fn generate_content(&self, parts: Vec<Part<'_>>) -> ProviderResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.base_url, self.config.model, self.config.api_key
        );
        let body = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts,
            }],
        };
        let response = self.http_client.post(&url).json(&body).send().await?;
        let response = ensure_success(response).await?;

        let parsed: GenerateResponse = response.json().await?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ProviderError::MalformedResponse(
                "response contained no candidate text",
            ));
        }
        Ok(text)
    }

    /// Upload a video, wait for activation, and analyze it.
    #[tracing::instrument(skip(self, data), fields(size_bytes = data.len()))]
    pub async fn analyze_video(
        &self,
        data: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> ProviderResult<VideoAnalysis> {
        if MediaKind::from_content_type(mime_type) != Some(MediaKind::Video) {
            return Err(ProviderError::UnsupportedMediaType(mime_type.to_string()));
        }
        let file = self.upload_file(data, mime_type, display_name).await?;
        let file = self.wait_until_active(file).await?;
        self.analyze_video_uri(&file.uri, mime_type).await
    }

    /// Analyze a video that is already active under the given URI.
    pub async fn analyze_video_uri(
        &self,
        file_uri: &str,
        mime_type: &str,
    ) -> ProviderResult<VideoAnalysis> {
        if MediaKind::from_content_type(mime_type) != Some(MediaKind::Video) {
            return Err(ProviderError::UnsupportedMediaType(mime_type.to_string()));
        }
        let text = self
            .generate_content(vec![
                Part::FileData {
                    file_data: FileData {
                        mime_type,
                        file_uri,
                    },
                },
                Part::Text {
                    text: prompts::VIDEO_ANALYSIS_PROMPT,
                },
            ])
            .await?;
        Ok(extract::parse_video_analysis(&text))
    }

    /// Analyze an image inline; no upload or activation wait involved.
    #[tracing::instrument(skip(self, data), fields(size_bytes = data.len()))]
    pub async fn analyze_image(
        &self,
        data: &[u8],
        mime_type: &str,
    ) -> ProviderResult<ImageAnalysis> {
        if MediaKind::from_content_type(mime_type) != Some(MediaKind::Image) {
            return Err(ProviderError::UnsupportedMediaType(mime_type.to_string()));
        }
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        let text = self
            .generate_content(vec![
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type,
                        data: encoded,
                    },
                },
                Part::Text {
                    text: prompts::IMAGE_ANALYSIS_PROMPT,
                },
            ])
            .await?;
        Ok(extract::parse_image_analysis(&text))
    }

    /// Analyze an image already staged under the given file URI.
    pub async fn analyze_image_uri(
        &self,
        file_uri: &str,
        mime_type: &str,
    ) -> ProviderResult<ImageAnalysis> {
        if MediaKind::from_content_type(mime_type) != Some(MediaKind::Image) {
            return Err(ProviderError::UnsupportedMediaType(mime_type.to_string()));
        }
        let text = self
            .generate_content(vec![
                Part::FileData {
                    file_data: FileData {
                        mime_type,
                        file_uri,
                    },
                },
                Part::Text {
                    text: prompts::IMAGE_ANALYSIS_PROMPT,
                },
            ])
            .await?;
        Ok(extract::parse_image_analysis(&text))
    }
}

async fn ensure_success(response: reqwest::Response) -> ProviderResult<reqwest::Response> {
    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ProviderError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use axum::extract::State;
    use axum::http::HeaderMap;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    #[derive(Default)]
    struct MockProvider {
        upload_starts: AtomicU32,
        polls: AtomicU32,
        generates: AtomicU32,
        active_after: u32,
        fail_file: bool,
        fenced_output: bool,
        generate_status: Option<u16>,
    }

    async fn start_upload(
        State(state): State<Arc<MockProvider>>,
        headers: HeaderMap,
    ) -> impl IntoResponse {
        state.upload_starts.fetch_add(1, Ordering::SeqCst);
        let host = headers
            .get("host")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        (
            [("x-goog-upload-url", format!("http://{host}/upload-session"))],
            Json(json!({})),
        )
    }

    async fn finish_upload() -> Json<Value> {
        Json(json!({
            "file": {
                "name": "files/abc123",
                "uri": "https://provider.example/files/abc123",
                "state": "PROCESSING",
                "mimeType": "video/mp4"
            }
        }))
    }

    async fn poll_status(State(state): State<Arc<MockProvider>>) -> Json<Value> {
        let polls = state.polls.fetch_add(1, Ordering::SeqCst) + 1;
        let file_state = if state.fail_file {
            "FAILED"
        } else if polls >= state.active_after {
            "ACTIVE"
        } else {
            "PROCESSING"
        };
        Json(json!({
            "name": "files/abc123",
            "uri": "https://provider.example/files/abc123",
            "state": file_state,
            "mimeType": "video/mp4"
        }))
    }

    async fn generate(State(state): State<Arc<MockProvider>>) -> impl IntoResponse {
        state.generates.fetch_add(1, Ordering::SeqCst);
        if let Some(status) = state.generate_status {
            return (
                axum::http::StatusCode::from_u16(status).unwrap(),
                "quota exceeded".to_string(),
            )
                .into_response();
        }
        let text = if state.fenced_output {
            "```json\n{\"description\": \"A red chair.\", \"adCopy\": [\"Sit better\"], \"visualElements\": [\"chair\"]}\n```"
        } else {
            "{\"transcript\": \"hello\", \"description\": \"a demo\", \"scenes\": [\"Scene 1: intro\"]}"
        };
        Json(json!({
            "candidates": [
                {"content": {"parts": [{"text": text}]}}
            ]
        }))
        .into_response()
    }

    async fn spawn_mock(state: Arc<MockProvider>) -> String {
        let router = Router::new()
            .route("/upload/v1beta/files", post(start_upload))
            .route("/upload-session", post(finish_upload))
            .route("/v1beta/files/{id}", get(poll_status))
            .route("/v1beta/models/{model}", post(generate))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn test_service(base_url: String, max_attempts: u32) -> GeminiService {
        let mut config = GeminiConfig::new("test-key", "gemini-2.5-flash");
        config.base_url = base_url;
        config.poll = PollConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        };
        GeminiService::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_video_analysis_polls_until_active() {
        let state = Arc::new(MockProvider {
            active_after: 3,
            ..Default::default()
        });
        let base = spawn_mock(state.clone()).await;
        let service = test_service(base, 30);

        let analysis = service
            .analyze_video(vec![0u8; 16], "video/mp4", "demo.mp4")
            .await
            .unwrap();

        assert_eq!(analysis.transcript, "hello");
        assert_eq!(analysis.description, "a demo");
        assert_eq!(analysis.scenes, vec!["Scene 1: intro"]);
        assert_eq!(state.upload_starts.load(Ordering::SeqCst), 1);
        assert_eq!(state.polls.load(Ordering::SeqCst), 3);
        assert_eq!(state.generates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_poll_ceiling_aborts_without_generation() {
        let state = Arc::new(MockProvider {
            active_after: u32::MAX,
            ..Default::default()
        });
        let base = spawn_mock(state.clone()).await;
        let service = test_service(base, 4);

        let err = service
            .analyze_video(vec![0u8; 16], "video/mp4", "demo.mp4")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProviderError::ActivationTimeout { attempts: 4 }
        ));
        assert_eq!(state.polls.load(Ordering::SeqCst), 4);
        assert_eq!(state.generates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_state_short_circuits() {
        let state = Arc::new(MockProvider {
            fail_file: true,
            active_after: u32::MAX,
            ..Default::default()
        });
        let base = spawn_mock(state.clone()).await;
        let service = test_service(base, 30);

        let err = service
            .analyze_video(vec![0u8; 16], "video/mp4", "demo.mp4")
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::ProcessingFailed { .. }));
        assert_eq!(state.polls.load(Ordering::SeqCst), 1);
        assert_eq!(state.generates.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_image_analysis_skips_upload() {
        let state = Arc::new(MockProvider {
            fenced_output: true,
            ..Default::default()
        });
        let base = spawn_mock(state.clone()).await;
        let service = test_service(base, 30);

        let analysis = service
            .analyze_image(&[0x89, 0x50, 0x4E, 0x47], "image/png")
            .await
            .unwrap();

        assert_eq!(analysis.description, "A red chair.");
        assert_eq!(analysis.ad_copy, vec!["Sit better"]);
        assert_eq!(state.upload_starts.load(Ordering::SeqCst), 0);
        assert_eq!(state.polls.load(Ordering::SeqCst), 0);
        assert_eq!(state.generates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_success_maps_to_api_error() {
        let state = Arc::new(MockProvider {
            generate_status: Some(500),
            ..Default::default()
        });
        let base = spawn_mock(state.clone()).await;
        let service = test_service(base, 30);

        let err = service
            .analyze_image_uri("https://provider.example/files/abc123", "image/png")
            .await
            .unwrap_err();

        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 500);
                assert!(message.contains("quota exceeded"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_wrong_prefix_rejected_before_any_request() {
        let service = test_service("http://127.0.0.1:1".to_string(), 30);
        let err = service
            .analyze_video(vec![0u8; 4], "image/png", "not-a-video.png")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedMediaType(_)));

        let err = service.analyze_image(&[0u8; 4], "video/mp4").await.unwrap_err();
        assert!(matches!(err, ProviderError::UnsupportedMediaType(_)));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let mut config = GeminiConfig::new("k", "m");
        config.poll = PollConfig {
            max_attempts: 30,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        };
        let service = GeminiService::new(config).unwrap();
        assert_eq!(service.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(service.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(service.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(service.backoff_delay(3), Duration::from_secs(8));
        assert_eq!(service.backoff_delay(4), Duration::from_secs(10));
        assert_eq!(service.backoff_delay(20), Duration::from_secs(10));
    }
}
