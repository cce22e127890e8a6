//! Messages API client for ad-copy generation
//!
//! The request declares two tools: the provider's web-search tool and a
//! custom `ad_copy` tool whose input schema pins the result shape. The
//! tool invocation is preferred; free text goes through the recovery
//! parser; and when neither yields a pair, the static fallback copy is
//! returned. Transport and API failures still surface as errors so the
//! caller can decide whether to absorb them.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use adlens_core::{AdCopy, Config};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ProviderError, ProviderResult};
use crate::{extract, prompts};

const API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 2048;
const WEB_SEARCH_MAX_USES: u32 = 5;
const HTTP_TIMEOUT_SECS: u64 = 120;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub model: String,
    /// Overridable for tests and proxies.
    pub base_url: String,
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: API_BASE.to_string(),
        }
    }

    /// None when no API key is configured; enrichment is skipped then.
    pub fn from_config(config: &Config) -> Option<Self> {
        config
            .anthropic_api_key
            .as_ref()
            .map(|key| Self::new(key.clone(), config.anthropic_model.clone()))
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<MessageParam<'a>>,
    tools: Vec<Tool<'a>>,
}

#[derive(Debug, Serialize)]
struct MessageParam<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Tool<'a> {
    Server {
        #[serde(rename = "type")]
        tool_type: &'a str,
        name: &'a str,
        max_uses: u32,
    },
    Custom {
        name: &'a str,
        description: &'a str,
        input_schema: serde_json::Value,
    },
}

fn ad_copy_tool() -> Tool<'static> {
    Tool::Custom {
        name: "ad_copy",
        description: "Record the final advertising copy for the analyzed media.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "headline": {
                    "type": "string",
                    "description": "Attention-grabbing headline, maximum 50 characters"
                },
                "description": {
                    "type": "string",
                    "description": "Persuasive ad description"
                }
            },
            "required": ["headline", "description"]
        }),
    }
}

/// Response content block, kept permissive: server tool blocks carry
/// shapes of their own and are simply skipped.
#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    input: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

/// Copy-generation provider client.
pub struct AnthropicService {
    config: AnthropicConfig,
    http_client: reqwest::Client,
}

impl Debug for AnthropicService {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("AnthropicService")
            .field("model", &self.config.model)
            .finish()
    }
}

impl AnthropicService {
    pub fn new(config: AnthropicConfig) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Generate an ad-copy pair from the analysis content. Always
    /// returns a fully populated pair on success.
    #[tracing::instrument(skip_all)]
    pub async fn generate_ad_copy(
        &self,
        description: &str,
        transcript: Option<&str>,
        scenes: &[String],
    ) -> ProviderResult<AdCopy> {
        let prompt = prompts::ad_copy_prompt(description, transcript, scenes);
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: MAX_TOKENS,
            messages: vec![MessageParam {
                role: "user",
                content: prompt,
            }],
            tools: vec![
                Tool::Server {
                    tool_type: "web_search_20250305",
                    name: "web_search",
                    max_uses: WEB_SEARCH_MAX_USES,
                },
                ad_copy_tool(),
            ],
        };

        let response = self
            .http_client
            .post(format!("{}/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

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

        let parsed: MessagesResponse = response.json().await?;

        for block in &parsed.content {
            if block.block_type == "tool_use" && block.name.as_deref() == Some("ad_copy") {
                if let Some(input) = &block.input {
                    if let Ok(copy) = serde_json::from_value::<AdCopy>(input.clone()) {
                        tracing::debug!("Ad copy taken from tool invocation");
                        return Ok(copy);
                    }
                }
            }
        }

        let text = parsed
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");
        tracing::debug!("No usable tool invocation, recovering copy from text");
        Ok(extract::recover_ad_copy(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::HeaderMap;
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::Value;

    #[derive(Default)]
    struct MockMessages {
        reply: Value,
        status: Option<u16>,
        captured: Mutex<Option<(HeaderMap, Value)>>,
    }

    async fn messages(
        State(state): State<Arc<MockMessages>>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> impl IntoResponse {
        *state.captured.lock().unwrap() = Some((headers, body));
        if let Some(status) = state.status {
            return (
                axum::http::StatusCode::from_u16(status).unwrap(),
                "rate limited".to_string(),
            )
                .into_response();
        }
        Json(state.reply.clone()).into_response()
    }

    async fn spawn_mock(state: Arc<MockMessages>) -> String {
        let router = Router::new()
            .route("/messages", post(messages))
            .with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn test_service(base_url: String) -> AnthropicService {
        let mut config = AnthropicConfig::new("test-key", "claude-sonnet-4-20250514");
        config.base_url = base_url;
        AnthropicService::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_tool_invocation_preferred_over_text() {
        let state = Arc::new(MockMessages {
            reply: serde_json::json!({
                "content": [
                    {"type": "text", "text": "Thinking about the copy..."},
                    {"type": "server_tool_use", "id": "x", "name": "web_search", "input": {"query": "standing desks"}},
                    {"type": "tool_use", "id": "y", "name": "ad_copy", "input": {
                        "headline": "Stand Up For Your Back",
                        "description": "Your chair is costing you focus."
                    }}
                ]
            }),
            ..Default::default()
        });
        let base = spawn_mock(state.clone()).await;
        let service = test_service(base);

        let copy = service
            .generate_ad_copy("A standing desk demo", None, &[])
            .await
            .unwrap();

        assert_eq!(copy.headline, "Stand Up For Your Back");
        assert_eq!(copy.description, "Your chair is costing you focus.");
    }

    #[tokio::test]
    async fn test_text_recovery_when_no_tool_use() {
        let state = Arc::new(MockMessages {
            reply: serde_json::json!({
                "content": [
                    {"type": "text", "text": "```json\n{\"headline\": \"Own the Morning\", \"description\": \"Start strong.\"}\n```"}
                ]
            }),
            ..Default::default()
        });
        let base = spawn_mock(state.clone()).await;
        let service = test_service(base);

        let copy = service
            .generate_ad_copy("A coffee ad", Some("wake up"), &["Scene 1: sunrise".to_string()])
            .await
            .unwrap();

        assert_eq!(copy.headline, "Own the Morning");
        assert_eq!(copy.description, "Start strong.");
    }

    #[tokio::test]
    async fn test_static_fallback_when_unrecoverable() {
        let state = Arc::new(MockMessages {
            reply: serde_json::json!({
                "content": [
                    {"type": "text", "text": "No structured output today."}
                ]
            }),
            ..Default::default()
        });
        let base = spawn_mock(state.clone()).await;
        let service = test_service(base);

        let copy = service.generate_ad_copy("desc", None, &[]).await.unwrap();
        assert_eq!(copy, AdCopy::fallback());
    }

    #[tokio::test]
    async fn test_api_error_surfaces() {
        let state = Arc::new(MockMessages {
            status: Some(429),
            ..Default::default()
        });
        let base = spawn_mock(state.clone()).await;
        let service = test_service(base);

        let err = service.generate_ad_copy("desc", None, &[]).await.unwrap_err();
        match err {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 429);
                assert!(message.contains("rate limited"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_request_shape() {
        let state = Arc::new(MockMessages {
            reply: serde_json::json!({"content": []}),
            ..Default::default()
        });
        let base = spawn_mock(state.clone()).await;
        let service = test_service(base);

        let _ = service
            .generate_ad_copy(
                "A standing desk demo",
                Some("narration"),
                &["Scene 1: office".to_string()],
            )
            .await
            .unwrap();

        let captured = state.captured.lock().unwrap();
        let (headers, body) = captured.as_ref().unwrap();
        assert_eq!(headers.get("x-api-key").unwrap(), "test-key");
        assert_eq!(headers.get("anthropic-version").unwrap(), API_VERSION);

        assert_eq!(body["model"], "claude-sonnet-4-20250514");
        assert_eq!(body["max_tokens"], MAX_TOKENS);
        let tools = body["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0]["type"], "web_search_20250305");
        assert_eq!(tools[0]["max_uses"], WEB_SEARCH_MAX_USES);
        assert_eq!(tools[1]["name"], "ad_copy");
        assert_eq!(
            tools[1]["input_schema"]["required"],
            serde_json::json!(["headline", "description"])
        );

        let content = body["messages"][0]["content"].as_str().unwrap();
        assert!(content.contains("A standing desk demo"));
        assert!(content.contains("narration"));
        assert!(content.contains("Scene 1: office"));
    }
}
