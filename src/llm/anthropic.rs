use std::time::Duration;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;
use crate::error::{GlassboxError, Result};
use super::{CompletionClient, CompletionRequest};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API
#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    message: String,
}

impl AnthropicClient {
    /// Creates a client that authenticates with `api_key` against `base_url`
    pub fn new(api_key: String, base_url: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&api_key)
                .map_err(|_| GlassboxError::Config("ANTHROPIC_API_KEY contains invalid characters".into()))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        debug!("Calling {} with {} prompt characters", request.model, request.prompt.len());

        let response = self.client
            .post(format!("{}/v1/messages", self.base_url))
            .json(&json!({
                "model": request.model,
                "max_tokens": request.max_tokens,
                "messages": [{
                    "role": "user",
                    "content": request.prompt
                }]
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<ErrorEnvelope>(&body) {
                Ok(envelope) => format!("{}: {}", envelope.error.kind, envelope.error.message),
                Err(_) => body.chars().take(200).collect(),
            };
            return Err(GlassboxError::LLM(format!("HTTP {}: {}", status, detail)));
        }

        let message: MessagesResponse = response.json().await?;
        message
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .ok_or_else(|| GlassboxError::LLM("Response contained no text content".into()))
    }
}
