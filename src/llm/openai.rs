use async_openai::config::OpenAIConfig;
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use tracing::debug;
use crate::error::{GlassboxError, Result};
use super::{CompletionClient, CompletionRequest};

/// Client for OpenAI-compatible chat completion APIs
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
}

impl OpenAiClient {
    /// Creates a client for `api_base` (e.g. `https://api.openai.com/v1`)
    pub fn new(api_key: String, api_base: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base.trim_end_matches('/'));
        Self {
            client: Client::with_config(config),
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        debug!("Calling {} with {} prompt characters", request.model, request.prompt.len());

        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(request.prompt.as_str())
            .build()?;

        let body = CreateChatCompletionRequestArgs::default()
            .model(request.model.as_str())
            .max_completion_tokens(request.max_tokens)
            .messages(vec![message.into()])
            .build()?;

        let response = self.client.chat().create(body).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GlassboxError::LLM("Response contained no text content".into()))
    }
}
