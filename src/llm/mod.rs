//! Completion model clients
//!
//! The pipelines only need "send one prompt, get reply text back". Each provider implements
//! [`CompletionClient`]; the runner holds it behind an `Arc` and treats it as stateless.

mod anthropic;
mod openai;

use std::sync::Arc;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::config::{Config, Provider};
use crate::error::Result;

pub use anthropic::AnthropicClient;
pub use openai::OpenAiClient;

/// A single-message completion call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Model identifier
    pub model: String,
    /// Output-size ceiling in tokens
    pub max_tokens: u32,
    /// Content of the single user message
    pub prompt: String,
}

/// Something that turns a prompt into reply text
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &'static str;

    /// Sends the request and returns the reply text
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Creates the client for the configured provider
pub fn create_completion_client(config: &Config) -> Result<Arc<dyn CompletionClient>> {
    let api_key = config.provider_api_key()?.to_string();
    let client: Arc<dyn CompletionClient> = match config.provider {
        Provider::Anthropic => Arc::new(AnthropicClient::new(
            api_key,
            &config.endpoints.anthropic_api,
            config.llm_timeout(),
        )?),
        Provider::OpenAI => Arc::new(OpenAiClient::new(api_key, &config.endpoints.openai_api)),
    };
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_picks_provider() {
        let mut config = Config::default();
        config.api_keys.anthropic_api_key = Some("sk-ant-test".into());
        assert_eq!(create_completion_client(&config).unwrap().name(), "anthropic");

        config.provider = Provider::OpenAI;
        config.api_keys.openai_api_key = Some("sk-test".into());
        assert_eq!(create_completion_client(&config).unwrap().name(), "openai");
    }

    #[test]
    fn test_factory_requires_key() {
        let config = Config::default();
        assert!(create_completion_client(&config).is_err());
    }
}
