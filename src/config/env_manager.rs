use serde::{Deserialize, Serialize};

/// Stores API keys for the services the pipelines talk to
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeys {
    /// Anthropic API key used by the default completion provider
    pub anthropic_api_key: Option<String>,
    /// OpenAI (or compatible) API key
    pub openai_api_key: Option<String>,
    /// GitHub API token for authenticated requests
    pub github_token: Option<String>,
}

impl ApiKeys {
    /// Overlays keys set in `other` on top of these ones
    pub fn merge(&mut self, other: ApiKeys) {
        if other.anthropic_api_key.is_some() {
            self.anthropic_api_key = other.anthropic_api_key;
        }
        if other.openai_api_key.is_some() {
            self.openai_api_key = other.openai_api_key;
        }
        if other.github_token.is_some() {
            self.github_token = other.github_token;
        }
    }
}

/// Reads an environment variable, treating empty or whitespace-only values as unset
pub fn get_env_value(key: &str) -> Option<String> {
    let value = std::env::var(key).ok()?;
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
