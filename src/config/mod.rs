mod env_manager;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use url::Url;
use crate::error::{GlassboxError, Result};
use crate::github::FetchLimits;
use crate::pipeline::PipelineSettings;

pub use env_manager::{get_env_value, ApiKeys};

/// Default model used for every pipeline call
pub const DEFAULT_MODEL: &str = "claude-opus-4-6";

/// Completion API the pipelines talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Anthropic Messages API
    Anthropic,
    /// OpenAI-compatible chat completions API
    #[serde(rename = "openai")]
    OpenAI,
}

impl FromStr for Provider {
    type Err = GlassboxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAI),
            other => Err(GlassboxError::Config(format!("Unknown provider: {}", other))),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anthropic => write!(f, "anthropic"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

/// Main configuration struct for the application
///
/// Built once at startup and handed to the components that need it; nothing reads
/// process-global settings after that.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which completion API to call
    pub provider: Provider,
    /// Model identifier sent with every completion request
    pub model_name: String,
    /// Output-size ceiling for each model call, in tokens
    pub max_output_tokens: u32,
    /// Maximum number of README characters kept in a snapshot
    pub max_content_size: usize,
    /// Maximum number of characters kept per config file
    pub max_file_size: usize,
    /// Timeout for a single completion request
    pub llm_timeout_secs: u64,
    /// Timeout for a single GitHub request
    pub github_timeout_secs: u64,
    /// Upstream base URLs
    pub endpoints: Endpoints,
    /// HTTP server settings
    pub server: ServerConfig,
    /// API keys for the upstream services
    pub api_keys: ApiKeys,
}

/// Base URLs of upstream services, overridable for tests and proxies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// GitHub REST API
    pub github_api: String,
    /// Raw file host used for README downloads
    pub github_raw: String,
    /// Anthropic API
    pub anthropic_api: String,
    /// OpenAI-compatible API (including the `/v1` suffix)
    pub openai_api: String,
}

/// Settings for the streaming HTTP server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind_address: String,
    /// Origins allowed by the CORS layer
    pub allowed_origins: Vec<String>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            github_api: "https://api.github.com".to_string(),
            github_raw: "https://raw.githubusercontent.com".to_string(),
            anthropic_api: "https://api.anthropic.com".to_string(),
            openai_api: "https://api.openai.com/v1".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8000".to_string(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: Provider::Anthropic,
            model_name: DEFAULT_MODEL.to_string(),
            max_output_tokens: 4096,
            max_content_size: 15_000,
            max_file_size: 8_000,
            llm_timeout_secs: 300,
            github_timeout_secs: 15,
            endpoints: Endpoints::default(),
            server: ServerConfig::default(),
            api_keys: ApiKeys::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the config file (if any) and then the environment
    ///
    /// The file is looked up at `$GLASSBOX_CONFIG`, falling back to
    /// `<config_dir>/glassbox/config.toml`. A missing file is not an error.
    /// Variables from a `.env` file in the working directory are loaded first.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from_path(&path)?,
            _ => Self::default(),
        };
        config.apply_overrides(get_env_value);
        Ok(config)
    }

    /// Loads configuration from a TOML file, without environment overrides
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| GlassboxError::Config(format!("Failed to read config file {}: {}", path.display(), e)))?;

        toml::from_str(&content)
            .map_err(|e| GlassboxError::Config(format!("Failed to parse config file {}: {}", path.display(), e)))
    }

    fn config_path() -> Option<PathBuf> {
        if let Some(path) = get_env_value("GLASSBOX_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("glassbox").join("config.toml"))
    }

    /// Applies overrides from a key lookup (the process environment in production)
    ///
    /// Unparseable numeric values are ignored and the previous value kept.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup("GLASSBOX_PROVIDER").and_then(|p| p.parse().ok()) {
            self.provider = provider;
        }
        if let Some(model) = lookup("MODEL_NAME") {
            self.model_name = model;
        }
        if let Some(tokens) = lookup("GLASSBOX_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.max_output_tokens = tokens;
        }
        let content_size = lookup("GLASSBOX_MAX_CONTENT_SIZE").or_else(|| lookup("MAX_CONTENT_SIZE"));
        if let Some(size) = content_size.and_then(|v| v.parse().ok()) {
            self.max_content_size = size;
        }
        let file_size = lookup("GLASSBOX_MAX_FILE_SIZE").or_else(|| lookup("MAX_FILE_SIZE"));
        if let Some(size) = file_size.and_then(|v| v.parse().ok()) {
            self.max_file_size = size;
        }
        if let Some(secs) = lookup("GLASSBOX_LLM_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.llm_timeout_secs = secs;
        }
        if let Some(secs) = lookup("GLASSBOX_GITHUB_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.github_timeout_secs = secs;
        }
        if let Some(base) = lookup("GITHUB_API_BASE_URL") {
            self.endpoints.github_api = base;
        }
        if let Some(base) = lookup("ANTHROPIC_BASE_URL") {
            self.endpoints.anthropic_api = base;
        }
        if let Some(base) = lookup("OPENAI_BASE_URL") {
            self.endpoints.openai_api = base;
        }
        if let Some(bind) = lookup("GLASSBOX_BIND") {
            self.server.bind_address = bind;
        }
        if let Some(origins) = lookup("GLASSBOX_ALLOWED_ORIGINS") {
            self.server.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        self.api_keys.merge(ApiKeys {
            anthropic_api_key: lookup("ANTHROPIC_API_KEY"),
            openai_api_key: lookup("OPENAI_API_KEY"),
            github_token: lookup("GITHUB_TOKEN"),
        });
    }

    /// Validates limits and that the selected provider has an API key
    pub fn validate(&self) -> Result<()> {
        if self.model_name.trim().is_empty() {
            return Err(GlassboxError::Config("model_name must not be empty".into()));
        }
        if self.max_output_tokens == 0 {
            return Err(GlassboxError::Config("max_output_tokens must be positive".into()));
        }
        if self.max_content_size == 0 || self.max_file_size == 0 {
            return Err(GlassboxError::Config("content size caps must be positive".into()));
        }
        for endpoint in [
            &self.endpoints.github_api,
            &self.endpoints.github_raw,
            &self.endpoints.anthropic_api,
            &self.endpoints.openai_api,
        ] {
            Url::parse(endpoint)?;
        }
        self.provider_api_key()?;
        Ok(())
    }

    /// Returns the API key for the configured provider
    pub fn provider_api_key(&self) -> Result<&str> {
        let (key, var) = match self.provider {
            Provider::Anthropic => (&self.api_keys.anthropic_api_key, "ANTHROPIC_API_KEY"),
            Provider::OpenAI => (&self.api_keys.openai_api_key, "OPENAI_API_KEY"),
        };
        key.as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GlassboxError::Config(format!("{} not configured", var)))
    }

    /// The settings the pipeline runner is constructed with
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            model: self.model_name.clone(),
            max_output_tokens: self.max_output_tokens,
        }
    }

    /// Size caps applied while building repository snapshots
    pub fn fetch_limits(&self) -> FetchLimits {
        FetchLimits {
            max_content_size: self.max_content_size,
            max_file_size: self.max_file_size,
            ..FetchLimits::default()
        }
    }

    /// Timeout for a single completion request
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }

    /// Timeout for a single GitHub request
    pub fn github_timeout(&self) -> Duration {
        Duration::from_secs(self.github_timeout_secs)
    }
}
