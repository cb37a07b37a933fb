use thiserror::Error;
use std::io;
use async_openai::error::OpenAIError;

/// Custom result type alias for the application
pub type Result<T> = std::result::Result<T, GlassboxError>;

/// Errors that can occur while fetching repositories, calling models, or serving streams
#[derive(Debug, Error)]
pub enum GlassboxError {
    /// I/O errors
    #[error("IO error: {0}")]
    IO(#[from] io::Error),

    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing/serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// OpenAI-compatible API errors
    #[error("OpenAI error: {0}")]
    OpenAI(#[from] OpenAIError),

    /// General message errors
    #[error("{0}")]
    Message(String),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// GitHub API specific errors
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// Language model errors
    #[error("LLM error: {0}")]
    LLM(String),
}

impl GlassboxError {
    /// Creates a new error with the specified message
    pub fn new(message: &str) -> Self {
        Self::Message(message.to_string())
    }

    /// Checks if this error is transient (network-ish) rather than a problem with the input
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::IO(_) | Self::OpenAI(OpenAIError::Reqwest(_)) => true,
            _ => false,
        }
    }

    /// Checks if this error was caused by the caller's input
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
