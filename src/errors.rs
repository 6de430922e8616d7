//! Error types for ollamaproxy
//!
//! One error enum covers the lifecycle manager, the Ollama client and the
//! chat proxy. Only `ExecutableNotFound` is fatal at startup; every other
//! bootstrap failure is logged and the process keeps going.

use thiserror::Error;

/// Main error type for ollamaproxy
#[derive(Error, Debug)]
pub enum ProxyError {
    /// The Ollama executable could not be found on this machine
    #[error("'{executable}' command not found. Install Ollama from https://ollama.com")]
    ExecutableNotFound { executable: String },

    /// The server process could not be started
    #[error("Failed to launch Ollama server: {0}")]
    LaunchFailed(String),

    /// Model download failed
    #[error("Failed to pull model '{model}': {reason}")]
    ModelPullFailed { model: String, reason: String },

    /// Ollama API errors
    #[error("Ollama API error: {0}")]
    OllamaApiError(String),

    /// Streaming errors
    #[error("Streaming error: {0}")]
    StreamingError(String),

    /// JSON parsing errors
    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProxyError {
    /// True when the failure happened talking to Ollama rather than locally
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ProxyError::OllamaApiError(_)
                | ProxyError::StreamingError(_)
                | ProxyError::HttpError(_)
                | ProxyError::JsonParseError(_)
        )
    }
}

/// Result type alias for ollamaproxy operations
pub type Result<T> = std::result::Result<T, ProxyError>;
