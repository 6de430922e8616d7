//! Configuration management for ollamaproxy
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.ollamaproxy/config.toml
//!
//! Precedence, lowest first: built-in defaults, config file, environment
//! (`OLLAMA_URL`, `OLLAMA_MODEL`, `OLLAMA_BIN`, `OLLAMAPROXY_HOST`,
//! `OLLAMAPROXY_PORT`), command-line flags.

use crate::errors::{ProxyError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default Ollama API endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default required model
pub const DEFAULT_MODEL: &str = "qwen2.5:3b";

/// Default system prompt sent ahead of every user message
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a helpful, intelligent AI agent. Answer clearly using Markdown formatting.";

/// Complete configuration for ollamaproxy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ollama: OllamaConfig,
    pub bootstrap: BootstrapConfig,
    pub server: ServerConfig,
    pub chat: ChatConfig,
}

/// Ollama connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub model: String,
    pub executable: String,
}

/// How a missing model gets downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PullMethod {
    /// Run `<executable> pull <model>`
    Cli,
    /// POST /api/pull on the running server
    Api,
}

/// Lifecycle manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub probe_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub max_attempts: u32,
    pub pull_method: PullMethod,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Chat forwarding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub system_prompt: String,
    pub temperature: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            executable: "ollama".to_string(),
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 1000,
            poll_interval_ms: 1000,
            max_attempts: 20,
            pull_method: PullMethod::Cli,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            temperature: 0.7,
        }
    }
}

impl BootstrapConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ProxyError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| ProxyError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Load default configuration from standard location or use built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    /// Standard config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".ollamaproxy").join("config.toml"))
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("OLLAMA_URL") {
            self.ollama.base_url = url;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.ollama.model = model;
        }
        if let Some(executable) = lookup("OLLAMA_BIN") {
            self.ollama.executable = executable;
        }
        if let Some(host) = lookup("OLLAMAPROXY_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("OLLAMAPROXY_PORT") {
            self.server.port = port.parse().map_err(|_| {
                ProxyError::ConfigError(format!("Invalid OLLAMAPROXY_PORT: {}", port))
            })?;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.ollama.base_url.starts_with("http://")
            && !self.ollama.base_url.starts_with("https://")
        {
            return Err(ProxyError::ConfigError(format!(
                "base_url must start with http:// or https://, got {}",
                self.ollama.base_url
            )));
        }

        if self.ollama.model.trim().is_empty() {
            return Err(ProxyError::ConfigError("model must not be empty".to_string()));
        }

        if self.ollama.executable.trim().is_empty() {
            return Err(ProxyError::ConfigError(
                "executable must not be empty".to_string(),
            ));
        }

        if self.bootstrap.max_attempts == 0 {
            return Err(ProxyError::ConfigError(
                "max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.bootstrap.probe_timeout_ms == 0 {
            return Err(ProxyError::ConfigError(
                "probe_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(ProxyError::ConfigError(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the effective configuration
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ProxyError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    /// Ollama base URL without a trailing slash
    pub fn ollama_url(&self) -> &str {
        self.ollama.base_url.trim_end_matches('/')
    }

    /// Address the HTTP listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
