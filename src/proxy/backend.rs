//! Chat backend: turns one user message into a stream of reply tokens

use crate::cli::config::Config;
use crate::errors::Result;
use crate::ollama::{ChatMessage, ChatOptions, ChatRequest, OllamaClient};
use async_trait::async_trait;
use futures_util::stream::BoxStream;

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Start a reply; tokens arrive on the returned stream
    async fn stream_reply(&self, message: String) -> Result<BoxStream<'static, Result<String>>>;
}

/// Forwards to Ollama /api/chat with a fixed system prompt
pub struct OllamaChat {
    client: OllamaClient,
    model: String,
    system_prompt: String,
    temperature: f32,
}

impl OllamaChat {
    pub fn new(
        client: OllamaClient,
        model: impl Into<String>,
        system_prompt: impl Into<String>,
        temperature: f32,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            system_prompt: system_prompt.into(),
            temperature,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            OllamaClient::new(config.ollama_url())?,
            config.ollama.model.clone(),
            config.chat.system_prompt.clone(),
            config.chat.temperature,
        ))
    }

    /// Request sent upstream for `message`
    pub fn build_request(&self, message: String) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(self.system_prompt.clone()),
                ChatMessage::user(message),
            ],
            stream: true,
            options: Some(ChatOptions {
                temperature: self.temperature,
            }),
        }
    }
}

#[async_trait]
impl ChatBackend for OllamaChat {
    async fn stream_reply(&self, message: String) -> Result<BoxStream<'static, Result<String>>> {
        let request = self.build_request(message);
        self.client.chat_stream(&request).await
    }
}
