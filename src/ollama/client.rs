//! Ollama API client
//!
//! Low-level HTTP client for the Ollama endpoints ollamaproxy needs:
//! - GET  /api/tags     installed models
//! - GET  /api/version  server version
//! - POST /api/pull     model download, NDJSON progress
//! - POST /api/chat     streamed chat, NDJSON tokens

use crate::bootstrap::models::{ModelCatalog, ModelPuller};
use crate::errors::{ProxyError, Result};
use crate::ollama::stream::{Decoded, NdjsonDecoder};
use crate::ollama::types::{
    ChatChunk, ChatRequest, ModelInfo, ModelsResponse, PullProgress, PullRequest, VersionResponse,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, Stream};
use futures_util::StreamExt;
use reqwest::{Client, Response};
use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

/// Connect timeout; response bodies stream for as long as the model talks
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for Ollama API
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    /// Create a new Ollama client for `base_url` (e.g. http://localhost:11434)
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(ProxyError::HttpError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List all installed models
    ///
    /// Fails on transport errors, non-success status and on a body that
    /// does not carry a `models` array of objects with a `name`.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProxyError::OllamaApiError(format!("Failed to list models: {}", e)))?;

        let response = Self::check_status(response).await?;

        let models_response: ModelsResponse = response
            .json()
            .await
            .map_err(|e| ProxyError::JsonParseError(format!("Failed to parse models: {}", e)))?;

        Ok(models_response.models)
    }

    /// Get Ollama version
    pub async fn version(&self) -> Result<String> {
        let url = format!("{}/api/version", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProxyError::OllamaApiError(format!("Failed to get version: {}", e)))?;

        let response = Self::check_status(response).await?;
        let version: VersionResponse = response
            .json()
            .await
            .map_err(|e| ProxyError::JsonParseError(format!("Failed to parse version: {}", e)))?;

        Ok(version.version)
    }

    /// Pull (download) a model through the API
    ///
    /// Waits until the server reports success. Progress is only logged.
    pub async fn pull_model(&self, name: &str) -> Result<()> {
        let url = format!("{}/api/pull", self.base_url);
        let pull_failed = |reason: String| ProxyError::ModelPullFailed {
            model: name.to_string(),
            reason,
        };

        let response = self
            .client
            .post(&url)
            .json(&PullRequest {
                model: name,
                stream: true,
            })
            .send()
            .await
            .map_err(|e| pull_failed(format!("Failed to connect to Ollama: {}", e)))?;

        let response = Self::check_status(response)
            .await
            .map_err(|e| pull_failed(e.to_string()))?;

        let mut body = Box::pin(response.bytes_stream());
        let mut decoder = NdjsonDecoder::<PullProgress>::new();
        let mut last_status = String::new();

        let mut handle = |decoded: Decoded<PullProgress>| -> Result<bool> {
            for progress in decoded.items {
                if let Some(error) = &progress.error {
                    return Err(pull_failed(error.clone()));
                }
                if progress.status != last_status {
                    let layer = progress
                        .layer()
                        .map(|l| format!(" [{}]", l))
                        .unwrap_or_default();
                    match progress.percentage() {
                        Some(pct) => {
                            tracing::debug!(model = name, "{}{} ({:.0}%)", progress.status, layer, pct)
                        }
                        None => tracing::debug!(model = name, "{}{}", progress.status, layer),
                    }
                    last_status = progress.status.clone();
                }
                if progress.status == "success" {
                    return Ok(true);
                }
            }
            match decoded.error {
                Some(e) => Err(pull_failed(e.to_string())),
                None => Ok(false),
            }
        };

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| pull_failed(format!("Failed to read response: {}", e)))?;
            if handle(decoder.push(&chunk))? {
                return Ok(());
            }
        }

        if handle(decoder.finish())? {
            return Ok(());
        }

        Err(pull_failed("stream ended before success".to_string()))
    }

    /// Send a chat request and stream back the reply text
    ///
    /// Errors before the first byte (connection, HTTP status) are returned
    /// directly; later failures arrive as `Err` items and end the stream.
    pub async fn chat_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let url = format!("{}/api/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ProxyError::OllamaApiError(format!("Failed to send request: {}", e)))?;

        let response = Self::check_status(response).await?;
        Ok(token_stream(Box::pin(response.bytes_stream())).boxed())
    }

    async fn check_status(response: Response) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(ProxyError::OllamaApiError(format!(
            "HTTP {}: {}",
            status,
            error_text.trim()
        )))
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

struct TokenStreamState {
    body: ByteStream,
    decoder: NdjsonDecoder<ChatChunk>,
    pending: VecDeque<Result<String>>,
    finished: bool,
}

impl TokenStreamState {
    /// Queue tokens from a decoding step; any error is queued after them
    fn accept(&mut self, decoded: Decoded<ChatChunk>) {
        for chunk in decoded.items {
            if let Some(error) = &chunk.error {
                return self.fail(ProxyError::OllamaApiError(error.clone()));
            }
            if let Some(content) = chunk.content() {
                self.pending.push_back(Ok(content.to_string()));
            }
            if chunk.done {
                self.finished = true;
                return;
            }
        }
        if let Some(e) = decoded.error {
            self.fail(e);
        }
    }

    fn fail(&mut self, error: ProxyError) {
        self.pending.push_back(Err(error));
        self.finished = true;
    }
}

/// Turn a raw /api/chat body into a stream of non-empty token strings
fn token_stream(body: ByteStream) -> impl Stream<Item = Result<String>> + Send {
    let state = TokenStreamState {
        body,
        decoder: NdjsonDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            let decoded = match state.body.next().await {
                Some(Ok(bytes)) => state.decoder.push(&bytes),
                Some(Err(e)) => Decoded::failed(ProxyError::StreamingError(e.to_string())),
                None => {
                    state.finished = true;
                    state.decoder.finish()
                }
            };
            state.accept(decoded);
        }
    })
}

#[async_trait]
impl ModelCatalog for OllamaClient {
    async fn installed_models(&self) -> Result<Vec<String>> {
        Ok(self
            .list_models()
            .await?
            .into_iter()
            .map(|m| m.name)
            .collect())
    }
}

#[async_trait]
impl ModelPuller for OllamaClient {
    async fn pull(&self, model: &str) -> Result<()> {
        self.pull_model(model).await
    }
}
