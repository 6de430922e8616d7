//! Ollama API client module
//!
//! Provides the HTTP client, wire types and incremental NDJSON decoder.

pub mod client;
pub mod stream;
pub mod types;

// Re-export commonly used types
pub use client::OllamaClient;
pub use stream::{Decoded, NdjsonDecoder, MAX_BUFFER_SIZE};
pub use types::{ChatMessage, ChatOptions, ChatRequest, ModelInfo, PullProgress, Role};
