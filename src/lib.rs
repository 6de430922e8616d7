//! ollamaproxy - streaming chat proxy in front of a local Ollama server
//!
//! # Architecture
//!
//! - **bootstrap**: probe Ollama, launch `ollama serve` when needed, pull the model
//! - **ollama**: HTTP client and NDJSON stream decoding
//! - **proxy**: `POST /chat` endpoint streaming reply tokens as plain text
//! - **doctor**: read-only diagnostics
//! - **cli**: arguments and layered configuration

pub mod errors;

pub mod bootstrap;
pub mod cli;
pub mod doctor;
pub mod ollama;
pub mod proxy;

// Re-export commonly used types
pub use errors::{ProxyError, Result};
