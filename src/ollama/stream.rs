//! Incremental NDJSON decoder for streaming responses
//!
//! Ollama streams pull progress and chat tokens as newline-delimited JSON.
//! Network chunks do not line up with lines, so bytes are buffered until a
//! newline arrives.
//! - Buffer: 1MB maximum for a single unterminated line
//! - Blank lines are skipped

use crate::errors::{ProxyError, Result};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

/// Maximum buffer size (1MB)
pub const MAX_BUFFER_SIZE: usize = 1_048_576;

/// Output of one decoding step
///
/// Items decoded before a failure are kept; `error` is the line or buffer
/// failure that stopped decoding, if any.
#[derive(Debug)]
pub struct Decoded<T> {
    pub items: Vec<T>,
    pub error: Option<ProxyError>,
}

impl<T> Decoded<T> {
    pub fn failed(error: ProxyError) -> Self {
        Self {
            items: Vec::new(),
            error: Some(error),
        }
    }

    /// Drop partial items and keep only the outcome
    pub fn into_result(self) -> Result<Vec<T>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.items),
        }
    }
}

/// Incremental NDJSON decoder
#[derive(Debug)]
pub struct NdjsonDecoder<T> {
    /// Bytes of the line currently being received
    buffer: Vec<u8>,

    /// Maximum buffer size
    max_buffer_size: usize,

    _item: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> NdjsonDecoder<T> {
    /// Create new decoder with default settings
    pub fn new() -> Self {
        Self::with_capacity(MAX_BUFFER_SIZE)
    }

    /// Create decoder with custom buffer capacity
    pub fn with_capacity(max_buffer_size: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            max_buffer_size,
            _item: PhantomData,
        }
    }

    /// Feed bytes and return every complete line decoded so far.
    ///
    /// Decoding stops at the first bad line; the rest of `bytes` is dropped.
    pub fn push(&mut self, bytes: &[u8]) -> Decoded<T> {
        let mut items = Vec::new();

        for &byte in bytes {
            if byte == b'\n' {
                match self.take_line() {
                    Ok(Some(item)) => items.push(item),
                    Ok(None) => {}
                    Err(e) => return Decoded { items, error: Some(e) },
                }
                continue;
            }

            if self.buffer.len() >= self.max_buffer_size {
                self.buffer.clear();
                let error = ProxyError::JsonParseError(format!(
                    "Line exceeds maximum buffer size of {} bytes",
                    self.max_buffer_size
                ));
                return Decoded {
                    items,
                    error: Some(error),
                };
            }
            self.buffer.push(byte);
        }

        Decoded { items, error: None }
    }

    /// Decode whatever is left once the stream has ended
    pub fn finish(&mut self) -> Decoded<T> {
        match self.take_line() {
            Ok(last) => Decoded {
                items: last.into_iter().collect(),
                error: None,
            },
            Err(e) => Decoded::failed(e),
        }
    }

    /// Current buffer size
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    fn take_line(&mut self) -> Result<Option<T>> {
        let line = std::mem::take(&mut self.buffer);
        let text = std::str::from_utf8(&line)
            .map_err(|e| ProxyError::JsonParseError(format!("Invalid UTF-8: {}", e)))?
            .trim();

        if text.is_empty() {
            return Ok(None);
        }

        serde_json::from_str(text)
            .map(Some)
            .map_err(|e| ProxyError::JsonParseError(format!("{}: {}", e, text)))
    }
}

impl<T: DeserializeOwned> Default for NdjsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}
