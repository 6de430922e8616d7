//! Wire types for the Ollama REST API
//!
//! Only the fields ollamaproxy reads are modelled; everything else the
//! server sends is ignored.

use serde::{Deserialize, Serialize};

/// Information about an installed model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model name (e.g., "qwen2.5:3b")
    pub name: String,

    /// Model size in bytes
    #[serde(default)]
    pub size: Option<u64>,
}

/// Response from Ollama /api/tags endpoint
#[derive(Debug, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

/// Response from Ollama /api/version endpoint
#[derive(Debug, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

/// Request body for /api/pull
#[derive(Debug, Serialize)]
pub struct PullRequest<'a> {
    pub model: &'a str,
    pub stream: bool,
}

/// Progress update during model pull operation
#[derive(Debug, Clone, Deserialize)]
pub struct PullProgress {
    /// Status message
    #[serde(default)]
    pub status: String,

    /// Digest being pulled
    #[serde(default)]
    pub digest: Option<String>,

    /// Total bytes to download
    #[serde(default)]
    pub total: Option<u64>,

    /// Bytes completed
    #[serde(default)]
    pub completed: Option<u64>,

    /// Set when the server aborted the pull
    #[serde(default)]
    pub error: Option<String>,
}

impl PullProgress {
    /// Completion percentage, when the server reported sizes
    pub fn percentage(&self) -> Option<f64> {
        match (self.completed, self.total) {
            (Some(completed), Some(total)) if total > 0 => {
                Some((completed as f64 / total as f64) * 100.0)
            }
            _ => None,
        }
    }

    /// Short layer id from the digest, e.g. "a8b0c5157701"
    pub fn layer(&self) -> Option<&str> {
        let digest = self.digest.as_deref()?;
        let hex = digest.strip_prefix("sha256:").unwrap_or(digest);
        Some(hex.get(..12).unwrap_or(hex))
    }
}

/// Chat role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Sampling options forwarded to the model
#[derive(Debug, Clone, Serialize)]
pub struct ChatOptions {
    pub temperature: f32,
}

/// Request body for /api/chat
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ChatOptions>,
}

/// One NDJSON line of a streamed /api/chat response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub message: Option<ChatMessage>,

    #[serde(default)]
    pub done: bool,

    #[serde(default)]
    pub error: Option<String>,
}

impl ChatChunk {
    /// Token text carried by this chunk, if any
    pub fn content(&self) -> Option<&str> {
        self.message
            .as_ref()
            .map(|m| m.content.as_str())
            .filter(|c| !c.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_models_response_ignores_extra_fields() {
        let body = r#"{"models":[{"name":"qwen2.5:3b","model":"qwen2.5:3b","size":1929912432,"details":{"family":"qwen2"}}]}"#;
        let parsed: ModelsResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.models.len(), 1);
        assert_eq!(parsed.models[0].name, "qwen2.5:3b");
        assert_eq!(parsed.models[0].size, Some(1929912432));
    }

    #[test]
    fn test_models_response_requires_name() {
        let body = r#"{"models":[{"model":"qwen2.5:3b"}]}"#;
        assert!(serde_json::from_str::<ModelsResponse>(body).is_err());
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: "qwen2.5:3b".to_string(),
            messages: vec![ChatMessage::system("be brief"), ChatMessage::user("hi")],
            stream: true,
            options: Some(ChatOptions { temperature: 0.7 }),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
        assert_eq!(json["stream"], true);
        assert!(json["options"]["temperature"].is_number());
    }

    #[test]
    fn test_chat_chunk_content() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"model":"m","message":{"role":"assistant","content":"Hel"},"done":false}"#,
        )
        .unwrap();
        assert_eq!(chunk.content(), Some("Hel"));
        assert!(!chunk.done);

        let last: ChatChunk = serde_json::from_str(
            r#"{"model":"m","message":{"role":"assistant","content":""},"done":true}"#,
        )
        .unwrap();
        assert_eq!(last.content(), None);
        assert!(last.done);
    }

    #[test]
    fn test_pull_progress_percentage() {
        let progress: PullProgress = serde_json::from_str(
            r#"{"status":"pulling abc","digest":"sha256:abc","total":200,"completed":50}"#,
        )
        .unwrap();
        assert_eq!(progress.percentage(), Some(25.0));

        let status_only: PullProgress = serde_json::from_str(r#"{"status":"success"}"#).unwrap();
        assert_eq!(status_only.percentage(), None);
    }

    #[test]
    fn test_pull_progress_layer() {
        let progress: PullProgress = serde_json::from_str(
            r#"{"status":"pulling a8b0c5157701","digest":"sha256:a8b0c51577010a72a3b4b2c0d5a0e5d6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b1c2"}"#,
        )
        .unwrap();
        assert_eq!(progress.layer(), Some("a8b0c5157701"));

        let short: PullProgress =
            serde_json::from_str(r#"{"status":"pulling","digest":"sha256:abc"}"#).unwrap();
        assert_eq!(short.layer(), Some("abc"));

        let none: PullProgress = serde_json::from_str(r#"{"status":"success"}"#).unwrap();
        assert_eq!(none.layer(), None);
    }
}
