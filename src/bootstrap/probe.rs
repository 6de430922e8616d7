//! Health probe for the Ollama server

use crate::errors::{ProxyError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::time::Duration;

/// Result of a single probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// Server answered with a success status
    Reachable,
    /// Nothing answered: refused, timed out, DNS, reset...
    Unreachable,
    /// Something answered with a non-success HTTP status
    Unhealthy(u16),
}

impl HealthState {
    pub fn is_reachable(&self) -> bool {
        matches!(self, HealthState::Reachable)
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Reachable => write!(f, "reachable"),
            HealthState::Unreachable => write!(f, "unreachable"),
            HealthState::Unhealthy(status) => write!(f, "unhealthy (HTTP {})", status),
        }
    }
}

/// Answers whether the inference server currently accepts requests.
///
/// Implementations never fail: every outcome maps onto a [`HealthState`].
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self) -> HealthState;
}

/// Probe that lists models over HTTP with a short timeout
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    tags_url: String,
}

impl HttpProbe {
    /// Create a probe for `base_url` with a per-request `timeout`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProxyError::HttpError)?;

        Ok(Self {
            client,
            tags_url: format!("{}/api/tags", base_url.trim_end_matches('/')),
        })
    }

    /// URL hit by each probe
    pub fn url(&self) -> &str {
        &self.tags_url
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    async fn probe(&self) -> HealthState {
        match self.client.get(&self.tags_url).send().await {
            Ok(response) if response.status().is_success() => HealthState::Reachable,
            Ok(response) => {
                tracing::debug!(url = %self.tags_url, status = %response.status(), "probe answered with error status");
                HealthState::Unhealthy(response.status().as_u16())
            }
            Err(e) => {
                tracing::debug!(url = %self.tags_url, error = %e, "probe failed");
                HealthState::Unreachable
            }
        }
    }
}
