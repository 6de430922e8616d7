//! Model availability: make sure the required model is installed

use crate::bootstrap::process::ProcessControl;
use crate::errors::{ProxyError, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Source of installed model names
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    async fn installed_models(&self) -> Result<Vec<String>>;
}

/// Downloads a model by exact name, blocking until done
#[async_trait]
pub trait ModelPuller: Send + Sync {
    async fn pull(&self, model: &str) -> Result<()>;
}

/// Where the required model stands after a check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelStatus {
    /// Already installed (possibly under a longer tag)
    Installed,
    /// Was missing and has been downloaded
    Pulled,
    /// Was missing and the download failed
    PullFailed(String),
    /// The installed list could not be read
    CheckFailed(String),
}

impl ModelStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ModelStatus::Installed | ModelStatus::Pulled)
    }
}

/// Substring match, so "qwen2.5:3b" is satisfied by "qwen2.5:3b-instruct"
pub fn model_matches(required: &str, installed: &str) -> bool {
    installed.contains(required)
}

/// Pulls through `<executable> pull <model>`
pub struct CliPuller {
    process: Arc<dyn ProcessControl>,
    executable: String,
}

impl CliPuller {
    pub fn new(process: Arc<dyn ProcessControl>, executable: impl Into<String>) -> Self {
        Self {
            process,
            executable: executable.into(),
        }
    }
}

#[async_trait]
impl ModelPuller for CliPuller {
    async fn pull(&self, model: &str) -> Result<()> {
        let status = self
            .process
            .run(&self.executable, &["pull", model])
            .await
            .map_err(|e| ProxyError::ModelPullFailed {
                model: model.to_string(),
                reason: format!("{}: {}", self.executable, e),
            })?;

        if status.success {
            Ok(())
        } else {
            Err(ProxyError::ModelPullFailed {
                model: model.to_string(),
                reason: status.to_string(),
            })
        }
    }
}

/// Checks the installed list and pulls the model when missing
pub struct ModelChecker<'a> {
    catalog: &'a dyn ModelCatalog,
    puller: &'a dyn ModelPuller,
    model: &'a str,
}

impl<'a> ModelChecker<'a> {
    pub fn new(catalog: &'a dyn ModelCatalog, puller: &'a dyn ModelPuller, model: &'a str) -> Self {
        Self {
            catalog,
            puller,
            model,
        }
    }

    /// Ensure the model is present. Failures are logged and reported in
    /// the returned status, never raised.
    pub async fn ensure(&self) -> ModelStatus {
        tracing::info!(model = self.model, "checking if model is available");

        let installed = match self.catalog.installed_models().await {
            Ok(installed) => installed,
            Err(e) => {
                tracing::error!(model = self.model, error = %e, "could not list installed models");
                return ModelStatus::CheckFailed(e.to_string());
            }
        };

        if let Some(found) = installed.iter().find(|name| model_matches(self.model, name)) {
            tracing::info!(model = self.model, installed = %found, "model is ready");
            return ModelStatus::Installed;
        }

        tracing::warn!(
            model = self.model,
            "model not found, downloading now (this may take a while)"
        );
        match self.puller.pull(self.model).await {
            Ok(()) => {
                tracing::info!(model = self.model, "model downloaded");
                ModelStatus::Pulled
            }
            Err(e) => {
                tracing::error!(model = self.model, error = %e, "model download failed");
                ModelStatus::PullFailed(e.to_string())
            }
        }
    }
}
