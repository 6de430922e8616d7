//! Bootstrap system - Ollama lifecycle management
//!
//! Runs once before the HTTP listener binds:
//! 1. probe the server
//! 2. launch `ollama serve` detached when nothing answers
//! 3. make sure the required model is installed, pulling it if needed
//!
//! Only a missing executable is fatal. Everything else degrades to a logged
//! warning and the proxy starts anyway.

pub mod launcher;
pub mod models;
pub mod probe;
pub mod process;

pub use launcher::{LaunchOutcome, ServerLauncher};
pub use models::{model_matches, CliPuller, ModelCatalog, ModelChecker, ModelPuller, ModelStatus};
pub use probe::{HealthProbe, HealthState, HttpProbe};
pub use process::{CommandStatus, ProcessControl, Sleeper, SystemProcess, TokioSleeper};

use crate::cli::config::{Config, PullMethod};
use crate::errors::{ProxyError, Result};
use crate::ollama::OllamaClient;
use std::sync::Arc;
use std::time::Duration;

/// Fixed inputs of a bootstrap run
#[derive(Debug, Clone)]
pub struct BootstrapSettings {
    pub executable: String,
    pub model: String,
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl BootstrapSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            executable: config.ollama.executable.clone(),
            model: config.ollama.model.clone(),
            poll_interval: config.bootstrap.poll_interval(),
            max_attempts: config.bootstrap.max_attempts,
        }
    }
}

/// Server side of the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    /// Reachable on the first probe, nothing launched
    AlreadyRunning,
    /// Something answers on the port with an error status; not launched
    Unhealthy(u16),
    /// Launched and reachable after `attempts` probes
    Started { attempts: u32 },
    /// Launched but never reachable
    LaunchFailed { attempts: u32 },
    /// Executable exists but could not be started
    SpawnFailed(String),
}

impl ServerStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, ServerStatus::AlreadyRunning | ServerStatus::Started { .. })
    }
}

/// Outcome of a completed bootstrap run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub server: ServerStatus,
    pub model: ModelStatus,
}

impl BootstrapReport {
    /// Server up and model present
    pub fn is_ready(&self) -> bool {
        self.server.is_running() && self.model.is_ready()
    }
}

/// Ollama lifecycle manager
pub struct Bootstrap {
    settings: BootstrapSettings,
    probe: Arc<dyn HealthProbe>,
    process: Arc<dyn ProcessControl>,
    catalog: Arc<dyn ModelCatalog>,
    puller: Arc<dyn ModelPuller>,
    sleeper: Arc<dyn Sleeper>,
}

impl Bootstrap {
    /// Wire the production backends from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let process: Arc<dyn ProcessControl> = Arc::new(SystemProcess);
        let client = Arc::new(OllamaClient::new(config.ollama_url())?);
        let puller: Arc<dyn ModelPuller> = match config.bootstrap.pull_method {
            PullMethod::Cli => Arc::new(CliPuller::new(
                process.clone(),
                config.ollama.executable.clone(),
            )),
            PullMethod::Api => client.clone(),
        };

        Ok(Self {
            settings: BootstrapSettings::from_config(config),
            probe: Arc::new(HttpProbe::new(
                config.ollama_url(),
                config.bootstrap.probe_timeout(),
            )?),
            process,
            catalog: client,
            puller,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Assemble from explicit components
    pub fn with_components(
        settings: BootstrapSettings,
        probe: Arc<dyn HealthProbe>,
        process: Arc<dyn ProcessControl>,
        catalog: Arc<dyn ModelCatalog>,
        puller: Arc<dyn ModelPuller>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            settings,
            probe,
            process,
            catalog,
            puller,
            sleeper,
        }
    }

    pub fn settings(&self) -> &BootstrapSettings {
        &self.settings
    }

    /// Run the startup sequence once
    ///
    /// # Errors
    /// Only `ExecutableNotFound`; the caller is expected to exit on it.
    pub async fn run(&self) -> Result<BootstrapReport> {
        let server = self.ensure_server().await?;
        if !server.is_running() {
            tracing::warn!(?server, "continuing without a healthy Ollama server");
        }

        let model = ModelChecker::new(
            self.catalog.as_ref(),
            self.puller.as_ref(),
            &self.settings.model,
        )
        .ensure()
        .await;

        let report = BootstrapReport { server, model };
        if report.is_ready() {
            tracing::info!(model = %self.settings.model, "bootstrap complete");
        } else {
            tracing::warn!(?report, "bootstrap finished in a degraded state");
        }
        Ok(report)
    }

    async fn ensure_server(&self) -> Result<ServerStatus> {
        match self.probe.probe().await {
            HealthState::Reachable => {
                tracing::info!("Ollama server is running");
                Ok(ServerStatus::AlreadyRunning)
            }
            HealthState::Unhealthy(status) => {
                tracing::warn!(
                    status,
                    "Ollama server answered with an error status, not launching another"
                );
                Ok(ServerStatus::Unhealthy(status))
            }
            HealthState::Unreachable => {
                let launcher = ServerLauncher::new(
                    self.process.as_ref(),
                    self.probe.as_ref(),
                    self.sleeper.as_ref(),
                    &self.settings.executable,
                )
                .with_polling(self.settings.poll_interval, self.settings.max_attempts);

                match launcher.launch().await {
                    Ok(LaunchOutcome::Started { attempts }) => Ok(ServerStatus::Started { attempts }),
                    Ok(LaunchOutcome::LaunchFailed { attempts }) => {
                        Ok(ServerStatus::LaunchFailed { attempts })
                    }
                    Err(ProxyError::LaunchFailed(reason)) => {
                        tracing::error!(%reason, "could not start Ollama server");
                        Ok(ServerStatus::SpawnFailed(reason))
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }

    /// Tell the user how to get Ollama when the executable is missing
    pub fn show_install_instructions(executable: &str) {
        eprintln!("\n❌ '{}' command not found!", executable);
        eprintln!("\nollamaproxy needs a local Ollama installation.");
        eprintln!("\n📦 Installation:");
        eprintln!("   Linux:   curl -fsSL https://ollama.com/install.sh | sh");
        eprintln!("   macOS:   brew install ollama");
        eprintln!("   Windows: https://ollama.com/download/windows");
        eprintln!("\nIf Ollama lives elsewhere, pass --executable or set OLLAMA_BIN.");
        eprintln!("\n📚 More info: https://ollama.com/download");
        eprintln!();
    }
}
