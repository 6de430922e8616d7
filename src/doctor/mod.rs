//! Doctor command - read-only health checks
//!
//! Reports on the same things the bootstrap takes care of, without
//! launching or pulling anything.

use crate::bootstrap::{
    model_matches, HealthProbe, HealthState, HttpProbe, ModelCatalog, ProcessControl,
    SystemProcess,
};
use crate::cli::config::Config;
use crate::errors::Result;
use crate::ollama::OllamaClient;
use colored::Colorize;
use std::io;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warning,
    Fail,
}

impl CheckStatus {
    fn symbol(&self) -> &str {
        match self {
            Self::Pass => "✓",
            Self::Warning => "⚠",
            Self::Fail => "✗",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub latency_ms: Option<u64>,
}

impl HealthCheck {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            latency_ms: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthReport {
    pub checks: Vec<HealthCheck>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        !self.checks.iter().any(|c| c.status == CheckStatus::Fail)
    }

    pub fn print(&self) {
        println!("\n{}\n", "ollamaproxy health check".bold());

        for check in &self.checks {
            let symbol = match check.status {
                CheckStatus::Pass => check.status.symbol().green(),
                CheckStatus::Warning => check.status.symbol().yellow(),
                CheckStatus::Fail => check.status.symbol().red(),
            };
            let latency = check
                .latency_ms
                .map(|ms| format!(" ({}ms)", ms))
                .unwrap_or_default();

            println!(
                "  {} {:<20} {}{}",
                symbol,
                format!("{}:", check.name),
                check.message,
                latency
            );
        }

        println!();

        if self.is_healthy() {
            println!("  {}\n", "All checks passed".green());
        } else {
            println!("  {}\n", "Some checks failed".red());
        }
    }
}

pub struct Doctor {
    probe: Arc<dyn HealthProbe>,
    catalog: Arc<dyn ModelCatalog>,
    process: Arc<dyn ProcessControl>,
    client: OllamaClient,
    model: String,
    executable: String,
}

impl Doctor {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = OllamaClient::new(config.ollama_url())?;
        Ok(Self {
            probe: Arc::new(HttpProbe::new(
                config.ollama_url(),
                config.bootstrap.probe_timeout(),
            )?),
            catalog: Arc::new(client.clone()),
            process: Arc::new(SystemProcess),
            client,
            model: config.ollama.model.clone(),
            executable: config.ollama.executable.clone(),
        })
    }

    pub fn with_components(
        probe: Arc<dyn HealthProbe>,
        catalog: Arc<dyn ModelCatalog>,
        process: Arc<dyn ProcessControl>,
        client: OllamaClient,
        model: impl Into<String>,
        executable: impl Into<String>,
    ) -> Self {
        Self {
            probe,
            catalog,
            process,
            client,
            model: model.into(),
            executable: executable.into(),
        }
    }

    pub async fn run_checks(&self) -> HealthReport {
        let checks = vec![
            self.check_executable().await,
            self.check_ollama_api().await,
            self.check_model().await,
        ];

        HealthReport { checks }
    }

    async fn check_executable(&self) -> HealthCheck {
        const NAME: &str = "Executable";

        match self.process.run_quiet(&self.executable, &["--version"]).await {
            Ok(status) if status.success => {
                HealthCheck::new(NAME, CheckStatus::Pass, format!("'{}' runs", self.executable))
            }
            Ok(status) => HealthCheck::new(
                NAME,
                CheckStatus::Warning,
                format!("'{} --version' failed ({})", self.executable, status),
            ),
            Err(e) if e.kind() == io::ErrorKind::NotFound => HealthCheck::new(
                NAME,
                CheckStatus::Fail,
                format!("'{}' not found - install from https://ollama.com", self.executable),
            ),
            Err(e) => HealthCheck::new(
                NAME,
                CheckStatus::Fail,
                format!("'{}' cannot run: {}", self.executable, e),
            ),
        }
    }

    async fn check_ollama_api(&self) -> HealthCheck {
        const NAME: &str = "Ollama API";
        let start = Instant::now();

        match self.probe.probe().await {
            HealthState::Reachable => {
                let latency = start.elapsed().as_millis() as u64;
                let version = self
                    .client
                    .version()
                    .await
                    .unwrap_or_else(|_| "unknown".to_string());

                HealthCheck {
                    latency_ms: Some(latency),
                    ..HealthCheck::new(NAME, CheckStatus::Pass, format!("Running (v{})", version))
                }
            }
            HealthState::Unhealthy(status) => HealthCheck::new(
                NAME,
                CheckStatus::Fail,
                format!("Answering with HTTP {}", status),
            ),
            HealthState::Unreachable => HealthCheck::new(
                NAME,
                CheckStatus::Warning,
                format!("Not reachable - will start '{} serve' on launch", self.executable),
            ),
        }
    }

    async fn check_model(&self) -> HealthCheck {
        const NAME: &str = "Model";

        match self.catalog.installed_models().await {
            Ok(installed) => match installed.iter().find(|name| model_matches(&self.model, name)) {
                Some(found) => HealthCheck::new(NAME, CheckStatus::Pass, format!("{} installed", found)),
                None => HealthCheck::new(
                    NAME,
                    CheckStatus::Warning,
                    format!("{} not found - will auto-pull on launch", self.model),
                ),
            },
            Err(e) => HealthCheck::new(NAME, CheckStatus::Warning, format!("Could not check: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::CommandStatus;
    use crate::errors::ProxyError;
    use async_trait::async_trait;

    struct FixedProbe(HealthState);

    #[async_trait]
    impl HealthProbe for FixedProbe {
        async fn probe(&self) -> HealthState {
            self.0
        }
    }

    struct FixedCatalog(Option<Vec<&'static str>>);

    #[async_trait]
    impl ModelCatalog for FixedCatalog {
        async fn installed_models(&self) -> Result<Vec<String>> {
            match &self.0 {
                Some(models) => Ok(models.iter().map(|m| m.to_string()).collect()),
                None => Err(ProxyError::OllamaApiError("connection refused".to_string())),
            }
        }
    }

    struct FixedRun(Option<CommandStatus>);

    #[async_trait]
    impl ProcessControl for FixedRun {
        fn spawn_detached(&self, _program: &str, _args: &[&str]) -> io::Result<()> {
            unreachable!("doctor never spawns")
        }

        async fn run(&self, _program: &str, _args: &[&str]) -> io::Result<CommandStatus> {
            unreachable!("doctor runs commands quietly")
        }

        async fn run_quiet(&self, _program: &str, _args: &[&str]) -> io::Result<CommandStatus> {
            self.0.ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }
    }

    fn doctor(probe: HealthState, catalog: Option<Vec<&'static str>>, run: Option<CommandStatus>) -> Doctor {
        Doctor::with_components(
            Arc::new(FixedProbe(probe)),
            Arc::new(FixedCatalog(catalog)),
            Arc::new(FixedRun(run)),
            OllamaClient::new("http://127.0.0.1:9").unwrap(),
            "qwen2.5:3b",
            "ollama",
        )
    }

    #[test]
    fn test_check_status_symbols() {
        assert_eq!(CheckStatus::Pass.symbol(), "✓");
        assert_eq!(CheckStatus::Warning.symbol(), "⚠");
        assert_eq!(CheckStatus::Fail.symbol(), "✗");
    }

    #[test]
    fn test_health_report_unhealthy() {
        let report = HealthReport {
            checks: vec![
                HealthCheck::new("A", CheckStatus::Pass, "OK"),
                HealthCheck::new("B", CheckStatus::Fail, "Failed"),
            ],
        };
        assert!(!report.is_healthy());
    }

    #[tokio::test]
    async fn test_stopped_server_with_executable_is_healthy() {
        let report = doctor(HealthState::Unreachable, None, Some(CommandStatus::success()))
            .run_checks()
            .await;

        assert!(report.is_healthy());
        assert_eq!(report.checks[0].status, CheckStatus::Pass);
        assert_eq!(report.checks[1].status, CheckStatus::Warning);
        assert_eq!(report.checks[2].status, CheckStatus::Warning);
    }

    #[tokio::test]
    async fn test_failing_version_is_warning() {
        let report = doctor(HealthState::Reachable, Some(vec!["qwen2.5:3b"]), Some(CommandStatus::failure(2)))
            .run_checks()
            .await;

        assert_eq!(report.checks[0].status, CheckStatus::Warning);
        assert!(report.checks[0].message.contains("exit status 2"));
    }

    #[tokio::test]
    async fn test_missing_executable_fails() {
        let report = doctor(HealthState::Unreachable, None, None).run_checks().await;

        assert!(!report.is_healthy());
        assert!(report.checks[0].message.contains("not found"));
    }

    #[tokio::test]
    async fn test_model_substring_match() {
        let report = doctor(
            HealthState::Reachable,
            Some(vec!["qwen2.5:3b-instruct-q4_K_M"]),
            Some(CommandStatus::success()),
        )
        .run_checks()
        .await;

        assert!(report.is_healthy());
        assert_eq!(report.checks[1].status, CheckStatus::Pass);
        assert!(report.checks[1].latency_ms.is_some());
        assert_eq!(report.checks[2].status, CheckStatus::Pass);
        assert!(report.checks[2].message.contains("qwen2.5:3b-instruct-q4_K_M"));
    }

    #[tokio::test]
    async fn test_unhealthy_server_fails() {
        let report = doctor(HealthState::Unhealthy(500), Some(vec![]), Some(CommandStatus::success()))
            .run_checks()
            .await;

        assert!(!report.is_healthy());
        assert!(report.checks[1].message.contains("500"));
    }
}
