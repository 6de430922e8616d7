//! Server launcher: start `ollama serve` detached and wait until it answers

use crate::bootstrap::probe::HealthProbe;
use crate::bootstrap::process::{ProcessControl, Sleeper};
use crate::errors::{ProxyError, Result};
use std::io;
use std::time::Duration;

/// How a launch ended when the executable could be started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Reachable on probe number `attempts`
    Started { attempts: u32 },
    /// Still not reachable after `attempts` probes
    LaunchFailed { attempts: u32 },
}

/// Starts the server and polls it into readiness
pub struct ServerLauncher<'a> {
    process: &'a dyn ProcessControl,
    probe: &'a dyn HealthProbe,
    sleeper: &'a dyn Sleeper,
    executable: &'a str,
    poll_interval: Duration,
    max_attempts: u32,
}

impl<'a> ServerLauncher<'a> {
    pub fn new(
        process: &'a dyn ProcessControl,
        probe: &'a dyn HealthProbe,
        sleeper: &'a dyn Sleeper,
        executable: &'a str,
    ) -> Self {
        Self {
            process,
            probe,
            sleeper,
            executable,
            poll_interval: Duration::from_secs(1),
            max_attempts: 20,
        }
    }

    /// Set probe spacing and probe budget
    pub fn with_polling(mut self, poll_interval: Duration, max_attempts: u32) -> Self {
        self.poll_interval = poll_interval;
        self.max_attempts = max_attempts;
        self
    }

    /// Spawn `<executable> serve` and poll until reachable or out of attempts
    ///
    /// # Errors
    /// - `ExecutableNotFound` when the executable does not exist
    /// - `LaunchFailed` when it exists but could not be started
    pub async fn launch(&self) -> Result<LaunchOutcome> {
        tracing::info!("Ollama server not running, starting it in the background");

        if let Err(e) = self.process.spawn_detached(self.executable, &["serve"]) {
            return Err(if e.kind() == io::ErrorKind::NotFound {
                ProxyError::ExecutableNotFound {
                    executable: self.executable.to_string(),
                }
            } else {
                ProxyError::LaunchFailed(format!("{}: {}", self.executable, e))
            });
        }

        Ok(self.wait_until_ready().await)
    }

    /// Probe at fixed spacing, at most `max_attempts` times
    pub async fn wait_until_ready(&self) -> LaunchOutcome {
        for attempt in 1..=self.max_attempts {
            let state = self.probe.probe().await;
            if state.is_reachable() {
                tracing::info!(attempts = attempt, "Ollama server started");
                return LaunchOutcome::Started { attempts: attempt };
            }
            tracing::debug!(attempt, max = self.max_attempts, %state, "waiting for Ollama server");
            self.sleeper.sleep(self.poll_interval).await;
        }

        tracing::warn!(
            "Ollama server did not become ready after {} attempts. Run '{} serve' manually",
            self.max_attempts,
            self.executable
        );
        LaunchOutcome::LaunchFailed {
            attempts: self.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::probe::HealthState;
    use crate::bootstrap::process::CommandStatus;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Reachable from probe `ready_on` onwards; 0 means never
    struct CountingProbe {
        ready_on: u32,
        calls: AtomicU32,
    }

    impl CountingProbe {
        fn new(ready_on: u32) -> Self {
            Self {
                ready_on,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl HealthProbe for CountingProbe {
        async fn probe(&self) -> HealthState {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.ready_on != 0 && call >= self.ready_on {
                HealthState::Reachable
            } else {
                HealthState::Unreachable
            }
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    struct StubProcess {
        spawn_error: Option<io::ErrorKind>,
        spawned: Mutex<Vec<String>>,
    }

    impl StubProcess {
        fn ok() -> Self {
            Self {
                spawn_error: None,
                spawned: Mutex::new(Vec::new()),
            }
        }

        fn failing(kind: io::ErrorKind) -> Self {
            Self {
                spawn_error: Some(kind),
                spawned: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ProcessControl for StubProcess {
        fn spawn_detached(&self, program: &str, args: &[&str]) -> io::Result<()> {
            if let Some(kind) = self.spawn_error {
                return Err(io::Error::from(kind));
            }
            self.spawned
                .lock()
                .unwrap()
                .push(format!("{} {}", program, args.join(" ")));
            Ok(())
        }

        async fn run(&self, _program: &str, _args: &[&str]) -> io::Result<CommandStatus> {
            Ok(CommandStatus::success())
        }
    }

    #[tokio::test]
    async fn test_never_ready_probes_exactly_twenty_times() {
        let process = StubProcess::ok();
        let probe = CountingProbe::new(0);
        let sleeper = RecordingSleeper::default();

        let outcome = ServerLauncher::new(&process, &probe, &sleeper, "ollama")
            .launch()
            .await
            .unwrap();

        assert_eq!(outcome, LaunchOutcome::LaunchFailed { attempts: 20 });
        assert_eq!(probe.calls.load(Ordering::SeqCst), 20);
        let sleeps = sleeper.sleeps.lock().unwrap();
        assert_eq!(sleeps.len(), 20);
        assert!(sleeps.iter().all(|d| *d == Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_ready_on_third_poll() {
        let process = StubProcess::ok();
        let probe = CountingProbe::new(3);
        let sleeper = RecordingSleeper::default();

        let outcome = ServerLauncher::new(&process, &probe, &sleeper, "ollama")
            .launch()
            .await
            .unwrap();

        assert_eq!(outcome, LaunchOutcome::Started { attempts: 3 });
        assert_eq!(sleeper.sleeps.lock().unwrap().len(), 2);
        assert_eq!(*process.spawned.lock().unwrap(), vec!["ollama serve".to_string()]);
    }

    #[tokio::test]
    async fn test_custom_polling() {
        let process = StubProcess::ok();
        let probe = CountingProbe::new(0);
        let sleeper = RecordingSleeper::default();

        let outcome = ServerLauncher::new(&process, &probe, &sleeper, "ollama")
            .with_polling(Duration::from_millis(250), 4)
            .launch()
            .await
            .unwrap();

        assert_eq!(outcome, LaunchOutcome::LaunchFailed { attempts: 4 });
        assert_eq!(
            *sleeper.sleeps.lock().unwrap(),
            vec![Duration::from_millis(250); 4]
        );
    }

    #[tokio::test]
    async fn test_missing_executable_is_fatal_error() {
        let process = StubProcess::failing(io::ErrorKind::NotFound);
        let probe = CountingProbe::new(1);
        let sleeper = RecordingSleeper::default();

        let err = ServerLauncher::new(&process, &probe, &sleeper, "ollama")
            .launch()
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::ExecutableNotFound { ref executable } if executable == "ollama"));
        assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_other_spawn_errors_are_launch_failures() {
        let process = StubProcess::failing(io::ErrorKind::PermissionDenied);
        let probe = CountingProbe::new(1);
        let sleeper = RecordingSleeper::default();

        let err = ServerLauncher::new(&process, &probe, &sleeper, "ollama")
            .launch()
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::LaunchFailed(_)));
    }
}
