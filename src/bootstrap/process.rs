//! Process control for the Ollama executable
//!
//! Two capabilities: start a long-lived process that is fully detached from
//! ours, and run a command to completion. The detach strategy is chosen per
//! platform at compile time.
//!
//! A detached child is never killed or supervised, but a background task
//! waits on it so an early exit does not leave a zombie behind. Spawning
//! therefore needs a running tokio runtime.

use async_trait::async_trait;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Exit outcome of a command run to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandStatus {
    pub success: bool,
    pub code: Option<i32>,
}

impl CommandStatus {
    pub fn success() -> Self {
        Self {
            success: true,
            code: Some(0),
        }
    }

    pub fn failure(code: i32) -> Self {
        Self {
            success: false,
            code: Some(code),
        }
    }
}

impl From<ExitStatus> for CommandStatus {
    fn from(status: ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
        }
    }
}

impl std::fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit status {}", code),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// Spawns and runs external commands
#[async_trait]
pub trait ProcessControl: Send + Sync {
    /// Start `program args..` detached: no inherited stdio, own process
    /// group or console, never killed by us.
    fn spawn_detached(&self, program: &str, args: &[&str]) -> io::Result<()>;

    /// Run `program args..` to completion with the terminal inherited.
    async fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandStatus>;

    /// Run to completion with stdout and stderr discarded
    async fn run_quiet(&self, program: &str, args: &[&str]) -> io::Result<CommandStatus> {
        self.run(program, args).await
    }
}

/// Real processes on the host OS
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcess;

#[async_trait]
impl ProcessControl for SystemProcess {
    fn spawn_detached(&self, program: &str, args: &[&str]) -> io::Result<()> {
        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null());
        detach(&mut command);

        let mut child = command.spawn()?;
        tracing::debug!(pid = child.id(), program, "spawned detached process");

        let program = program.to_string();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => tracing::warn!(%program, %status, "detached process exited"),
                Err(e) => tracing::debug!(%program, error = %e, "could not wait on detached process"),
            }
        });
        Ok(())
    }

    async fn run(&self, program: &str, args: &[&str]) -> io::Result<CommandStatus> {
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .status()
            .await?;
        Ok(status.into())
    }

    async fn run_quiet(&self, program: &str, args: &[&str]) -> io::Result<CommandStatus> {
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;
        Ok(status.into())
    }
}

#[cfg(unix)]
fn detach(command: &mut Command) {
    command
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0);
}

#[cfg(windows)]
fn detach(command: &mut Command) {
    const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;
    command.creation_flags(CREATE_NEW_CONSOLE);
}

#[cfg(not(any(unix, windows)))]
fn detach(command: &mut Command) {
    command.stdout(Stdio::null()).stderr(Stdio::null());
}

/// Sleeps between polls
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
