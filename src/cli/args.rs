//! Command-line argument parsing for ollamaproxy
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use crate::cli::config::Config;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ollamaproxy - Stream chat replies from a local Ollama model over HTTP
#[derive(Parser, Debug)]
#[command(name = "ollamaproxy")]
#[command(version)]
#[command(about = "Stream chat replies from a local Ollama model over HTTP", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Ollama base URL
    #[arg(long, global = true)]
    pub ollama_url: Option<String>,

    /// Model that must be installed before serving
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Ollama executable used for `serve` and `pull`
    #[arg(long, global = true)]
    pub executable: Option<String>,

    /// Listen host
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Listen port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (warnings and errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Ensure Ollama is ready, then serve the chat endpoint (default)
    Serve {
        /// Skip the startup lifecycle checks
        #[arg(long)]
        no_bootstrap: bool,
    },

    /// Run the startup lifecycle checks and exit
    Bootstrap,

    /// Run read-only diagnostics
    Doctor,

    /// List models installed on the Ollama server
    Models,

    /// Display the effective configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Subcommand to run, `serve` when none was given
    pub fn command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Serve { no_bootstrap: false })
    }

    /// Overlay explicit flags onto a loaded configuration
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(url) = &self.ollama_url {
            config.ollama.base_url = url.clone();
        }
        if let Some(model) = &self.model {
            config.ollama.model = model.clone();
        }
        if let Some(executable) = &self.executable {
            config.ollama.executable = executable.clone();
        }
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}

impl Verbosity {
    /// Default tracing filter directive for this level
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "warn",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
            Verbosity::VeryVerbose => "trace",
        }
    }
}
