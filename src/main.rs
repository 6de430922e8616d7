//! ollamaproxy - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use ollamaproxy::{
    bootstrap::{Bootstrap, BootstrapReport},
    cli::{Args, Commands, Config, Verbosity},
    doctor::Doctor,
    ollama::OllamaClient,
    proxy::{self, AppState, OllamaChat},
    ProxyError,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbosity());

    let config = load_config(&args)?;

    match args.command() {
        Commands::Serve { no_bootstrap } => run_serve(&config, no_bootstrap).await,
        Commands::Bootstrap => run_bootstrap(&config).await,
        Commands::Doctor => run_doctor(&config).await,
        Commands::Models => list_models(&config).await,
        Commands::Config => show_config(&config),
    }
}

/// RUST_LOG wins over -q/-v
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// defaults < file < environment < flags
fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref()).context("loading configuration")?;
    config.apply_env()?;
    args.apply_overrides(&mut config);
    config.validate()?;

    tracing::debug!(
        ollama = %config.ollama_url(),
        model = %config.ollama.model,
        bind = %config.bind_address(),
        "configuration loaded"
    );
    Ok(config)
}

/// Bootstrap, exiting the process when Ollama is not installed
async fn bootstrap_or_exit(config: &Config) -> Result<BootstrapReport> {
    match Bootstrap::from_config(config)?.run().await {
        Ok(report) => Ok(report),
        Err(ProxyError::ExecutableNotFound { executable }) => {
            tracing::error!(%executable, "Ollama executable not found");
            Bootstrap::show_install_instructions(&executable);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_serve(config: &Config, no_bootstrap: bool) -> Result<()> {
    if no_bootstrap {
        tracing::info!("skipping Ollama bootstrap");
    } else {
        bootstrap_or_exit(config).await?;
    }

    let backend = OllamaChat::from_config(config)?;
    tracing::info!(model = %config.ollama.model, "forwarding chat to {}", config.ollama_url());

    proxy::serve(config, AppState::new(Arc::new(backend))).await?;
    Ok(())
}

async fn run_bootstrap(config: &Config) -> Result<()> {
    let report = bootstrap_or_exit(config).await?;

    println!("  Server: {:?}", report.server);
    println!("  Model:  {:?}", report.model);

    if report.is_ready() {
        println!("\n{}\n", "✓ Ollama is ready".green());
        Ok(())
    } else {
        println!("\n{}\n", "⚠ Ollama is not fully ready".yellow());
        std::process::exit(2);
    }
}

async fn run_doctor(config: &Config) -> Result<()> {
    let doctor = Doctor::from_config(config)?;

    let report = doctor.run_checks().await;
    report.print();

    std::process::exit(if report.is_healthy() { 0 } else { 1 });
}

async fn list_models(config: &Config) -> Result<()> {
    let client = OllamaClient::new(config.ollama_url())?;

    println!("\nChecking Ollama models at {}...\n", client.base_url());

    match client.list_models().await {
        Ok(models) => {
            if models.is_empty() {
                println!("No models installed.");
                println!("\nPull a model with:");
                println!("  {} pull {}", config.ollama.executable, config.ollama.model);
            } else {
                println!("Available models:");
                for model in models {
                    let size = model
                        .size
                        .map(|bytes| format!(" ({:.1} GB)", bytes as f64 / 1e9))
                        .unwrap_or_default();
                    println!("  • {}{}", model.name, size);
                }
            }
            println!();
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("\nIs Ollama running? Start with: {} serve", config.ollama.executable);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    if let Some(path) = Config::default_path() {
        println!("# default config file: {}", path.display());
    }
    print!("{}", config.to_toml()?);
    Ok(())
}
