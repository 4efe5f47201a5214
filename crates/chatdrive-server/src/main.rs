//! ChatDrive daemon - chat-to-Google-Drive upload service
//!
//! This binary serves:
//! - The chat platform webhook (`POST /`)
//! - The OAuth redirect target (`GET /oauth/callback`)
//! - A background sweeper for abandoned authorization states
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! Configuration is loaded from YAML, overridden from the environment, and
//! validated before anything is opened. The accept loop and the sweeper
//! share a `CancellationToken` that is triggered on receipt of SIGTERM or
//! SIGINT.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chatdrive_core::config::{Config, LoggingConfig};
use chatdrive_server::sweeper::run_state_sweeper;
use chatdrive_server::{AppContext, WebServer};

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "chatdrived", version, about = "Chat-to-Google-Drive upload service")]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

/// Loads the configuration file and applies environment overrides
///
/// An explicitly given path must exist. The default path is optional.
fn load_config(path: Option<&PathBuf>) -> Result<(Config, PathBuf)> {
    let (mut config, path) = match path {
        Some(path) => (
            Config::load(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            path.clone(),
        ),
        None => {
            let path = Config::default_path();
            (Config::load_or_default(&path), path)
        }
    };
    config.apply_env();
    Ok((config, path))
}

/// Initializes tracing; `RUST_LOG` takes precedence over the config level
fn init_tracing(logging: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, config_path) = load_config(args.config.as_ref())?;

    init_tracing(&config.logging);
    info!(config_path = %config_path.display(), "ChatDrive daemon starting (chatdrived)");

    let problems = config.validate();
    if !problems.is_empty() {
        for problem in &problems {
            error!(field = %problem.field, "Invalid configuration: {}", problem.message);
        }
        anyhow::bail!("Configuration has {} problem(s)", problems.len());
    }
    if args.check {
        info!("Configuration is valid");
        return Ok(());
    }

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let listen = config.server.listen.clone();
    let ttl = config.storage.state_ttl();
    let sweep_interval = config.storage.sweep_interval();

    let ctx = Arc::new(AppContext::build(config).await?);

    let sweeper = tokio::spawn(run_state_sweeper(
        Arc::clone(&ctx.states),
        ttl,
        sweep_interval,
        shutdown_token.clone(),
    ));

    let server = WebServer::new(Arc::clone(&ctx), &listen)?;
    let result = server.run(shutdown_token.clone()).await;

    // A bind failure must also stop the sweeper
    shutdown_token.cancel();
    if let Err(e) = sweeper.await {
        error!(error = %e, "State sweeper task failed");
    }
    ctx.close().await;

    match &result {
        Ok(()) => info!("ChatDrive daemon shut down gracefully"),
        Err(e) => error!(error = %e, "ChatDrive daemon exiting with error"),
    }

    result
}
