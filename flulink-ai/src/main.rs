//! flulink-ai - FluLink AI Inference Service
//!
//! Serves embeddings, similar-user lookups, toxicity (virality) scoring and
//! spread prediction. Heavy resources load in the background after the
//! listener is up; until they are ready, and whenever they fail, requests are
//! answered by the fallback paths.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use flulink_ai::config::{resolve_config, AiTomlConfig};
use flulink_ai::AppState;
use flulink_common::config::{load_module_config, load_toml_config, ConfigFileResolver};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for flulink-ai
#[derive(Parser, Debug)]
#[command(name = "flulink-ai")]
#[command(about = "FluLink AI inference service")]
#[command(version)]
struct Args {
    /// Configuration file (overrides the default search path)
    #[arg(short, long, env = "FLULINK_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level when RUST_LOG is not set
    #[arg(long)]
    log_level: Option<String>,

    /// Fail requests instead of serving fallback results
    #[arg(long)]
    disable_fallback: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config first: the log level may come from it
    let toml_config: Option<AiTomlConfig> = match &args.config {
        Some(path) => Some(
            load_toml_config(path)
                .with_context(|| format!("Failed to load config file {}", path.display()))?,
        ),
        None => load_module_config(&ConfigFileResolver::new("flulink-ai"))
            .context("Failed to load config file")?,
    };

    let mut config = resolve_config(toml_config).context("Invalid configuration")?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.disable_fallback {
        config.fallback.fallback_enabled = false;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("flulink_ai={0},flulink_common={0},tower_http=info", config.logging.level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting flulink-ai (AI Inference) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    if !config.fallback.fallback_enabled {
        warn!("Fallback disabled: requests fail while resources are unavailable");
    }

    let state = AppState::from_config(&config).context("Failed to build application state")?;

    // Resources load in the background; a failure never blocks startup
    let lifecycle = state.lifecycle.clone();
    tokio::spawn(async move {
        lifecycle.initialize().await;
    });

    let app = flulink_ai::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
