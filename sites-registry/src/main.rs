//! sites-registry - station registry HTTP service
//!
//! Serves the station/platform/instrument/ROI registry over HTTP, backed by
//! a SQLite database inside the resolved root folder.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use sites_common::config::{self, TomlConfig};
use sites_common::db::init_database;
use sites_registry::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for sites-registry
#[derive(Parser, Debug)]
#[command(name = "sites-registry")]
#[command(about = "Station registry service for SITES Spectral")]
#[command(version)]
struct Args {
    /// Root folder holding the registry database
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Bootstrap TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = config::resolve_config_path(args.config.as_deref());
    let config_result = TomlConfig::load(&config_path);
    let log_level = config_result
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("sites_registry={0},sites_common={0},tower_http={0}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting SITES station registry (sites-registry) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let toml_config = config_result
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;
    info!("Config file: {}", config_path.display());

    let root_folder = config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
    let db_path = config::database_path(&root_folder, &toml_config);
    info!("Root folder: {}", root_folder.display());
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;
    info!("✓ Database ready");

    let app = build_router(AppState::new(pool));

    let port = args.port.unwrap_or(toml_config.port);
    let addr = format!("{}:{}", toml_config.bind_address, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("sites-registry listening on http://{}", addr);
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
            Ok(mut stream) => {
                stream.recv().await;
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
