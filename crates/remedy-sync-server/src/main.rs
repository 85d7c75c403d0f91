//! remedy-sync server
//!
//! The family backend for remedy-sync devices: keeps each family's member
//! list and shared remedy inventory in SQLite and serves them over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use remedy_sync_server::{api, db::Database, AppState};

/// remedy-sync server - Family inventory backend
#[derive(Parser, Debug)]
#[command(name = "remedy-sync-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Data directory for persistence
    #[arg(long, default_value = "/data", env = "REMEDY_SYNC_DATA_DIR")]
    data_dir: PathBuf,

    /// HTTP API port
    #[arg(long, default_value = "8080", env = "REMEDY_SYNC_API_PORT")]
    api_port: u16,

    /// Log level
    #[arg(long, default_value = "info", env = "REMEDY_SYNC_LOG_LEVEL")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Starting remedy-sync server");
    info!(data_dir = %args.data_dir.display(), "Data directory");

    tokio::fs::create_dir_all(&args.data_dir)
        .await
        .context("Failed to create data directory")?;

    let db_path = args.data_dir.join("families.db");
    let db = Arc::new(Database::open(&db_path).context("Failed to open database")?);
    info!(path = %db_path.display(), "Database initialized");

    let state = Arc::new(AppState { db });

    let api_addr: SocketAddr = ([0, 0, 0, 0], args.api_port).into();
    let app = api::router(state);

    info!(addr = %api_addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(api_addr)
        .await
        .context("Failed to bind API server")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")?;

    info!("remedy-sync server shutting down");
    Ok(())
}

/// Wait for ctrl-c
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c, running until killed: {e}");
        std::future::pending::<()>().await;
    }
    info!("Received ctrl-c, initiating graceful shutdown");
}
