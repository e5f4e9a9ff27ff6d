//! Skin Records - Entry Point
//!
//! Initializes configuration, logging, the record store and the media
//! directory, then serves the record API until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config.toml (or $SKIN_RECORDS_CONFIG) + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Open SQLite record store (creates table on first run)
//! 4. Open local blob store under the media root
//! 5. Build RecordService + axum router (/api, /media, /live, /ready)
//! 6. Spawn HTTP server
//! 7. Wait for SIGINT → readiness 503 → drain requests → exit

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};

use skin_records::adapters::blobs::LocalBlobStore;
use skin_records::adapters::http::{HttpServer, build_app};
use skin_records::adapters::persistence::{SqliteRecordStore, StoreSchema};
use skin_records::config;
use skin_records::usecases::RecordService;

/// Upper bound on draining in-flight requests after SIGINT.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = config::loader::config_path();
    let config = config::loader::load_config(&config_path)
        .context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(&config.server.log_level)
                }),
        )
        .json()
        .init();

    info!(
        name = %config.server.name,
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path,
        bind = %config.server.bind_address,
        "Starting skin records service"
    );

    // ── 3. Record store ─────────────────────────────────────
    let schema = StoreSchema::new(&config.database.table)
        .context("Invalid database table name")?;
    let store = Arc::new(
        SqliteRecordStore::open(&config.database.path, schema)
            .context("Failed to open record store")?,
    );

    // ── 4. Blob store ───────────────────────────────────────
    let blobs = Arc::new(
        LocalBlobStore::new(&config.media.root, &config.media.upload_dir)
            .await
            .context("Failed to open media directory")?,
    );

    // ── 5. Service + router ─────────────────────────────────
    let service = Arc::new(RecordService::new(store, Arc::clone(&blobs)));

    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);
    let (ready_tx, ready_rx) = watch::channel(true);

    let app = build_app(&config, service, blobs.root(), ready_rx)
        .context("Failed to build HTTP application")?;

    // ── 6. Spawn HTTP server ────────────────────────────────
    let server = HttpServer::new(app, config.server.bind_address.clone());
    let server_shutdown = shutdown_tx.subscribe();
    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = server.run(server_shutdown).await {
            error!(error = %e, "HTTP server failed");
        }
    });

    // ── 7. Wait for SIGINT (or an early server exit) ────────
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("SIGINT received, initiating graceful shutdown");
        }
        _ = &mut server_handle => {
            warn!("HTTP server exited before shutdown signal");
            return Ok(());
        }
    }

    // Readiness probe → 503 while connections drain
    let _ = ready_tx.send(false);
    let _ = shutdown_tx.send(());
    info!("Shutdown signal broadcast");

    if tokio::time::timeout(SHUTDOWN_GRACE, server_handle).await.is_err() {
        warn!(grace_secs = SHUTDOWN_GRACE.as_secs(), "In-flight requests did not drain in time");
    }

    info!("Shutdown complete");
    Ok(())
}
