//! Coinwatch - Entry Point
//!
//! Wires configuration, logging, adapters and the market data
//! supervisor, then serves the consumer API until SIGINT.
//!
//! Wiring sequence:
//! 1. Load config (`COINWATCH_CONFIG` or config.toml) + validate
//! 2. Init tracing (JSON structured logging)
//! 3. Build the configured data source and snapshot cache
//! 4. Start connectivity detection (probe or always-online)
//! 5. Create the supervisor (seeds from a fresh cache record)
//! 6. Spawn the refresh loop (initial foreground fetch)
//! 7. Spawn the API server (/api/market, /live, /ready, /metrics)
//! 8. Wait for SIGINT, then tear everything down

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use coinwatch::adapters::api::{self, AppState};
use coinwatch::adapters::connectivity::{ConnectivityMonitor, ManualConnectivity};
use coinwatch::adapters::metrics::MetricsRegistry;
use coinwatch::adapters::persistence::{FileSnapshotCache, MemoryCache};
use coinwatch::adapters::sources::build_source;
use coinwatch::config::{self, AppConfig};
use coinwatch::ports::{ConnectivitySignal, SnapshotCache};
use coinwatch::usecases::{MarketDataSupervisor, SupervisorHandle, SupervisorSettings};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path =
        std::env::var("COINWATCH_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let config = config::loader::load_config(&config_path)
        .with_context(|| format!("Failed to load configuration from {config_path}"))?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.app.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.app.name,
        version = env!("CARGO_PKG_VERSION"),
        source = ?config.source.kind,
        "Starting coinwatch"
    );

    let shutdown = CancellationToken::new();

    // ── 3. Data source and snapshot cache ───────────────────
    let source = build_source(&config.source).context("Failed to build market data source")?;
    let cache = build_cache(&config).await?;

    // ── 4. Connectivity detection ───────────────────────────
    let (connectivity, monitor_handle) = build_connectivity(&config, &shutdown)?;

    // ── 5-6. Supervisor and refresh loop ────────────────────
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);
    let supervisor =
        MarketDataSupervisor::new(source, cache, SupervisorSettings::from_config(&config)).await;
    let handle = Arc::new(SupervisorHandle::spawn(
        supervisor,
        connectivity.as_ref(),
        Some(Arc::clone(&metrics)),
    ));

    // ── 7. API server ───────────────────────────────────────
    let server_handle = if config.server.enabled {
        let state = AppState {
            handle: Arc::clone(&handle),
            metrics: Arc::clone(&metrics),
        };
        let bind_address = config.server.bind_address.clone();
        let server_shutdown = shutdown.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = api::serve(state, bind_address, server_shutdown).await {
                error!(error = %e, "API server task failed");
            }
        }))
    } else {
        warn!("API server disabled, state is only observable through logs");
        None
    };

    info!("All tasks spawned, coinwatch is running");

    // ── 8. Wait for SIGINT ──────────────────────────────────
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for SIGINT, shutting down");
    }
    info!("SIGINT received, initiating graceful shutdown");

    handle.dispose().await;
    shutdown.cancel();

    for task in [server_handle, monitor_handle].into_iter().flatten() {
        if tokio::time::timeout(Duration::from_secs(5), task).await.is_err() {
            warn!("Task did not stop within 5s");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// File-backed cache when enabled, process-local otherwise.
async fn build_cache(config: &AppConfig) -> Result<Arc<dyn SnapshotCache>> {
    if !config.cache.enabled {
        info!("Snapshot cache persistence disabled, using memory");
        return Ok(Arc::new(MemoryCache::new()));
    }
    let cache = FileSnapshotCache::new(&config.cache.data_dir, &config.cache.key)
        .await
        .context("Failed to open snapshot cache")?;
    info!(path = %cache.path().display(), "Snapshot cache ready");
    Ok(Arc::new(cache))
}

/// Probe-driven connectivity when enabled, always-online otherwise.
fn build_connectivity(
    config: &AppConfig,
    shutdown: &CancellationToken,
) -> Result<(Arc<dyn ConnectivitySignal>, Option<tokio::task::JoinHandle<()>>)> {
    if !config.connectivity.enabled {
        info!("Connectivity probe disabled, assuming online");
        let always_online: Arc<dyn ConnectivitySignal> = Arc::new(ManualConnectivity::new(true));
        return Ok((always_online, None));
    }
    let monitor = Arc::new(
        ConnectivityMonitor::new(&config.connectivity)
            .context("Failed to create connectivity monitor")?,
    );
    let task = monitor.spawn(shutdown.clone());
    let signal: Arc<dyn ConnectivitySignal> = monitor;
    Ok((signal, Some(task)))
}
