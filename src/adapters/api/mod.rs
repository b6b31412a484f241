//! Consumer API Adapter - axum HTTP Surface
//!
//! Exposes the supervisor's state and derived views to consumers, plus
//! operational endpoints:
//! - `GET /api/market`: full state
//! - `POST /api/market/refresh`: manual refresh (202)
//! - `GET /api/market/table`: filtered/sorted/searched tracker table
//! - `GET /api/market/ticker`: marquee entries
//! - `GET /api/market/:id`: single asset
//! - `GET /live`, `GET /ready`, `GET /metrics`

pub mod health;
pub mod market;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::adapters::metrics::MetricsRegistry;
use crate::usecases::SupervisorHandle;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
  pub handle: Arc<SupervisorHandle>,
  pub metrics: Arc<MetricsRegistry>,
}

/// Build the full router.
pub fn router(state: AppState) -> Router {
  Router::new()
    .route("/api/market", get(market::snapshot))
    .route("/api/market/refresh", post(market::refresh))
    .route("/api/market/table", get(market::table))
    .route("/api/market/ticker", get(market::ticker))
    .route("/api/market/:id", get(market::asset_detail))
    .route("/live", get(health::liveness))
    .route("/ready", get(health::readiness))
    .route("/metrics", get(health::metrics))
    .with_state(state)
}

/// Serve the router until `shutdown` is cancelled.
#[instrument(skip(state, shutdown))]
pub async fn serve(state: AppState, bind_address: String, shutdown: CancellationToken) -> Result<()> {
  let listener = tokio::net::TcpListener::bind(&bind_address)
    .await
    .with_context(|| format!("Failed to bind {bind_address}"))?;
  info!(address = %bind_address, "API server started");

  axum::serve(listener, router(state))
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
    .context("API server failed")?;

  info!("API server stopped");
  Ok(())
}
