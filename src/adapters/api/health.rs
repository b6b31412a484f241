//! Liveness, readiness and metrics endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::IntoResponse;
use tracing::error;

use super::AppState;

/// Liveness probe: 200 while the process is running.
pub async fn liveness() -> impl IntoResponse {
  (StatusCode::OK, "OK")
}

/// Readiness probe: 200 once any snapshot set (live, cached or
/// fallback) is being served.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
  if state.handle.state().assets.is_empty() {
    (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
  } else {
    (StatusCode::OK, "READY")
  }
}

/// Prometheus text exposition.
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
  match state.metrics.render() {
    Ok(body) => (
      StatusCode::OK,
      [(CONTENT_TYPE, "text/plain; version=0.0.4")],
      body,
    )
      .into_response(),
    Err(e) => {
      error!(error = %e, "Failed to render metrics");
      StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
  }
}
