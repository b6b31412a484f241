//! Shared HTTP plumbing for market data sources.
//!
//! Maps transport, status and decode failures onto `FetchError` so every
//! source reports failures the same way.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::{FetchError, FetchResult};

/// Build an HTTP client with a whole-request timeout.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .pool_max_idle_per_host(2)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Send `request` and decode a JSON body, abandoning it when `cancel` fires.
pub async fn get_json<T: DeserializeOwned>(
    request: RequestBuilder,
    cancel: &CancellationToken,
    timeout: Duration,
) -> FetchResult<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(FetchError::Aborted),
        result = send_and_decode(request, timeout) => result,
    }
}

async fn send_and_decode<T: DeserializeOwned>(
    request: RequestBuilder,
    timeout: Duration,
) -> FetchResult<T> {
    let response = request
        .send()
        .await
        .map_err(|e| classify_transport(&e, timeout))?;

    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::RateLimited);
    }
    if !status.is_success() {
        return Err(FetchError::HttpError(status.as_u16()));
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| classify_transport(&e, timeout))?;
    debug!(bytes = body.len(), "Response body received");

    serde_json::from_slice(&body).map_err(|e| FetchError::InvalidPayload(e.to_string()))
}

fn classify_transport(err: &reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(timeout)
    } else if err.is_decode() {
        FetchError::InvalidPayload(err.to_string())
    } else {
        FetchError::NetworkFailure(err.to_string())
    }
}

/// Parse a numeric string field, `None` when malformed or non-finite.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
