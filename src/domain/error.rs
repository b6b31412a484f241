//! Fetch error taxonomy.
//!
//! Every failure is non-fatal: the supervisor records a user-facing
//! message and retries. `Display` is for logs, `user_message` is what the
//! consumer API shows in its `error` field.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("offline: no network connectivity")]
    Offline,

    #[error("rate limited by upstream (HTTP 429)")]
    RateLimited,

    #[error("upstream returned HTTP {0}")]
    HttpError(u16),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Request cancelled by a newer one or by teardown. Never shown to users.
    #[error("request aborted")]
    Aborted,
}

/// Result alias for data-source calls.
pub type FetchResult<T> = Result<T, FetchError>;

impl FetchError {
    /// Message for the `error` field of the published state.
    pub fn user_message(&self) -> String {
        match self {
            Self::Offline => {
                "You are offline. Showing the last available market data.".to_string()
            }
            Self::RateLimited => {
                "The market data provider is rate-limiting requests. Retrying with a longer delay."
                    .to_string()
            }
            Self::HttpError(status) => format!(
                "Market data request failed with status {status}. Retrying automatically."
            ),
            Self::Timeout(_) => {
                "The market data request timed out. Retrying automatically.".to_string()
            }
            Self::NetworkFailure(_) | Self::Aborted => {
                "Could not reach the market data provider. Retrying automatically.".to_string()
            }
            Self::InvalidPayload(_) => {
                "The market data provider returned an unexpected response. Retrying automatically."
                    .to_string()
            }
        }
    }

    /// Short label for metrics and structured logs.
    pub const fn outcome_label(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::RateLimited => "rate_limited",
            Self::HttpError(_) => "http_error",
            Self::Timeout(_) => "timeout",
            Self::NetworkFailure(_) => "network",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::Aborted => "aborted",
        }
    }
}
