//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, validating all parameters,
//! and providing clear error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use super::AppConfig;

/// Upper bound for any configured delay, TTL or timeout (one week).
const MAX_DURATION_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Load and validate configuration from a TOML file.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let config = parse_config(&content)?;

  info!(
    source = ?config.source.kind,
    initial_delay_s = config.backoff.initial_delay_seconds,
    max_delay_s = config.backoff.max_delay_seconds,
    cache_ttl_s = config.cache.ttl_seconds,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  let config: AppConfig =
    toml::from_str(content).with_context(|| "Failed to parse config.toml")?;

  validate_config(&config)?;

  Ok(config)
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - Positive delays with initial <= max
/// - Non-empty endpoints
/// - Positive cache TTL and request timeouts
/// - Durations no longer than one week
fn validate_config(config: &AppConfig) -> Result<()> {
  // Backoff validation
  anyhow::ensure!(
    config.backoff.initial_delay_seconds > 0,
    "backoff.initial_delay_seconds must be positive"
  );
  anyhow::ensure!(
    config.backoff.initial_delay_seconds <= config.backoff.max_delay_seconds,
    "backoff.initial_delay_seconds ({}) must not exceed max_delay_seconds ({})",
    config.backoff.initial_delay_seconds,
    config.backoff.max_delay_seconds
  );
  anyhow::ensure!(
    config.backoff.max_delay_seconds <= MAX_DURATION_SECONDS,
    "backoff.max_delay_seconds must not exceed {MAX_DURATION_SECONDS}, got {}",
    config.backoff.max_delay_seconds
  );

  // Source validation
  anyhow::ensure!(
    config.source.timeout_seconds > 0 && config.source.timeout_seconds <= MAX_DURATION_SECONDS,
    "source.timeout_seconds must be in (0, {MAX_DURATION_SECONDS}], got {}",
    config.source.timeout_seconds
  );
  anyhow::ensure!(
    !config.source.resolved_base_url().trim().is_empty(),
    "source.base_url must not be empty"
  );
  anyhow::ensure!(
    config.source.per_page > 0 && config.source.per_page <= 250,
    "source.per_page must be in (0, 250], got {}",
    config.source.per_page
  );
  anyhow::ensure!(config.source.limit > 0, "source.limit must be positive");
  anyhow::ensure!(
    !config.source.quote_asset.trim().is_empty(),
    "source.quote_asset must not be empty"
  );

  // Cache validation
  anyhow::ensure!(
    config.cache.ttl_seconds > 0 && config.cache.ttl_seconds <= MAX_DURATION_SECONDS,
    "cache.ttl_seconds must be in (0, {MAX_DURATION_SECONDS}], got {}",
    config.cache.ttl_seconds
  );
  anyhow::ensure!(!config.cache.key.trim().is_empty(), "cache.key must not be empty");

  // Connectivity validation
  if config.connectivity.enabled {
    anyhow::ensure!(
      !config.connectivity.probe_url.trim().is_empty(),
      "connectivity.probe_url must not be empty when enabled"
    );
    anyhow::ensure!(
      config.connectivity.interval_seconds > 0
        && config.connectivity.interval_seconds <= MAX_DURATION_SECONDS,
      "connectivity.interval_seconds must be in (0, {MAX_DURATION_SECONDS}]"
    );
    anyhow::ensure!(
      config.connectivity.timeout_seconds > 0
        && config.connectivity.timeout_seconds <= MAX_DURATION_SECONDS,
      "connectivity.timeout_seconds must be in (0, {MAX_DURATION_SECONDS}]"
    );
  }

  // Server validation
  anyhow::ensure!(
    !config.server.enabled || !config.server.bind_address.trim().is_empty(),
    "server.bind_address must not be empty"
  );

  Ok(())
}
