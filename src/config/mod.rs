//! Configuration Module - TOML-based Service Configuration
//!
//! Loads and validates configuration from `config.toml`. Every section
//! has defaults, so an empty file yields a working CoinGecko deployment.
//! Endpoints, delays and cache policy are externalized here - nothing is
//! hardcoded in the supervisor.

pub mod loader;

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
  /// Service identity and logging.
  #[serde(default)]
  pub app: AppSection,
  /// Upstream market data source.
  #[serde(default)]
  pub source: SourceConfig,
  /// Retry delay bounds.
  #[serde(default)]
  pub backoff: BackoffConfig,
  /// Durable snapshot cache.
  #[serde(default)]
  pub cache: CacheConfig,
  /// Online/offline detection.
  #[serde(default)]
  pub connectivity: ConnectivityConfig,
  /// Consumer API, health and metrics server.
  #[serde(default)]
  pub server: ServerConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
  /// Human-readable service name.
  #[serde(default = "default_name")]
  pub name: String,
  /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins.
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// Which upstream shape this deployment consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
  /// Asset-listing API (`/coins/markets`).
  #[default]
  Coingecko,
  /// Exchange 24h ticker API with synthetic names.
  Binance,
}

/// Market data source configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
  /// Active source.
  #[serde(default)]
  pub kind: SourceKind,
  /// Base URL override. Each kind has its own public default.
  pub base_url: Option<String>,
  /// Request timeout in seconds.
  #[serde(default = "default_timeout")]
  pub timeout_seconds: u64,
  /// Quote currency for the listing API.
  #[serde(default = "default_vs_currency")]
  pub vs_currency: String,
  /// Page size for the listing API.
  #[serde(default = "default_per_page")]
  pub per_page: u32,
  /// Optional demo API key for the listing API.
  pub api_key: Option<String>,
  /// Quote asset kept from the ticker API (e.g. USDT).
  #[serde(default = "default_quote_asset")]
  pub quote_asset: String,
  /// Maximum number of ticker pairs kept.
  #[serde(default = "default_ticker_limit")]
  pub limit: usize,
  /// Extra symbol -> display name entries for the ticker API.
  #[serde(default)]
  pub names: HashMap<String, String>,
}

/// Retry delay bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffConfig {
  /// Floor, also the steady-state refresh interval (seconds).
  #[serde(default = "default_initial_delay")]
  pub initial_delay_seconds: u64,
  /// Ceiling, applied immediately on HTTP 429 (seconds).
  #[serde(default = "default_max_delay")]
  pub max_delay_seconds: u64,
}

/// Snapshot cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Persist snapshots to disk. In-memory only when false.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Directory holding the cache file.
  #[serde(default = "default_data_dir")]
  pub data_dir: String,
  /// Fixed cache key (file name).
  #[serde(default = "default_cache_key")]
  pub key: String,
  /// Expiration window (seconds).
  #[serde(default = "default_cache_ttl")]
  pub ttl_seconds: u64,
}

/// Connectivity detection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectivityConfig {
  /// Poll a probe URL. When false the service assumes it is online.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// URL probed with HEAD; any HTTP response counts as online.
  #[serde(default = "default_probe_url")]
  pub probe_url: String,
  /// Probe interval (seconds).
  #[serde(default = "default_probe_interval")]
  pub interval_seconds: u64,
  /// Probe timeout (seconds).
  #[serde(default = "default_probe_timeout")]
  pub timeout_seconds: u64,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  /// Serve the consumer API, /live, /ready and /metrics.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Bind address.
  #[serde(default = "default_bind_address")]
  pub bind_address: String,
}

impl SourceConfig {
  /// Configured base URL or the public default for the kind.
  pub fn resolved_base_url(&self) -> String {
    self.base_url.clone().unwrap_or_else(|| {
      match self.kind {
        SourceKind::Coingecko => "https://api.coingecko.com/api/v3",
        SourceKind::Binance => "https://api.binance.com",
      }
      .to_string()
    })
  }

  pub const fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_seconds)
  }
}

impl BackoffConfig {
  pub const fn initial_delay(&self) -> Duration {
    Duration::from_secs(self.initial_delay_seconds)
  }

  pub const fn max_delay(&self) -> Duration {
    Duration::from_secs(self.max_delay_seconds)
  }
}

impl CacheConfig {
  pub fn ttl(&self) -> chrono::Duration {
    i64::try_from(self.ttl_seconds)
      .ok()
      .and_then(chrono::Duration::try_seconds)
      .unwrap_or(chrono::Duration::MAX)
  }
}

impl ConnectivityConfig {
  pub const fn interval(&self) -> Duration {
    Duration::from_secs(self.interval_seconds)
  }

  pub const fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_seconds)
  }
}

impl Default for AppSection {
  fn default() -> Self {
    Self {
      name: default_name(),
      log_level: default_log_level(),
    }
  }
}

impl Default for SourceConfig {
  fn default() -> Self {
    Self {
      kind: SourceKind::default(),
      base_url: None,
      timeout_seconds: default_timeout(),
      vs_currency: default_vs_currency(),
      per_page: default_per_page(),
      api_key: None,
      quote_asset: default_quote_asset(),
      limit: default_ticker_limit(),
      names: HashMap::new(),
    }
  }
}

impl Default for BackoffConfig {
  fn default() -> Self {
    Self {
      initial_delay_seconds: default_initial_delay(),
      max_delay_seconds: default_max_delay(),
    }
  }
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      data_dir: default_data_dir(),
      key: default_cache_key(),
      ttl_seconds: default_cache_ttl(),
    }
  }
}

impl Default for ConnectivityConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      probe_url: default_probe_url(),
      interval_seconds: default_probe_interval(),
      timeout_seconds: default_probe_timeout(),
    }
  }
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      bind_address: default_bind_address(),
    }
  }
}

// Default value functions for serde

fn default_name() -> String {
  "coinwatch".to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

const fn default_true() -> bool {
  true
}

const fn default_timeout() -> u64 {
  15
}

fn default_vs_currency() -> String {
  "usd".to_string()
}

const fn default_per_page() -> u32 {
  100
}

fn default_quote_asset() -> String {
  "USDT".to_string()
}

const fn default_ticker_limit() -> usize {
  100
}

const fn default_initial_delay() -> u64 {
  60
}

const fn default_max_delay() -> u64 {
  300
}

fn default_data_dir() -> String {
  "data".to_string()
}

fn default_cache_key() -> String {
  "market_cache.json".to_string()
}

const fn default_cache_ttl() -> u64 {
  300 // 5 minutes
}

fn default_probe_url() -> String {
  "https://api.coingecko.com/api/v3/ping".to_string()
}

const fn default_probe_interval() -> u64 {
  30
}

const fn default_probe_timeout() -> u64 {
  5
}

fn default_bind_address() -> String {
  "0.0.0.0:8080".to_string()
}
