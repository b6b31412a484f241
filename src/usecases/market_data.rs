//! Market Data Supervisor - Fetch, Cache and Retry State Machine
//!
//! Owns the published `MarketState` and every transition applied to it:
//! 1. Seeds assets from a fresh cache record at construction
//! 2. Starts a cycle: skip when offline, otherwise issue a fetch ticket
//!    that supersedes (cancels) any request still in flight
//! 3. Completes a cycle: applies the result only if its ticket is still
//!    current, updates backoff, persists successful snapshots
//! 4. Never replaces a non-empty snapshot set with an empty one
//!
//! The struct does no scheduling of its own. `refresh_loop` drives it
//! from a tokio task; tests drive it step by step with `run_cycle`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::config::AppConfig;
use crate::domain::{
  fallback_assets, Asset, CacheRecord, FetchError, FetchResult, RetryBackoff,
};
use crate::ports::{AssetDataSource, SnapshotCache};

/// State exposed to consumers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MarketState {
  /// Current snapshot set (live, cached or fallback).
  pub assets: Vec<Asset>,
  /// True only while a foreground fetch is running.
  pub is_loading: bool,
  /// Last user-facing failure message.
  pub error: Option<String>,
  /// Time of the last successful fetch (or of the seeding cache record).
  pub last_updated: Option<DateTime<Utc>>,
}

/// Whether a cycle was user-initiated/initial or a silent refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleKind {
  Foreground,
  Background,
}

/// Handle for one outstanding request.
#[derive(Debug, Clone)]
pub struct FetchTicket {
  /// Monotonic request number; only the latest may be applied.
  pub generation: u64,
  pub kind: CycleKind,
  /// Cancelled when superseded, on going offline, or on teardown.
  pub cancel: CancellationToken,
}

/// Result of starting a cycle.
#[derive(Debug)]
pub enum CycleStart {
  /// Go fetch; hand the result back to `complete_cycle`.
  Fetch(FetchTicket),
  /// Offline: no network attempt was made.
  Skipped(CycleReport),
  /// Supervisor has been torn down.
  Stopped,
}

/// Result of finishing a cycle.
#[derive(Debug)]
pub enum CycleEnd {
  /// State was updated; schedule the next cycle after `next_delay`.
  Completed(CycleReport),
  /// Result discarded: a newer request or teardown replaced it.
  Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
  /// Failure of this cycle, `None` on success.
  pub error: Option<FetchError>,
  /// Delay before the next background cycle.
  pub next_delay: Duration,
}

/// Connectivity transition outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityChange {
  /// Came online: pending timers must be dropped and a foreground
  /// cycle started immediately.
  Online,
  /// Went offline: pending timers and the in-flight request are void.
  Offline,
  Unchanged,
}

/// Tunables for the supervisor.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorSettings {
  pub initial_delay: Duration,
  pub max_delay: Duration,
  pub cache_ttl: chrono::Duration,
}

impl SupervisorSettings {
  pub fn from_config(config: &AppConfig) -> Self {
    Self {
      initial_delay: config.backoff.initial_delay(),
      max_delay: config.backoff.max_delay(),
      cache_ttl: config.cache.ttl(),
    }
  }
}

impl Default for SupervisorSettings {
  fn default() -> Self {
    Self {
      initial_delay: Duration::from_secs(60),
      max_delay: Duration::from_secs(300),
      cache_ttl: chrono::Duration::minutes(5),
    }
  }
}

/// Market data supervisor state machine.
pub struct MarketDataSupervisor {
  /// Upstream market data adapter.
  source: Arc<dyn AssetDataSource>,
  /// Durable snapshot cache adapter.
  cache: Arc<dyn SnapshotCache>,
  /// Retry delay state.
  backoff: RetryBackoff,
  /// Cache expiration window.
  cache_ttl: chrono::Duration,
  /// Published state.
  state_tx: watch::Sender<MarketState>,
  /// Latest connectivity observation.
  online: bool,
  /// Last issued ticket number.
  generation: u64,
  /// The single outstanding request, if any.
  in_flight: Option<FetchTicket>,
  /// Parent of every request token; cancelled on teardown.
  root: CancellationToken,
  disposed: bool,
}

impl MarketDataSupervisor {
  /// Create a supervisor, seeding state from a fresh cache record.
  #[instrument(skip_all, fields(source = source.name()))]
  pub async fn new(
    source: Arc<dyn AssetDataSource>,
    cache: Arc<dyn SnapshotCache>,
    settings: SupervisorSettings,
  ) -> Self {
    let (state_tx, _) = watch::channel(MarketState::default());

    let supervisor = Self {
      source,
      cache,
      backoff: RetryBackoff::new(settings.initial_delay, settings.max_delay),
      cache_ttl: settings.cache_ttl,
      state_tx,
      online: true,
      generation: 0,
      in_flight: None,
      root: CancellationToken::new(),
      disposed: false,
    };

    if let Some(record) = supervisor.load_fresh_cache().await {
      info!(
        assets = record.assets.len(),
        timestamp_ms = record.timestamp_ms,
        "Seeded market state from cache"
      );
      let last_updated = record.fetched_at();
      supervisor.state_tx.send_modify(|state| {
        state.assets = record.assets;
        state.last_updated = last_updated;
      });
    }

    supervisor
  }

  /// Synchronous read of the current state.
  pub fn state(&self) -> MarketState {
    self.state_tx.borrow().clone()
  }

  /// Receiver notified on every state change.
  pub fn subscribe(&self) -> watch::Receiver<MarketState> {
    self.state_tx.subscribe()
  }

  /// Current backoff interval.
  pub const fn retry_delay(&self) -> Duration {
    self.backoff.current()
  }

  pub const fn is_online(&self) -> bool {
    self.online
  }

  pub const fn is_disposed(&self) -> bool {
    self.disposed
  }

  /// Provider name of the wired data source.
  pub fn source_name(&self) -> &'static str {
    self.source.name()
  }

  /// Start a cycle.
  ///
  /// Cancels any outstanding request first. Offline cycles record the
  /// offline notice and keep existing assets.
  pub async fn begin_cycle(&mut self, kind: CycleKind) -> CycleStart {
    if self.disposed {
      return CycleStart::Stopped;
    }

    self.cancel_in_flight();

    if !self.online {
      self.state_tx.send_modify(|state| {
        state.error = Some(FetchError::Offline.user_message());
        state.is_loading = false;
      });
      self.substitute_if_empty().await;
      debug!(?kind, "Offline, skipping network fetch");
      return CycleStart::Skipped(CycleReport {
        error: Some(FetchError::Offline),
        next_delay: self.backoff.current(),
      });
    }

    self.generation += 1;
    let ticket = FetchTicket {
      generation: self.generation,
      kind,
      cancel: self.root.child_token(),
    };
    self.in_flight = Some(ticket.clone());

    if kind == CycleKind::Foreground {
      self.state_tx.send_modify(|state| {
        state.is_loading = true;
        state.error = None;
      });
    }

    debug!(generation = ticket.generation, ?kind, "Fetch cycle started");
    CycleStart::Fetch(ticket)
  }

  /// Apply the result of a ticket's request.
  ///
  /// Results for superseded or cancelled tickets are dropped untouched.
  pub async fn complete_cycle(
    &mut self,
    ticket: &FetchTicket,
    result: FetchResult<Vec<Asset>>,
  ) -> CycleEnd {
    let current = self
      .in_flight
      .as_ref()
      .is_some_and(|t| t.generation == ticket.generation);

    if self.disposed || !current || ticket.cancel.is_cancelled() {
      debug!(generation = ticket.generation, "Discarding superseded result");
      return CycleEnd::Superseded;
    }
    self.in_flight = None;

    let result = match result {
      Ok(assets) if assets.is_empty() => {
        Err(FetchError::InvalidPayload("empty snapshot set".to_string()))
      }
      other => other,
    };

    match result {
      Ok(assets) => CycleEnd::Completed(self.apply_success(assets).await),
      Err(err) => CycleEnd::Completed(self.apply_failure(err).await),
    }
  }

  /// Run one full cycle inline: begin, fetch, complete.
  pub async fn run_cycle(&mut self, kind: CycleKind) -> CycleEnd {
    match self.begin_cycle(kind).await {
      CycleStart::Fetch(ticket) => {
        let result = execute_fetch(Arc::clone(&self.source), ticket.cancel.clone()).await;
        self.complete_cycle(&ticket, result).await
      }
      CycleStart::Skipped(report) => CycleEnd::Completed(report),
      CycleStart::Stopped => CycleEnd::Superseded,
    }
  }

  /// Record a connectivity observation.
  pub fn set_online(&mut self, online: bool) -> ConnectivityChange {
    if self.disposed || online == self.online {
      return ConnectivityChange::Unchanged;
    }
    self.online = online;

    if online {
      let delay = self.backoff.reset();
      info!(retry_delay_s = delay.as_secs(), "Connectivity restored");
      ConnectivityChange::Online
    } else {
      self.cancel_in_flight();
      self.state_tx.send_modify(|state| {
        state.error = Some(FetchError::Offline.user_message());
        state.is_loading = false;
      });
      warn!("Connectivity lost, network fetches paused");
      ConnectivityChange::Offline
    }
  }

  /// Tear down: abort the outstanding request and freeze state.
  pub fn dispose(&mut self) {
    if self.disposed {
      return;
    }
    self.disposed = true;
    self.root.cancel();
    self.in_flight = None;
    info!("Market data supervisor disposed");
  }

  /// Fetch future for a ticket, detached from `self` so it can be spawned.
  pub fn fetch_for(
    &self,
    ticket: &FetchTicket,
  ) -> impl Future<Output = FetchResult<Vec<Asset>>> + Send + use<> {
    execute_fetch(Arc::clone(&self.source), ticket.cancel.clone())
  }

  async fn apply_success(&mut self, assets: Vec<Asset>) -> CycleReport {
    let now = Utc::now();
    let next_delay = self.backoff.reset();
    let count = assets.len();
    let record = CacheRecord::new(assets.clone(), now);

    self.state_tx.send_modify(|state| {
      state.assets = assets;
      state.last_updated = Some(now);
      state.error = None;
      state.is_loading = false;
    });

    if let Err(e) = self.cache.store(&record).await {
      warn!(error = %e, "Failed to persist market snapshot");
    }

    info!(
      source = self.source.name(),
      assets = count,
      next_delay_s = next_delay.as_secs(),
      "Market data refreshed"
    );

    CycleReport {
      error: None,
      next_delay,
    }
  }

  async fn apply_failure(&mut self, err: FetchError) -> CycleReport {
    let next_delay = match err {
      FetchError::RateLimited => self.backoff.on_rate_limited(),
      FetchError::Offline => self.backoff.current(),
      _ => self.backoff.on_failure(),
    };

    let message = err.user_message();
    self.state_tx.send_modify(|state| {
      state.error = Some(message);
      state.is_loading = false;
    });
    self.substitute_if_empty().await;

    warn!(
      source = self.source.name(),
      error = %err,
      outcome = err.outcome_label(),
      next_delay_s = next_delay.as_secs(),
      "Market data fetch failed"
    );

    CycleReport {
      error: Some(err),
      next_delay,
    }
  }

  /// Keep the UI populated: fresh cache first, then the fallback set.
  async fn substitute_if_empty(&mut self) {
    if !self.state_tx.borrow().assets.is_empty() {
      return;
    }

    let (assets, last_updated) = match self.load_fresh_cache().await {
      Some(record) => {
        let fetched_at = record.fetched_at();
        (record.assets, fetched_at)
      }
      None => (fallback_assets(), None),
    };

    info!(assets = assets.len(), cached = last_updated.is_some(), "Substituting snapshot");
    self.state_tx.send_modify(|state| {
      state.assets = assets;
      if last_updated.is_some() {
        state.last_updated = last_updated;
      }
    });
  }

  async fn load_fresh_cache(&self) -> Option<CacheRecord> {
    match self.cache.load().await {
      Ok(Some(record)) if record.assets.is_empty() => None,
      Ok(Some(record)) if record.is_fresh(Utc::now(), self.cache_ttl) => Some(record),
      Ok(Some(record)) => {
        debug!(timestamp_ms = record.timestamp_ms, "Cached snapshot expired");
        None
      }
      Ok(None) => None,
      Err(e) => {
        warn!(error = %e, "Failed to read market snapshot cache");
        None
      }
    }
  }

  fn cancel_in_flight(&mut self) {
    if let Some(ticket) = self.in_flight.take() {
      debug!(generation = ticket.generation, "Cancelling in-flight request");
      ticket.cancel.cancel();
    }
  }
}

/// One upstream request, aborted as soon as `cancel` fires.
async fn execute_fetch(
  source: Arc<dyn AssetDataSource>,
  cancel: CancellationToken,
) -> FetchResult<Vec<Asset>> {
  tokio::select! {
    biased;
    () = cancel.cancelled() => Err(FetchError::Aborted),
    result = source.fetch_assets(&cancel) => result,
  }
}
