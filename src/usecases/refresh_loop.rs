//! Refresh Loop - Background Runtime for the Market Data Supervisor
//!
//! Owns the supervisor inside a single tokio task (event-loop style) and
//! multiplexes with `tokio::select!` over:
//! - teardown (cancellation token)
//! - `refresh()` commands from consumers
//! - connectivity transitions
//! - completion of the one in-flight fetch
//! - the retry timer
//!
//! The retry timer and the in-flight fetch are the only schedulable work
//! and both are dropped together on teardown.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::market_data::{
  ConnectivityChange, CycleEnd, CycleKind, CycleReport, CycleStart, FetchTicket,
  MarketDataSupervisor, MarketState,
};
use crate::adapters::metrics::MetricsRegistry;
use crate::domain::{Asset, FetchError, FetchResult};
use crate::ports::ConnectivitySignal;

/// Consumer commands.
#[derive(Debug, Clone, Copy)]
enum Command {
  Refresh,
}

/// Consumer handle: state reads, `refresh()`, teardown.
pub struct SupervisorHandle {
  commands: mpsc::Sender<Command>,
  state_rx: watch::Receiver<MarketState>,
  shutdown: CancellationToken,
  task: Mutex<Option<JoinHandle<()>>>,
}

impl SupervisorHandle {
  /// Spawn the background loop. The initial foreground fetch starts
  /// immediately.
  pub fn spawn(
    supervisor: MarketDataSupervisor,
    connectivity: &dyn ConnectivitySignal,
    metrics: Option<Arc<MetricsRegistry>>,
  ) -> Self {
    // One queued refresh is enough: later ones coalesce into it.
    let (commands, command_rx) = mpsc::channel(1);
    let state_rx = supervisor.subscribe();
    let shutdown = CancellationToken::new();

    let refresh_loop = RefreshLoop {
      supervisor,
      commands: command_rx,
      online_rx: connectivity.subscribe(),
      shutdown: shutdown.clone(),
      metrics,
      in_flight: None,
      next_at: None,
    };
    let task = tokio::spawn(refresh_loop.run());

    Self {
      commands,
      state_rx,
      shutdown,
      task: Mutex::new(Some(task)),
    }
  }

  /// Synchronous read of the current state.
  pub fn state(&self) -> MarketState {
    self.state_rx.borrow().clone()
  }

  /// Receiver notified on every state change.
  pub fn subscribe(&self) -> watch::Receiver<MarketState> {
    self.state_rx.clone()
  }

  /// Request an immediate foreground fetch. Returns without waiting.
  pub fn refresh(&self) {
    match self.commands.try_send(Command::Refresh) {
      Ok(()) => debug!("Refresh requested"),
      Err(mpsc::error::TrySendError::Full(_)) => debug!("Refresh already queued"),
      Err(mpsc::error::TrySendError::Closed(_)) => debug!("Refresh ignored after teardown"),
    }
  }

  pub fn is_disposed(&self) -> bool {
    self.shutdown.is_cancelled()
  }

  /// Stop the loop, abort any in-flight request and wait for the task.
  pub async fn dispose(&self) {
    self.shutdown.cancel();
    let task = self.task.lock().ok().and_then(|mut guard| guard.take());
    if let Some(task) = task {
      if let Err(e) = task.await {
        warn!(error = %e, "Refresh loop task ended abnormally");
      }
    }
  }
}

impl Drop for SupervisorHandle {
  fn drop(&mut self) {
    self.shutdown.cancel();
  }
}

/// Spawned fetch paired with the ticket that authorizes its result.
struct InFlight {
  ticket: FetchTicket,
  task: JoinHandle<FetchResult<Vec<Asset>>>,
}

struct RefreshLoop {
  supervisor: MarketDataSupervisor,
  commands: mpsc::Receiver<Command>,
  online_rx: watch::Receiver<bool>,
  shutdown: CancellationToken,
  metrics: Option<Arc<MetricsRegistry>>,
  in_flight: Option<InFlight>,
  /// Pending retry timer.
  next_at: Option<Instant>,
}

impl RefreshLoop {
  #[instrument(skip(self), name = "refresh_loop", fields(source = self.supervisor.source_name()))]
  async fn run(mut self) {
    let online = *self.online_rx.borrow_and_update();
    self.supervisor.set_online(online);
    self.record_online(online);
    let mut connectivity_open = true;

    info!(online, "Market data refresh loop started");
    self.start_cycle(CycleKind::Foreground).await;

    loop {
      let timer_armed = self.next_at.is_some() && self.in_flight.is_none();
      let deadline = self.next_at.unwrap_or_else(Instant::now);
      let fetching = self.in_flight.is_some();

      tokio::select! {
        biased;

        () = self.shutdown.cancelled() => {
          info!("Shutdown signal received in refresh loop");
          break;
        }

        Some(Command::Refresh) = self.commands.recv() => {
          info!("Manual refresh");
          self.start_cycle(CycleKind::Foreground).await;
        }

        changed = self.online_rx.changed(), if connectivity_open => {
          if changed.is_err() {
            warn!("Connectivity signal closed, keeping last known state");
            connectivity_open = false;
            continue;
          }
          let online = *self.online_rx.borrow_and_update();
          self.on_connectivity(online).await;
        }

        result = wait_in_flight(&mut self.in_flight), if fetching => {
          if let Some(in_flight) = self.in_flight.take() {
            let end = self.supervisor.complete_cycle(&in_flight.ticket, result).await;
            self.on_cycle_end(end);
          }
        }

        () = sleep_until(deadline), if timer_armed => {
          self.next_at = None;
          debug!("Retry timer fired");
          self.start_cycle(CycleKind::Background).await;
        }
      }
    }

    self.abort_in_flight();
    self.next_at = None;
    self.supervisor.dispose();
    info!("Market data refresh loop stopped");
  }

  /// Begin a cycle, superseding any in-flight fetch and pending timer.
  async fn start_cycle(&mut self, kind: CycleKind) {
    self.next_at = None;
    self.abort_in_flight();

    match self.supervisor.begin_cycle(kind).await {
      CycleStart::Fetch(ticket) => {
        let task = tokio::spawn(self.supervisor.fetch_for(&ticket));
        self.in_flight = Some(InFlight { ticket, task });
      }
      CycleStart::Skipped(report) => self.on_cycle_end(CycleEnd::Completed(report)),
      CycleStart::Stopped => self.shutdown.cancel(),
    }
  }

  async fn on_connectivity(&mut self, online: bool) {
    self.record_online(online);
    match self.supervisor.set_online(online) {
      ConnectivityChange::Online => {
        self.start_cycle(CycleKind::Foreground).await;
      }
      ConnectivityChange::Offline => {
        // Offline cycle: no fetch, fills an empty state and re-arms the timer.
        self.start_cycle(CycleKind::Background).await;
      }
      ConnectivityChange::Unchanged => {}
    }
  }

  fn on_cycle_end(&mut self, end: CycleEnd) {
    match end {
      CycleEnd::Completed(report) => {
        self.record_cycle(&report);
        self.next_at = Instant::now().checked_add(report.next_delay);
        if self.next_at.is_some() {
          debug!(next_delay_s = report.next_delay.as_secs(), "Next cycle scheduled");
        } else {
          warn!(next_delay_s = report.next_delay.as_secs(), "Retry delay out of range, timer not armed");
        }
      }
      CycleEnd::Superseded => {
        if let Some(metrics) = &self.metrics {
          metrics.fetches_superseded.inc();
        }
      }
    }
  }

  fn abort_in_flight(&mut self) {
    if let Some(in_flight) = self.in_flight.take() {
      in_flight.ticket.cancel.cancel();
      in_flight.task.abort();
    }
  }

  fn record_cycle(&self, report: &CycleReport) {
    if let Some(metrics) = &self.metrics {
      let state = self.supervisor.state();
      metrics.record_cycle(self.supervisor.source_name(), report, &state);
    }
  }

  fn record_online(&self, online: bool) {
    if let Some(metrics) = &self.metrics {
      metrics.online.set(i64::from(online));
    }
  }
}

/// Resolve the in-flight fetch; pending forever when there is none.
async fn wait_in_flight(in_flight: &mut Option<InFlight>) -> FetchResult<Vec<Asset>> {
  match in_flight {
    Some(in_flight) => match (&mut in_flight.task).await {
      Ok(result) => result,
      Err(e) if e.is_cancelled() => Err(FetchError::Aborted),
      Err(e) => Err(FetchError::NetworkFailure(format!("fetch task failed: {e}"))),
    },
    None => std::future::pending().await,
  }
}
