//! Connectivity Monitor - Periodic Reachability Probe
//!
//! Sends a HEAD request to the probe URL every interval. Any HTTP
//! response, whatever its status, counts as online; a transport error
//! or timeout counts as offline. Only transitions are published.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::adapters::sources::http::build_client;
use crate::config::ConnectivityConfig;
use crate::ports::ConnectivitySignal;

/// Probe-driven connectivity signal.
pub struct ConnectivityMonitor {
    http: Client,
    probe_url: String,
    interval: Duration,
    tx: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    /// Create a monitor. Starts optimistic (online) until the first probe.
    pub fn new(config: &ConnectivityConfig) -> Result<Self> {
        let (tx, _) = watch::channel(true);
        Ok(Self {
            http: build_client(config.timeout())?,
            probe_url: config.probe_url.clone(),
            interval: config.interval(),
            tx,
        })
    }

    /// Spawn the probe loop; it stops when `shutdown` is cancelled.
    pub fn spawn(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        tokio::spawn(async move { monitor.run(shutdown).await })
    }

    #[instrument(skip(self, shutdown), fields(url = %self.probe_url))]
    async fn run(&self, shutdown: CancellationToken) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_s = self.interval.as_secs(), "Connectivity monitor started");

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("Shutdown signal received in connectivity monitor");
                    return;
                }
                _ = ticker.tick() => {
                    let online = self.probe().await;
                    self.publish(online);
                }
            }
        }
    }

    async fn probe(&self) -> bool {
        match self.http.head(&self.probe_url).send().await {
            Ok(response) => {
                debug!(status = %response.status(), "Connectivity probe answered");
                true
            }
            Err(e) => {
                debug!(error = %e, "Connectivity probe failed");
                false
            }
        }
    }

    fn publish(&self, online: bool) {
        let changed = self.tx.send_if_modified(|current| {
            let changed = *current != online;
            *current = online;
            changed
        });
        if changed {
            if online {
                info!("Connectivity probe: online");
            } else {
                warn!("Connectivity probe: offline");
            }
        }
    }
}

impl ConnectivitySignal for ConnectivityMonitor {
    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}
