//! Connectivity Port - Online/Offline Signal
//!
//! Platform connectivity exposed as a `watch` channel of booleans
//! (`true` = online). The supervisor runtime reacts to transitions and
//! gates network attempts on the latest value.

use tokio::sync::watch;

pub trait ConnectivitySignal: Send + Sync + 'static {
  /// Receiver of the current online state and its transitions.
  fn subscribe(&self) -> watch::Receiver<bool>;

  /// Latest observed state.
  fn is_online(&self) -> bool {
    *self.subscribe().borrow()
  }
}
