//! Connectivity Adapters
//!
//! Implementations of `ConnectivitySignal`:
//! - `probe`: periodic HEAD probe against a reachability URL
//! - `manual`: externally driven switch (tests, probe disabled)

pub mod manual;
pub mod probe;

pub use manual::ManualConnectivity;
pub use probe::ConnectivityMonitor;
