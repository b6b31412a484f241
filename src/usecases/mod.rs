//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces.
//!
//! Use cases:
//! - `MarketDataSupervisor`: fetch/cache/retry state machine
//! - `SupervisorHandle`: background runtime driving the supervisor
//!   (retry timer, manual refresh, connectivity, teardown)

pub mod market_data;
pub mod refresh_loop;

pub use market_data::{
  CycleEnd, CycleKind, CycleReport, CycleStart, FetchTicket, MarketDataSupervisor, MarketState,
  SupervisorSettings,
};
pub use refresh_loop::SupervisorHandle;
