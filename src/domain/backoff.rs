//! Retry delay between refresh cycles.
//!
//! Doubles on transient failure, jumps straight to the ceiling on rate
//! limiting, and drops back to the floor on success. The delay is always
//! within `[initial, max]`.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBackoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl RetryBackoff {
    /// Create a backoff starting at `initial`. `max` is raised to `initial`
    /// if configured lower.
    pub fn new(initial: Duration, max: Duration) -> Self {
        let max = max.max(initial);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay before the next cycle.
    pub const fn current(&self) -> Duration {
        self.current
    }

    pub const fn initial(&self) -> Duration {
        self.initial
    }

    pub const fn max(&self) -> Duration {
        self.max
    }

    /// Exponential step after a transient failure.
    pub fn on_failure(&mut self) -> Duration {
        self.current = self.current.saturating_mul(2).min(self.max);
        self.current
    }

    /// Upstream throttling: skip the ramp.
    pub fn on_rate_limited(&mut self) -> Duration {
        self.current = self.max;
        self.current
    }

    /// Success or a fresh connectivity transition.
    pub fn reset(&mut self) -> Duration {
        self.current = self.initial;
        self.current
    }
}
