//! Adaptive polling cadence.
//!
//! Providers are polled on a slow interval while nothing is happening. Any
//! accepted event switches to the fast interval, which holds until a quiet
//! period passes with no further accepted events.

use std::time::Duration;

use serde::Serialize;

/// Which interval is in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CadenceMode {
    /// Steady-state polling.
    Slow,
    /// Post-event polling.
    Fast,
}

/// Poll interval selector. Pure: the caller supplies the time.
#[derive(Debug, Clone)]
pub struct PollCadence {
    fast: Duration,
    slow: Duration,
    quiet_period_ms: u64,
    last_accepted_ms: Option<u64>,
}

impl PollCadence {
    /// Create a cadence starting in slow mode.
    pub fn new(fast: Duration, slow: Duration, quiet_period: Duration) -> Self {
        Self {
            fast,
            slow,
            quiet_period_ms: quiet_period.as_millis() as u64,
            last_accepted_ms: None,
        }
    }

    /// Note that an event was accepted at `now_ms`.
    pub fn record_accepted(&mut self, now_ms: u64) {
        self.last_accepted_ms = Some(match self.last_accepted_ms {
            Some(prev) => prev.max(now_ms),
            None => now_ms,
        });
    }

    /// Current mode.
    pub fn mode(&self, now_ms: u64) -> CadenceMode {
        match self.last_accepted_ms {
            Some(at) if now_ms.saturating_sub(at) < self.quiet_period_ms => CadenceMode::Fast,
            _ => CadenceMode::Slow,
        }
    }

    /// Interval until the next poll.
    pub fn interval(&self, now_ms: u64) -> Duration {
        match self.mode(now_ms) {
            CadenceMode::Fast => self.fast,
            CadenceMode::Slow => self.slow,
        }
    }
}
