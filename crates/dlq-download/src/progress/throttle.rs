//! Progress throttling.
//!
//! Rate-limits progress reports so observers see a steady trickle instead of
//! one event per network read.

use std::time::{Duration, Instant};

/// Default minimum spacing between two progress reports.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Rate-limiter for progress reports.
///
/// The first check always passes. After that, a check passes only once
/// `min_interval` has elapsed since the last one that passed.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    last_emit: Option<Instant>,
    min_interval: Duration,
}

impl ProgressThrottle {
    /// Create a new throttle with the specified minimum interval.
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            last_emit: None,
            min_interval,
        }
    }

    /// The configured minimum interval.
    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Check against the wall clock.
    pub fn should_emit(&mut self) -> bool {
        self.should_emit_at(Instant::now())
    }

    /// Check against an explicit instant.
    pub fn should_emit_at(&mut self, now: Instant) -> bool {
        match self.last_emit {
            Some(last) if now.saturating_duration_since(last) < self.min_interval => false,
            _ => {
                self.last_emit = Some(now);
                true
            }
        }
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_INTERVAL)
    }
}
