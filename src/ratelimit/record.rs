//! Per-identifier window state.

use std::time::{Duration, Instant};

/// Tracking state for one identifier within its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    /// Requests allowed so far in this window. Starts at 1, never 0.
    count: u32,
    /// When the current window ends
    reset_at: Instant,
}

impl RateLimitRecord {
    /// Open a new window at `now` that counts the current request.
    pub fn start(now: Instant, window: Duration) -> Self {
        Self {
            count: 1,
            reset_at: window_end(now, window),
        }
    }

    /// Whether the window has ended at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.reset_at <= now
    }

    /// Count one more request if the ceiling allows it.
    ///
    /// Returns `false` and leaves the record untouched once `count` has
    /// reached `max_requests`.
    pub fn try_admit(&mut self, max_requests: u32) -> bool {
        if self.count >= max_requests {
            return false;
        }
        self.count += 1;
        true
    }

    /// Get the current count.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Get the instant at which this window ends.
    pub fn reset_at(&self) -> Instant {
        self.reset_at
    }

    /// Allowances left in this window under `max_requests`.
    pub fn remaining(&self, max_requests: u32) -> u32 {
        max_requests.saturating_sub(self.count)
    }

    /// Get the duration until the current window resets.
    pub fn duration_until_reset(&self, now: Instant) -> Duration {
        self.reset_at.saturating_duration_since(now)
    }
}

/// `now + window`, clamped to the latest representable instant.
///
/// Windows too long for the platform clock behave as never expiring.
fn window_end(now: Instant, window: Duration) -> Instant {
    let mut span = window;
    loop {
        if let Some(end) = now.checked_add(span) {
            return end;
        }
        span /= 2;
    }
}
