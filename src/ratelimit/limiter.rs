//! Core rate limiter implementation.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, trace};

use super::clock::{Clock, SystemClock};
use super::record::RateLimitRecord;

/// Default number of requests allowed per window.
pub const DEFAULT_MAX_REQUESTS: u32 = 10;
/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(60_000);

/// Ceiling and window length applied to a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Length of the window
    pub window: Duration,
}

impl LimitConfig {
    /// Create a limit of `max_requests` per `window`.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    /// Limit with the default window and the given ceiling.
    pub fn per_default_window(max_requests: u32) -> Self {
        Self {
            max_requests,
            window: DEFAULT_WINDOW,
        }
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window: DEFAULT_WINDOW,
        }
    }
}

/// Fixed-window rate limiter keyed by caller-chosen identifiers.
///
/// Each identifier owns at most one [`RateLimitRecord`]. Records are created
/// on the first check and reset in place by the first check after their
/// window has ended. The check-and-increment for an identifier runs while the
/// store holds the write lock of that identifier's shard, so concurrent
/// callers can never admit more than `max_requests` per window.
///
/// This struct is thread-safe and can be shared across multiple tasks.
pub struct RateLimiter<C: Clock = SystemClock> {
    /// Window records indexed by identifier
    records: DashMap<String, RateLimitRecord>,
    /// Limit used by [`RateLimiter::check`]
    default_limit: LimitConfig,
    clock: C,
}

impl RateLimiter<SystemClock> {
    /// Create a new rate limiter with default settings.
    pub fn new() -> Self {
        Self::with_clock(SystemClock::new(), LimitConfig::default())
    }

    /// Create a rate limiter whose [`check`](Self::check) uses `limit`.
    pub fn with_default_limit(limit: LimitConfig) -> Self {
        Self::with_clock(SystemClock::new(), limit)
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Create a rate limiter reading time from `clock`.
    pub fn with_clock(clock: C, default_limit: LimitConfig) -> Self {
        Self {
            records: DashMap::new(),
            default_limit,
            clock,
        }
    }

    /// Check `identifier` against the default limit.
    pub fn check(&self, identifier: &str) -> bool {
        self.check_rate_limit(identifier, &self.default_limit)
    }

    /// Decide whether one more request for `identifier` is allowed.
    ///
    /// An absent or expired record opens a fresh window with a count of 1 and
    /// allows. Inside a live window the request is allowed and counted while
    /// the count is below `limit.max_requests`; otherwise it is denied and the
    /// record is left as is.
    pub fn check_rate_limit(&self, identifier: &str, limit: &LimitConfig) -> bool {
        let now = self.clock.now();

        trace!(
            identifier = %identifier,
            max_requests = limit.max_requests,
            "Checking rate limit"
        );

        // Only a first sighting pays for an owned key
        let existing = self.records.get_mut(identifier);
        let allowed = match existing {
            Some(mut record) => Self::admit_existing(&mut record, identifier, now, limit),
            None => match self.records.entry(identifier.to_owned()) {
                Entry::Vacant(slot) => {
                    debug!(
                        identifier = %identifier,
                        max_requests = limit.max_requests,
                        window_ms = limit.window.as_millis() as u64,
                        "Creating new rate limit record"
                    );
                    slot.insert(RateLimitRecord::start(now, limit.window));
                    true
                }
                // Inserted by a concurrent caller since the lookup
                Entry::Occupied(mut slot) => {
                    Self::admit_existing(slot.get_mut(), identifier, now, limit)
                }
            },
        };

        if !allowed {
            debug!(identifier = %identifier, "Rate limit exceeded");
        }

        allowed
    }

    /// Apply a check to a record that is already stored. Runs under the
    /// shard write lock.
    fn admit_existing(
        record: &mut RateLimitRecord,
        identifier: &str,
        now: Instant,
        limit: &LimitConfig,
    ) -> bool {
        if record.is_expired(now) {
            trace!(identifier = %identifier, "Window expired, resetting record");
            *record = RateLimitRecord::start(now, limit.window);
            true
        } else {
            record.try_admit(limit.max_requests)
        }
    }

    /// Snapshot of the record stored for `identifier`.
    ///
    /// Returns `None` if no record exists for the identifier.
    pub fn record(&self, identifier: &str) -> Option<RateLimitRecord> {
        self.records.get(identifier).map(|r| *r)
    }

    /// Allowances left for `identifier` in its live window under `limit`.
    pub fn remaining(&self, identifier: &str, limit: &LimitConfig) -> u32 {
        let now = self.clock.now();
        match self.records.get(identifier) {
            Some(record) if !record.is_expired(now) => record.remaining(limit.max_requests),
            _ => limit.max_requests,
        }
    }

    /// Remove every record whose window has ended.
    ///
    /// Returns the number of records removed. Live records are never touched,
    /// so sweeping cannot change the outcome of any later check.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.records.retain(|_, record| {
            let keep = !record.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });

        if removed > 0 {
            debug!(removed, remaining = self.records.len(), "Swept expired rate limit records");
        }
        removed
    }

    /// Get the limit applied by [`check`](Self::check).
    pub fn default_limit(&self) -> &LimitConfig {
        &self.default_limit
    }

    /// Clear all records.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.records.clear();
    }

    /// Get the number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for RateLimiter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}
