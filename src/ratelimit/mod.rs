//! Rate limiting logic and state management.

mod clock;
mod limiter;
mod record;
mod sweeper;

pub use clock::{Clock, SystemClock};
pub use limiter::{LimitConfig, RateLimiter, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW};
pub use record::RateLimitRecord;
pub use sweeper::{Sweeper, SweeperHandle};

#[cfg(test)]
pub(crate) use clock::mock::MockClock;
