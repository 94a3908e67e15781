//! Background removal of expired rate limit records.
//!
//! The limiter never deletes records on its own, so a long-running process
//! that sees many distinct identifiers grows without bound. The sweeper
//! periodically drops records whose window has already ended.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use super::clock::Clock;
use super::limiter::RateLimiter;
use crate::error::{AuthGuardError, Result};

/// Periodic sweep of expired records.
#[derive(Debug, Clone, Copy)]
pub struct Sweeper {
    interval: Duration,
}

impl Sweeper {
    /// Create a sweeper running every `interval`.
    ///
    /// # Errors
    /// Returns `AuthGuardError::Config` if `interval` is zero.
    pub fn new(interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(AuthGuardError::Config(
                "sweep interval must be greater than 0".to_string(),
            ));
        }
        Ok(Self { interval })
    }

    /// Get the sweep interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawn the sweep loop on the current tokio runtime.
    pub fn spawn<C>(self, limiter: Arc<RateLimiter<C>>) -> SweeperHandle
    where
        C: Clock + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let period = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = limiter.sweep_expired();
                        debug!(removed, records = limiter.len(), "Sweep finished");
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        info!(interval_ms = period.as_millis() as u64, "Rate limit sweeper started");

        SweeperHandle {
            shutdown: Some(shutdown_tx),
            task,
        }
    }
}

/// Handle to a running sweep loop.
pub struct SweeperHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweep loop and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = (&mut self.task).await;
        info!("Rate limit sweeper stopped");
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if self.shutdown.is_some() {
            self.task.abort();
        }
    }
}
