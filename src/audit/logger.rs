//! Audit logger that never fails its caller.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use super::event::{AuthEvent, AuthLogRecord};
use super::sink::{AuthEventSink, TracingSink};
use crate::error::Result;

/// Writes [`AuthEvent`]s to a sink.
///
/// Logging problems are reported through `tracing` and dropped, so an
/// authentication flow never stalls on the audit trail.
#[derive(Clone)]
pub struct AuthLogger {
    sink: Arc<dyn AuthEventSink>,
}

impl AuthLogger {
    /// Create a logger writing to `sink`.
    pub fn new(sink: impl AuthEventSink + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Create a logger sharing an existing sink.
    pub fn with_shared_sink(sink: Arc<dyn AuthEventSink>) -> Self {
        Self { sink }
    }

    /// Record `event`. Never fails.
    pub fn log_auth_event(&self, event: &AuthEvent) {
        if let Err(e) = self.try_log(event) {
            warn!(
                event_type = %event.event_type,
                error = %e,
                "Dropping auth event that could not be logged"
            );
        }
    }

    fn try_log(&self, event: &AuthEvent) -> Result<()> {
        let record = AuthLogRecord::from_event(event, Utc::now());
        let line = serde_json::to_string(&record)?;
        self.sink.write_record(&line)
    }
}

impl Default for AuthLogger {
    fn default() -> Self {
        Self::new(TracingSink)
    }
}

impl std::fmt::Debug for AuthLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthLogger").finish_non_exhaustive()
    }
}

/// Record `event` through `tracing`. Never fails.
pub fn log_auth_event(event: &AuthEvent) {
    AuthLogger::default().log_auth_event(event);
}
