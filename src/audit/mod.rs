//! Authentication event logging.

mod event;
mod logger;
mod sink;

pub use event::{event_types, AuthEvent, AuthLogRecord};
pub use logger::{log_auth_event, AuthLogger};
pub use sink::{AuthEventSink, TracingSink, WriterSink};

#[cfg(test)]
pub(crate) use sink::mock::MemorySink;
