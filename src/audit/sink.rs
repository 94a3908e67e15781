//! Destinations for serialized audit records.

use std::io::Write;

use parking_lot::Mutex;
use tracing::info;

use crate::error::Result;

/// Receives one serialized audit record per call.
pub trait AuthEventSink: Send + Sync {
    /// Append `line` (a single JSON document, no trailing newline).
    fn write_record(&self, line: &str) -> Result<()>;
}

/// Forwards records to `tracing` under the `auth_event` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AuthEventSink for TracingSink {
    fn write_record(&self, line: &str) -> Result<()> {
        info!(target: "auth_event", record = %line, "Auth event");
        Ok(())
    }
}

/// Appends newline-delimited records to a writer.
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> AuthEventSink for WriterSink<W> {
    fn write_record(&self, line: &str) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}
