//! Sink writing records to the process log.

use async_trait::async_trait;

use super::service::LogSink;
use crate::domain::log_record::{LogFormat, LogRecord, Severity};

/// Writes each record as one line through `tracing`.
///
/// The level follows the response status (`< 400` info, `< 500` warn,
/// otherwise error); the line itself is rendered in the configured
/// [`LogFormat`].
pub struct ConsoleSink {
    format: LogFormat,
}

impl ConsoleSink {
    pub fn new(format: LogFormat) -> Self {
        Self { format }
    }
}

#[async_trait]
impl LogSink for ConsoleSink {
    async fn emit(&self, record: LogRecord) {
        let line = record.render(self.format);

        match record.severity() {
            Severity::Debug => tracing::debug!(target: "trace_logger::request", "{line}"),
            Severity::Info => tracing::info!(target: "trace_logger::request", "{line}"),
            Severity::Warning => tracing::warn!(target: "trace_logger::request", "{line}"),
            Severity::Error | Severity::Critical => {
                tracing::error!(target: "trace_logger::request", "{line}")
            }
        }
    }

    fn name(&self) -> &'static str {
        "console"
    }
}
