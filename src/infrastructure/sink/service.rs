//! Log sink trait.

use async_trait::async_trait;

use crate::domain::log_record::LogRecord;

/// Destination for finished request records.
///
/// The middleware calls [`LogSink::emit`] from a detached task, so a slow or
/// failing sink never delays the response. Implementations must not propagate
/// failures: errors are logged locally and the record is dropped.
///
/// # Implementations
///
/// - [`crate::infrastructure::sink::ConsoleSink`] - Renders records through `tracing`
/// - [`crate::infrastructure::sink::RemoteSink`] - Queues records for an HTTP collector
/// - [`crate::infrastructure::sink::CallbackSink`] - Hands records to a user function
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Takes ownership of a finished record.
    async fn emit(&self, record: LogRecord);

    /// Short name used in health reports and startup logs.
    fn name(&self) -> &'static str;

    /// Whether the sink can still accept records.
    async fn health_check(&self) -> bool {
        true
    }
}
