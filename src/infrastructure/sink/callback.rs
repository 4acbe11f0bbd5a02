//! Sink delegating to a user-supplied function.

use async_trait::async_trait;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use super::service::LogSink;
use crate::domain::log_record::LogRecord;

/// User log function receiving every finished record by value.
pub type LogFunction = Arc<dyn Fn(LogRecord) + Send + Sync>;

/// Calls a [`LogFunction`] for each record.
///
/// A panicking function is contained here and reported through `tracing`;
/// it never reaches the request that produced the record.
pub struct CallbackSink {
    function: LogFunction,
}

impl CallbackSink {
    pub fn new(function: LogFunction) -> Self {
        Self { function }
    }
}

#[async_trait]
impl LogSink for CallbackSink {
    async fn emit(&self, record: LogRecord) {
        let trace_id = record.trace_id.clone();
        let function = &self.function;

        if catch_unwind(AssertUnwindSafe(|| function(record))).is_err() {
            tracing::error!(trace_id = %trace_id, "Error in logging function: it panicked");
        }
    }

    fn name(&self) -> &'static str {
        "callback"
    }
}
