//! Payloads queued for the remote log collector.

use serde::Serialize;

use super::log_record::{LogRecord, Severity, unix_timestamp};
use super::trace_id::TraceId;

/// A free-form message forwarded by [`crate::infrastructure::tagged_output::TaggedOutput`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<TraceId>,
    pub level: Severity,
    pub message: String,
    pub timestamp: f64,
}

impl MessageEnvelope {
    pub fn new(trace_id: Option<TraceId>, level: Severity, message: impl Into<String>) -> Self {
        Self {
            trace_id,
            level,
            message: message.into(),
            timestamp: unix_timestamp(),
        }
    }
}

/// Anything the remote dispatcher can deliver.
///
/// Serialized without a tag: the collector sees either a request record or a
/// message envelope under `data`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DispatchData {
    Request(LogRecord),
    Message(MessageEnvelope),
}

impl DispatchData {
    pub fn trace_id(&self) -> Option<&TraceId> {
        match self {
            Self::Request(record) => Some(&record.trace_id),
            Self::Message(message) => message.trace_id.as_ref(),
        }
    }
}

impl From<LogRecord> for DispatchData {
    fn from(record: LogRecord) -> Self {
        Self::Request(record)
    }
}

impl From<MessageEnvelope> for DispatchData {
    fn from(message: MessageEnvelope) -> Self {
        Self::Message(message)
    }
}

/// HTTP body POSTed to the collector: `{"data": ..., "sent_at": ...}`.
///
/// `sent_at` is stamped by the worker right before the request goes out.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchPayload {
    pub data: DispatchData,
    pub sent_at: f64,
}

impl DispatchPayload {
    pub fn new(data: DispatchData) -> Self {
        Self {
            data,
            sent_at: unix_timestamp(),
        }
    }
}
