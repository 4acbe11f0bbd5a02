//! Structured request log records.

use axum::http::StatusCode;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::trace_id::TraceId;
use crate::error::ConfigError;

/// Output format used when a record is rendered as a single line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            _ => Err(ConfigError::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Text => f.write_str("text"),
        }
    }
}

/// Severity attached to forwarded messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Severity for a finished request: `< 400` info, `< 500` warning, otherwise error.
    pub fn for_status(status: u16) -> Self {
        match status {
            0..=399 => Self::Info,
            400..=499 => Self::Warning,
            _ => Self::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        };
        f.write_str(label)
    }
}

/// Request metadata captured before the handler runs.
///
/// Optional parts are `None` when the matching toggle is disabled, so they
/// never reach the finished record.
#[derive(Debug, Clone)]
pub struct RequestSnapshot {
    pub trace_id: TraceId,
    pub method: String,
    pub path: String,
    pub query_params: BTreeMap<String, String>,
    pub headers: Option<BTreeMap<String, String>>,
    pub cookies: Option<BTreeMap<String, String>>,
    pub body: Option<String>,
    pub ip: String,
    pub user_agent: String,
}

impl RequestSnapshot {
    /// Completes the snapshot with the outcome of the request.
    pub fn into_record(
        self,
        status: StatusCode,
        elapsed: Duration,
        error: Option<String>,
    ) -> LogRecord {
        LogRecord {
            trace_id: self.trace_id,
            method: self.method,
            path: self.path,
            query_params: self.query_params,
            headers: self.headers,
            cookies: self.cookies,
            body: self.body,
            status_code: status.as_u16(),
            duration_ms: duration_ms(elapsed),
            ip: self.ip,
            user_agent: self.user_agent,
            timestamp: unix_timestamp(),
            error,
        }
    }
}

/// One finished request, handed by value to the configured sink.
///
/// Serialized field order and names form the wire schema shipped to remote
/// collectors:
///
/// ```json
/// {
///   "trace_id": "0b6f...",
///   "method": "GET",
///   "path": "/hello",
///   "query_params": {"name": "world"},
///   "headers": {"user-agent": "curl/8.5.0"},
///   "cookies": {},
///   "status_code": 200,
///   "duration_ms": 1.37,
///   "ip": "127.0.0.1",
///   "user_agent": "curl/8.5.0",
///   "timestamp": 1760659200.123456
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub trace_id: TraceId,
    pub method: String,
    pub path: String,
    pub query_params: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub status_code: u16,
    pub duration_ms: f64,
    pub ip: String,
    pub user_agent: String,
    pub timestamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LogRecord {
    pub fn severity(&self) -> Severity {
        Severity::for_status(self.status_code)
    }

    /// Renders the record as one line in the requested format.
    pub fn render(&self, format: LogFormat) -> String {
        match format {
            LogFormat::Json => serde_json::to_string(self).unwrap_or_else(|e| {
                format!("[trace_id: {}] unserializable record: {e}", self.trace_id)
            }),
            LogFormat::Text => {
                let mut line = format!(
                    "[trace_id: {}] {} {} - {} ({}ms)",
                    self.trace_id, self.method, self.path, self.status_code, self.duration_ms
                );
                if let Some(error) = &self.error {
                    line.push_str(" error: ");
                    line.push_str(error);
                }
                line
            }
        }
    }
}

/// Milliseconds rounded to two decimal places.
pub fn duration_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100_000.0).round() / 100.0
}

/// Current time as fractional Unix seconds.
pub fn unix_timestamp() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
