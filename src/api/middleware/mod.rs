//! HTTP middleware for request processing.
//!
//! Provides the trace-aware request logger and plain request tracing.

pub mod request_log;
pub mod tracing;
