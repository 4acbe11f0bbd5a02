//! Domain layer: trace ids, the task-local trace context and log records.
//!
//! # Modules
//!
//! - [`trace_id`] - Trace identifier and the `X-Trace-Id` header
//! - [`context`] - Task-local storage of the active trace id
//! - [`log_record`] - Request log records, formats and severities
//! - [`dispatch_event`] - Payloads shipped to the remote collector
//!
//! # Request Logging Flow
//!
//! 1. The middleware opens a [`context`] scope with the request's [`trace_id::TraceId`]
//! 2. Handler code reads the id through [`context::current`]
//! 3. A [`log_record::LogRecord`] is built once the handler finishes
//! 4. The configured sink receives the record; the remote sink queues a
//!    [`dispatch_event::DispatchData`] for the remote sink's delivery worker

pub mod context;
pub mod dispatch_event;
pub mod log_record;
pub mod trace_id;
