//! Infrastructure layer for log delivery.
//!
//! # Modules
//!
//! - [`sink`] - Log sinks (console, remote HTTP collector, user callback)
//! - [`tagged_output`] - Trace-tagged line output for handler code

pub mod sink;
pub mod tagged_output;
