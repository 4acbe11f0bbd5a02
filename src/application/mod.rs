//! Application layer wiring the request logger together.
//!
//! - [`logger`] - Builder, validated configuration and installation of the
//!   request logging middleware

pub mod logger;

pub use logger::{RequestLogger, RequestLoggerBuilder, RequestLoggerConfig, SinkKind};
