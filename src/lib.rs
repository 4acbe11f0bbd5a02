//! # Trace Logger
//!
//! Request logging middleware for Axum with per-request trace ids, trace-tagged
//! output and fire-and-forget log shipping.
//!
//! ## Architecture
//!
//! - **Domain Layer** ([`domain`]) - Trace ids, task-local trace context, log records
//!   and the remote dispatch worker
//! - **Application Layer** ([`application`]) - Logger configuration and installation
//! - **Infrastructure Layer** ([`infrastructure`]) - Log sinks and tagged output
//! - **API Layer** ([`api`]) - Request logging middleware, demo and collector handlers
//!
//! ## Features
//!
//! - `X-Trace-Id` propagation: reused when supplied, generated otherwise, echoed on the response
//! - Trace id available anywhere inside the request via [`domain::context::current`]
//! - [`tprintln!`] and [`infrastructure::tagged_output::TaggedOutput`] prefix lines
//!   with `[trace_id: <id>]`
//! - One structured record per request with method, path, query, headers, cookies,
//!   optional body, status, duration, client ip and user agent
//! - Console, remote (bounded queue, background worker) or custom sinks
//! - Panicking handlers are logged as `500` and re-raised
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use axum::{Router, routing::get};
//! use trace_logger::prelude::*;
//!
//! let logger = RequestLogger::builder()
//!     .exclude_paths(["/health"])
//!     .console()
//!     .build()?;
//!
//! let app = logger.apply(Router::new().route("/", get(|| async { "ok" })));
//! ```
//!
//! ## Binaries
//!
//! - `trace-logger` - Demo service, configured through [`config::Config`]
//! - `receiver` - Collector appending shipped records to a file

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod state;
pub mod utils;

pub mod config;
pub mod logging;
pub mod server;

pub mod routes;

pub use error::AppError;
pub use state::AppState;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::application::{RequestLogger, RequestLoggerBuilder, SinkKind};
    pub use crate::domain::context;
    pub use crate::domain::log_record::{LogFormat, LogRecord, Severity};
    pub use crate::domain::trace_id::{TRACE_ID_HEADER, TraceId};
    pub use crate::error::{AppError, ConfigError};
    pub use crate::infrastructure::sink::RemoteSettings;
    pub use crate::infrastructure::tagged_output::TaggedOutput;
    pub use crate::state::AppState;
    pub use crate::tprintln;
}
