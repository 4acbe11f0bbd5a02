//! Destinations for finished request records.
//!
//! Provides a [`LogSink`] trait with three implementations:
//! - [`ConsoleSink`] - Local output through `tracing`
//! - [`RemoteSink`] - Fire-and-forget shipping to an HTTP collector
//! - [`CallbackSink`] - User-supplied log function

mod callback;
mod console;
mod remote;
mod service;
mod worker;

pub use callback::{CallbackSink, LogFunction};
pub use console::ConsoleSink;
pub use remote::{DEFAULT_ENDPOINT, RemoteDispatcher, RemoteSettings, RemoteSink};
pub use service::LogSink;
