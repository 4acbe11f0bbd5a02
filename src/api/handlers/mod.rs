//! HTTP request handlers.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod collector;
pub mod demo;
pub mod health;

pub use collector::{CollectorState, receive_handler};
pub use demo::{error_handler, hello_handler, nested_handler, panic_handler, root_handler};
pub use health::health_handler;
