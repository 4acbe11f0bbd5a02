//! Helpers for turning HTTP requests into log record fields.
//!
//! - [`request_meta`] - Headers, cookies, query parameters, client address

pub mod request_meta;
