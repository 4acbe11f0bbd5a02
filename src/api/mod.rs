//! HTTP layer: handlers, DTOs and middleware.
//!
//! # Modules
//!
//! - [`dto`] - Response serialization types
//! - [`handlers`] - Demo, health and collector handlers
//! - [`middleware`] - Request logging and tracing middleware
//! - [`routes`] - Demo route table

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
