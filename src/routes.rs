//! Top-level router configuration.
//!
//! # Route Structure
//!
//! Demo service ([`app_router`]):
//!
//! - `GET /`, `/hello`, `/nested`, `/error`, `/panic` - Sample routes
//! - `GET /health` - Health check (excluded from request logging by default)
//!
//! Collector ([`collector_router`]):
//!
//! - `POST /` - Append a JSON payload to the output file
//!
//! # Middleware
//!
//! - **Request logging** - Trace ids, tagged output and structured records
//! - **Panic recovery** - Turns handler panics into `500` inside the request
//!   logger, so the record and the `X-Trace-Id` header survive the panic

use crate::api;
use crate::api::handlers::{CollectorState, health_handler, receive_handler};
use crate::api::middleware::{request_log, tracing};
use crate::state::AppState;
use axum::Router;
use axum::routing::{get, post};
use tower_http::catch_panic::CatchPanicLayer;

/// Constructs the demo service router.
///
/// Handler panics are recovered inside the request logger, which records the
/// panic message and sets `X-Trace-Id` on the `500`. The outer panic layer
/// only catches failures in the middleware stack itself.
pub fn app_router(state: AppState) -> Router {
    let logger = state.logger.clone();

    let router = api::routes::demo_routes()
        .route("/health", get(health_handler))
        .with_state(state)
        .layer(CatchPanicLayer::custom(request_log::recover_panic));

    logger.apply(router).layer(CatchPanicLayer::new())
}

/// Constructs the collector router.
pub fn collector_router(state: CollectorState) -> Router {
    Router::new()
        .route("/", post(receive_handler))
        .with_state(state)
        .layer(tracing::layer())
}
