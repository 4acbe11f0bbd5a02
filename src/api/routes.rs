//! Demo route configuration.

use crate::api::handlers::{
    error_handler, hello_handler, nested_handler, panic_handler, root_handler,
};
use crate::state::AppState;
use axum::{Router, routing::get};

/// Sample routes exercising the request logger.
///
/// # Endpoints
///
/// - `GET /`        - Tagged print, echoes the trace id
/// - `GET /hello`   - Greeting with an optional simulated delay (504 after 1s)
/// - `GET /nested`  - Trace id propagation through nested and spawned calls
/// - `GET /error`   - Structured 500 error
/// - `GET /panic`   - Panicking handler
pub fn demo_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root_handler))
        .route("/hello", get(hello_handler))
        .route("/nested", get(nested_handler))
        .route("/error", get(error_handler))
        .route("/panic", get(panic_handler))
}
