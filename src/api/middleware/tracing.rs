//! Plain HTTP request/response tracing for the collector.
//!
//! The collector receives the request logger's own output, so it must not run
//! the request logger itself; this layer only reports traffic locally.

use tower_http::LatencyUnit;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

/// Creates a tracing middleware for HTTP requests.
///
/// Requests get an `INFO` span with method, URI and version. Responses are
/// logged at `DEBUG` with status and latency in milliseconds, keeping a busy
/// collector quiet at the default level.
///
/// ```text
/// DEBUG request{method=POST uri=/ version=HTTP/1.1}: finished processing request latency=1 ms status=200
/// ```
pub fn layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::DEBUG)
                .latency_unit(LatencyUnit::Millis),
        )
}
