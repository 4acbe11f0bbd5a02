//! Request logging middleware.

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::{FutureExt, StreamExt, stream};
use serde_json::Value;
use std::any::Any;
use std::panic::{AssertUnwindSafe, resume_unwind};
use std::time::Instant;
use tracing::Instrument;

use crate::application::logger::{RequestLogger, RequestLoggerConfig};
use crate::domain::context;
use crate::domain::log_record::RequestSnapshot;
use crate::domain::trace_id::{TRACE_ID_HEADER, TraceId};
use crate::error::{AppError, HandlerError};
use crate::utils::request_meta;

/// Logs every request that is not excluded by the logger configuration.
///
/// # Request Flow
///
/// 1. Excluded paths and methods pass through untouched (no trace id, no record)
/// 2. The trace id is read from `X-Trace-Id` or generated
/// 3. The rest of the request runs inside a [`context`] scope and a
///    `request` span carrying the trace id
/// 4. When body logging is on, up to `max_body_bytes` of the body are read for
///    the record and the handler receives those bytes followed by the rest of
///    the original stream
/// 5. After the handler, a record is built and dispatched to the sink on a
///    detached task, and `X-Trace-Id` is set on the response
///
/// # Failures
///
/// - Error responses produced by [`crate::error::AppError`] are logged with
///   their status and message and returned unchanged
/// - A panicking handler is logged with status 500 and the panic message, then
///   the panic is resumed so outer layers (e.g. `CatchPanicLayer`) handle it.
///   Responses built outside this layer carry no `X-Trace-Id`; install
///   [`recover_panic`] inside it to keep the header on panic responses
/// - Errors while reading the body are handed to the handler unchanged
///
/// # Example
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/", get(root))
///     .layer(middleware::from_fn_with_state(logger.clone(), request_log::layer));
/// ```
pub async fn layer(State(logger): State<RequestLogger>, req: Request, next: Next) -> Response {
    if logger.config().is_excluded(req.method(), req.uri().path()) {
        return next.run(req).await;
    }

    let trace_id = TraceId::from_headers(req.headers()).unwrap_or_else(TraceId::generate);
    let span = tracing::info_span!(
        "request",
        trace_id = %trace_id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    context::middleware_scope(trace_id.clone(), handle(logger, trace_id, req, next))
        .instrument(span)
        .await
}

async fn handle(logger: RequestLogger, trace_id: TraceId, req: Request, next: Next) -> Response {
    let start = Instant::now();
    let config = logger.config();

    let (mut req, body) = capture_body(config, req).await;

    req.extensions_mut().insert(logger.tagged_output().clone());
    let snapshot = snapshot_request(config, &trace_id, &req, body);

    let outcome = AssertUnwindSafe(next.run(req)).catch_unwind().await;
    let elapsed = start.elapsed();

    match outcome {
        Ok(mut response) => {
            let error = response
                .extensions()
                .get::<HandlerError>()
                .map(|HandlerError(message)| message.clone());
            let record = snapshot.into_record(response.status(), elapsed, error);

            set_trace_header(&mut response, &trace_id);
            logger.dispatch(record);
            context::clear_middleware_active();
            response
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(error = %message, "Handler panicked");

            let record =
                snapshot.into_record(StatusCode::INTERNAL_SERVER_ERROR, elapsed, Some(message));
            logger.dispatch(record);
            context::clear_middleware_active();
            resume_unwind(panic)
        }
    }
}

/// Reads the start of the request body for the record.
///
/// At most `max_body_bytes` end up in the record. Bodies whose declared
/// `Content-Length` exceeds the limit are not read at all and recorded as a
/// placeholder. Everything read here is replayed to the handler ahead of the
/// unread remainder, including a read error.
async fn capture_body(config: &RequestLoggerConfig, req: Request) -> (Request, Option<String>) {
    if !config.log_request_body {
        return (req, None);
    }

    let limit = config.max_body_bytes;
    if let Some(len) = request_meta::content_length(req.headers())
        && len > limit
    {
        return (req, Some(format!("<body too large: {len} bytes>")));
    }

    let (parts, body) = req.into_parts();
    let mut rest = body.into_data_stream().fuse();
    let mut buffered = Vec::new();
    let mut failure = None;
    let mut finished = false;

    while buffered.len() <= limit {
        match rest.next().await {
            Some(Ok(chunk)) => buffered.extend_from_slice(&chunk),
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Request body could not be read");
                failure = Some(e);
                break;
            }
            None => {
                finished = true;
                break;
            }
        }
    }

    let logged = &buffered[..buffered.len().min(limit)];
    let text = (!logged.is_empty()).then(|| String::from_utf8_lossy(logged).into_owned());

    let body = if finished {
        Body::from(buffered)
    } else {
        let head = stream::iter(
            std::iter::once(Ok(Bytes::from(buffered))).chain(failure.map(Err)),
        );
        Body::from_stream(head.chain(rest))
    };

    (Request::from_parts(parts, body), text)
}

fn snapshot_request(
    config: &RequestLoggerConfig,
    trace_id: &TraceId,
    req: &Request,
    body: Option<String>,
) -> RequestSnapshot {
    let headers = req.headers();

    RequestSnapshot {
        trace_id: trace_id.clone(),
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
        query_params: request_meta::query_map(req.uri()),
        headers: config
            .log_headers
            .then(|| request_meta::header_map(headers)),
        cookies: config
            .log_cookies
            .then(|| request_meta::cookie_map(headers)),
        body,
        ip: request_meta::client_ip(headers, req.extensions(), config.trust_proxy_headers),
        user_agent: request_meta::user_agent(headers),
    }
}

fn set_trace_header(response: &mut Response, trace_id: &TraceId) {
    if let Some(value) = trace_id.to_header_value() {
        response.headers_mut().insert(TRACE_ID_HEADER, value);
    }
}

/// Panic handler for `CatchPanicLayer::custom`, installed between the request
/// logger and the handlers.
///
/// Answers `500` and attaches the panic message as a [`HandlerError`], so the
/// record carries it and the response still gets `X-Trace-Id`.
pub fn recover_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let message = panic_message(panic.as_ref());
    tracing::error!(error = %message, "Handler panicked");

    let mut response = AppError::internal("Internal server error", Value::Null).into_response();
    response.extensions_mut().insert(HandlerError(message));
    response
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
