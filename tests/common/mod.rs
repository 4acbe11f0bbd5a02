#![allow(dead_code)]

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{ConnectInfo, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::any::Any;
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tower::Layer;
use tower_http::catch_panic::CatchPanicLayer;
use trace_logger::application::RequestLoggerBuilder;
use trace_logger::prelude::*;

pub const OUTER_PANIC_BODY: &str = "caught by outer layer";

/// Logger builder delivering records to the returned channel and keeping the
/// process-wide tagged output untouched.
pub fn capture_builder() -> (RequestLoggerBuilder, mpsc::UnboundedReceiver<LogRecord>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let builder = RequestLogger::builder()
        .install_tagged_output(false)
        .log_function(move |record| {
            let _ = tx.send(record);
        });
    (builder, rx)
}

pub fn capture_logger() -> (RequestLogger, mpsc::UnboundedReceiver<LogRecord>) {
    let (builder, rx) = capture_builder();
    (builder.build().unwrap(), rx)
}

pub async fn next_record(rx: &mut mpsc::UnboundedReceiver<LogRecord>) -> LogRecord {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for a log record")
        .expect("log channel closed")
}

/// Asserts that nothing else arrives within a short grace period.
pub async fn assert_no_record(rx: &mut mpsc::UnboundedReceiver<LogRecord>) {
    let next = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(next.is_err(), "unexpected log record: {next:?}");
}

#[derive(Deserialize)]
struct SleepQuery {
    ms: u64,
}

#[derive(Deserialize)]
struct PrintQuery {
    n: u32,
}

fn test_routes() -> Router {
    Router::new()
        .route("/ok", get(|| async { "ok" }))
        .route("/health", get(|| async { "healthy" }))
        .route(
            "/sleep",
            get(|Query(q): Query<SleepQuery>| async move {
                tokio::time::sleep(Duration::from_millis(q.ms)).await;
                "slept"
            }),
        )
        .route("/boom", get(boom))
        .route(
            "/fail",
            get(|| async { AppError::bad_request("bad input", json!({ "field": "name" })) }),
        )
        .route("/echo", post(|body: Bytes| async move { body }))
        .route(
            "/trace",
            get(|| async { Json(json!({ "trace_id": context::current() })) }),
        )
        .route(
            "/print",
            get(
                |Extension(out): Extension<TaggedOutput>, Query(q): Query<PrintQuery>| async move {
                    for i in 0..q.n {
                        out.println(format_args!("line {i}"));
                        tokio::task::yield_now().await;
                    }
                    "printed"
                },
            ),
        )
}

async fn boom() -> &'static str {
    panic!("boom")
}

fn outer_panic_response(_: Box<dyn Any + Send + 'static>) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, OUTER_PANIC_BODY).into_response()
}

/// Test routes behind `logger`, with a panic layer outside it.
pub fn test_app(logger: &RequestLogger) -> Router {
    logger
        .apply(test_routes())
        .layer(CatchPanicLayer::custom(outer_panic_response))
}

/// [`test_app`] with a fixed peer address, as `into_make_service_with_connect_info` would add.
pub fn test_app_with_peer(logger: &RequestLogger) -> Router {
    test_app(logger).layer(MockConnectInfoLayer)
}

#[derive(Clone)]
pub struct MockConnectInfoLayer;

impl<S> Layer<S> for MockConnectInfoLayer {
    type Service = MockConnectInfoService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MockConnectInfoService { inner }
    }
}

#[derive(Clone)]
pub struct MockConnectInfoService<S> {
    inner: S,
}

impl<S, B> tower::Service<axum::http::Request<B>> for MockConnectInfoService<S>
where
    S: tower::Service<axum::http::Request<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: axum::http::Request<B>) -> Self::Future {
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        self.inner.call(req)
    }
}

/// In-memory writer for tagged output.
#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8(self.0.lock().unwrap().clone())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

/// Collector stand-in forwarding every received payload to the channel.
///
/// Each request is held for `delay` before it is answered.
pub async fn spawn_collector(delay: Duration) -> (String, mpsc::UnboundedReceiver<Value>) {
    let (tx, rx) = mpsc::unbounded_channel();

    let app = Router::new().route(
        "/",
        post(move |Json(payload): Json<Value>| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(payload);
                tokio::time::sleep(delay).await;
                Json(json!({ "message": "Data received successfully" }))
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}/"), rx)
}

pub async fn next_payload(rx: &mut mpsc::UnboundedReceiver<Value>) -> Value {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for the collector")
        .expect("collector channel closed")
}
