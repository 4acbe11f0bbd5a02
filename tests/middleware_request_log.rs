mod common;

use axum::body::{Body, to_bytes};
use axum::http::{HeaderValue, Method, Request, StatusCode, header};
use axum_test::TestServer;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tower::ServiceExt;
use trace_logger::application::logger::DEFAULT_MAX_BODY_BYTES;
use trace_logger::prelude::*;

#[tokio::test]
async fn test_trace_id_generated_and_echoed() {
    let (logger, mut rx) = common::capture_logger();
    let server = TestServer::new(common::test_app(&logger)).unwrap();

    let response = server.get("/trace").await;

    response.assert_status_ok();
    let header = response.header("x-trace-id");
    let trace_id = header.to_str().unwrap();
    assert_eq!(trace_id.len(), 36);

    let json = response.json::<serde_json::Value>();
    assert_eq!(json["trace_id"], trace_id);

    let record = common::next_record(&mut rx).await;
    assert_eq!(record.trace_id.as_str(), trace_id);
    assert_eq!(record.method, "GET");
    assert_eq!(record.path, "/trace");
    assert_eq!(record.status_code, 200);
    assert!(record.error.is_none());
}

#[tokio::test]
async fn test_incoming_trace_id_is_reused() {
    let (logger, mut rx) = common::capture_logger();
    let server = TestServer::new(common::test_app(&logger)).unwrap();

    let response = server
        .get("/trace")
        .add_header("X-Trace-Id", "upstream-42")
        .await;

    assert_eq!(response.header("x-trace-id"), "upstream-42");
    assert_eq!(
        response.json::<serde_json::Value>()["trace_id"],
        "upstream-42"
    );
    assert_eq!(common::next_record(&mut rx).await.trace_id.as_str(), "upstream-42");
}

#[tokio::test]
async fn test_incoming_trace_id_is_echoed_exactly() {
    let (logger, mut rx) = common::capture_logger();
    let app = common::test_app(&logger);
    let long = "x".repeat(200);
    let raw = HeaderValue::from_bytes(b"legacy-\xe9t\xe9").unwrap();

    for value in [
        HeaderValue::from_static("upstream trace 42"),
        HeaderValue::from_str(&long).unwrap(),
        raw.clone(),
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::get("/ok")
                    .header("x-trace-id", value.clone())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-trace-id"], value);
    }

    assert_eq!(common::next_record(&mut rx).await.trace_id.as_str(), "upstream trace 42");
    assert_eq!(common::next_record(&mut rx).await.trace_id.as_str(), long);
    assert_eq!(
        common::next_record(&mut rx).await.trace_id.as_str(),
        "legacy-\u{fffd}t\u{fffd}"
    );
}

#[tokio::test]
async fn test_empty_incoming_trace_id_is_replaced() {
    let (logger, mut rx) = common::capture_logger();
    let app = common::test_app(&logger);

    let response = app
        .oneshot(
            Request::get("/ok")
                .header("x-trace-id", "")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let trace_id = response.headers()["x-trace-id"].to_str().unwrap().to_string();
    assert_eq!(trace_id.len(), 36);
    assert_eq!(common::next_record(&mut rx).await.trace_id.as_str(), trace_id);
}

#[tokio::test]
async fn test_concurrent_requests_get_distinct_trace_ids() {
    let (logger, mut rx) = common::capture_logger();
    let app = common::test_app(&logger);

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move {
                let response = app
                    .oneshot(Request::get("/trace").body(Body::empty()).unwrap())
                    .await
                    .unwrap();
                let header = response.headers()["x-trace-id"]
                    .to_str()
                    .unwrap()
                    .to_string();
                let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
                let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
                (header, json["trace_id"].as_str().unwrap().to_string())
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        let (header, seen_by_handler) = handle.await.unwrap();
        assert_eq!(header, seen_by_handler);
        assert!(seen.insert(header));
    }

    let mut logged = HashSet::new();
    for _ in 0..50 {
        logged.insert(common::next_record(&mut rx).await.trace_id.to_string());
    }
    assert_eq!(logged, seen);
}

#[tokio::test]
async fn test_excluded_path_and_method_bypass_logging() {
    let (builder, mut rx) = common::capture_builder();
    let logger = builder
        .exclude_paths(["/health"])
        .exclude_methods(["options"])
        .build()
        .unwrap();
    let server = TestServer::new(common::test_app(&logger)).unwrap();

    let response = server.get("/health").await;
    response.assert_status_ok();
    assert!(response.maybe_header("x-trace-id").is_none());

    let response = server.method(Method::OPTIONS, "/ok").await;
    assert!(response.maybe_header("x-trace-id").is_none());

    common::assert_no_record(&mut rx).await;

    server.get("/ok").await.assert_status_ok();
    assert_eq!(common::next_record(&mut rx).await.path, "/ok");
}

#[tokio::test]
async fn test_duration_reflects_handler_time() {
    let (logger, mut rx) = common::capture_logger();
    let server = TestServer::new(common::test_app(&logger)).unwrap();

    server.get("/sleep?ms=100").await.assert_status_ok();

    let record = common::next_record(&mut rx).await;
    assert!(record.duration_ms >= 100.0, "got {}", record.duration_ms);
    assert!(record.duration_ms < 600.0, "got {}", record.duration_ms);
    assert_eq!(record.query_params["ms"], "100");

    // Two decimal places at most.
    let scaled = record.duration_ms * 100.0;
    assert!((scaled - scaled.round()).abs() < 1e-6);
}

#[tokio::test]
async fn test_panic_is_logged_and_reraised() {
    let (logger, mut rx) = common::capture_logger();
    let server = TestServer::new(common::test_app(&logger)).unwrap();

    let response = server.get("/boom").await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.text(), common::OUTER_PANIC_BODY);

    let record = common::next_record(&mut rx).await;
    assert_eq!(record.status_code, 500);
    assert_eq!(record.path, "/boom");
    assert!(record.error.as_deref().unwrap().contains("boom"));
    assert_eq!(record.severity(), Severity::Error);

    // The server keeps serving after a panic.
    server.get("/ok").await.assert_status_ok();
    assert_eq!(common::next_record(&mut rx).await.status_code, 200);
}

#[tokio::test]
async fn test_app_error_is_logged_with_message() {
    let (logger, mut rx) = common::capture_logger();
    let server = TestServer::new(common::test_app(&logger)).unwrap();

    let response = server.get("/fail").await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.maybe_header("x-trace-id").is_some());
    let json = response.json::<serde_json::Value>();
    assert_eq!(json["error"]["message"], "bad input");

    let record = common::next_record(&mut rx).await;
    assert_eq!(record.status_code, 400);
    assert_eq!(record.error.as_deref(), Some("bad input"));
    assert_eq!(record.severity(), Severity::Warning);
}

#[tokio::test]
async fn test_headers_and_cookies_captured_by_default() {
    let (logger, mut rx) = common::capture_logger();
    let server = TestServer::new(common::test_app_with_peer(&logger)).unwrap();

    server
        .get("/ok?name=world")
        .add_header("X-Custom", "value")
        .add_header("Cookie", "session=abc; theme=dark")
        .add_header("User-Agent", "TestBot/1.0")
        .await
        .assert_status_ok();

    let record = common::next_record(&mut rx).await;
    let headers = record.headers.unwrap();
    assert_eq!(headers["x-custom"], "value");
    let cookies = record.cookies.unwrap();
    assert_eq!(cookies["session"], "abc");
    assert_eq!(cookies["theme"], "dark");
    assert_eq!(record.query_params["name"], "world");
    assert_eq!(record.user_agent, "TestBot/1.0");
    assert_eq!(record.ip, "127.0.0.1");
    assert!(record.body.is_none());
}

#[tokio::test]
async fn test_headers_and_cookies_can_be_disabled() {
    let (builder, mut rx) = common::capture_builder();
    let logger = builder
        .log_headers(false)
        .log_cookies(false)
        .build()
        .unwrap();
    let server = TestServer::new(common::test_app(&logger)).unwrap();

    server
        .get("/ok")
        .add_header("Cookie", "session=abc")
        .await
        .assert_status_ok();

    let record = common::next_record(&mut rx).await;
    assert!(record.headers.is_none());
    assert!(record.cookies.is_none());

    let json = serde_json::to_value(&record).unwrap();
    assert!(json.get("headers").is_none());
    assert!(json.get("cookies").is_none());
}

#[tokio::test]
async fn test_body_is_logged_and_replayed() {
    let (builder, mut rx) = common::capture_builder();
    let logger = builder.log_request_body(true).build().unwrap();
    let app = common::test_app(&logger);

    let response = app
        .oneshot(
            Request::post("/echo")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"hello":"world"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], br#"{"hello":"world"}"#);

    let record = common::next_record(&mut rx).await;
    assert_eq!(record.body.as_deref(), Some(r#"{"hello":"world"}"#));
    assert_eq!(record.method, "POST");
}

#[tokio::test]
async fn test_empty_body_is_absent() {
    let (builder, mut rx) = common::capture_builder();
    let logger = builder.log_request_body(true).build().unwrap();
    let server = TestServer::new(common::test_app(&logger)).unwrap();

    server.get("/ok").await.assert_status_ok();

    assert!(common::next_record(&mut rx).await.body.is_none());
}

#[tokio::test]
async fn test_declared_oversized_body_is_streamed_through() {
    let (builder, mut rx) = common::capture_builder();
    let logger = builder
        .log_request_body(true)
        .max_body_bytes(8)
        .build()
        .unwrap();
    let app = common::test_app(&logger);
    let payload = vec![b'a'; 32];

    let response = app
        .oneshot(
            Request::post("/echo")
                .header(header::CONTENT_LENGTH, HeaderValue::from(32))
                .body(Body::from(payload.clone()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], &payload[..]);

    let record = common::next_record(&mut rx).await;
    assert_eq!(record.body.as_deref(), Some("<body too large: 32 bytes>"));
    assert_eq!(record.status_code, 200);
}

fn chunked_body(chunks: &[&'static str]) -> Body {
    let items: Vec<Result<&'static str, std::io::Error>> = chunks.iter().map(|c| Ok(*c)).collect();
    Body::from_stream(futures::stream::iter(items))
}

#[tokio::test]
async fn test_chunked_body_is_logged_and_replayed() {
    let (builder, mut rx) = common::capture_builder();
    let logger = builder.log_request_body(true).build().unwrap();
    let app = common::test_app(&logger);

    let response = app
        .oneshot(
            Request::post("/echo")
                .body(chunked_body(&[r#"{"hello":"#, r#""world"}"#]))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], br#"{"hello":"world"}"#);

    let record = common::next_record(&mut rx).await;
    assert_eq!(record.body.as_deref(), Some(r#"{"hello":"world"}"#));
}

#[tokio::test]
async fn test_undeclared_oversized_body_reaches_handler_in_full() {
    let (builder, mut rx) = common::capture_builder();
    let logger = builder
        .log_request_body(true)
        .max_body_bytes(8)
        .build()
        .unwrap();
    let app = common::test_app(&logger);
    let chunks = ["abcdef", "ghijkl", "mnopqr", "stuvwx", "yz"];

    let response = app
        .oneshot(Request::post("/echo").body(chunked_body(&chunks)).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let header = response.headers()["x-trace-id"].to_str().unwrap().to_string();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"abcdefghijklmnopqrstuvwxyz");

    let record = common::next_record(&mut rx).await;
    assert_eq!(record.status_code, 200);
    assert_eq!(record.trace_id.as_str(), header);
    assert_eq!(record.body.as_deref(), Some("abcdefgh"));
    assert!(record.error.is_none());
}

#[tokio::test]
async fn test_large_chunked_body_with_default_limit() {
    let (builder, mut rx) = common::capture_builder();
    let logger = builder.log_request_body(true).build().unwrap();
    let app = common::test_app(&logger);
    let chunk = "a".repeat(64 * 1024);
    let payload_len = 24 * chunk.len();
    let chunks = (0..24).map(move |_| Ok::<_, std::io::Error>(chunk.clone()));

    let response = app
        .oneshot(
            Request::post("/echo")
                .body(Body::from_stream(futures::stream::iter(chunks)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(body.len(), payload_len);

    let record = common::next_record(&mut rx).await;
    assert_eq!(record.body.map(|b| b.len()), Some(DEFAULT_MAX_BODY_BYTES));
}

#[tokio::test]
async fn test_body_read_error_is_left_to_the_handler() {
    let (builder, mut rx) = common::capture_builder();
    let logger = builder.log_request_body(true).build().unwrap();
    let app = common::test_app(&logger);
    let items: Vec<Result<&'static str, std::io::Error>> = vec![
        Ok("partial"),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "client went away")),
    ];

    let response = app
        .oneshot(
            Request::post("/echo")
                .body(Body::from_stream(futures::stream::iter(items)))
                .unwrap(),
        )
        .await
        .unwrap();

    // The extractor rejects the broken body, not the logger.
    assert_ne!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(response.status().is_client_error());
    let status = response.status().as_u16();

    let record = common::next_record(&mut rx).await;
    assert_eq!(record.status_code, status);
    assert_eq!(record.body.as_deref(), Some("partial"));
}

#[tokio::test]
async fn test_tagged_output_does_not_leak_between_requests() {
    let capture = common::Capture::default();
    let (builder, _rx) = common::capture_builder();
    let logger = builder
        .output(TaggedOutput::new().with_writer(capture.clone()))
        .build()
        .unwrap();
    let app = common::test_app(&logger);

    let handles: Vec<_> = (0..10)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                app.oneshot(
                    Request::get("/print?n=5")
                        .header("x-trace-id", format!("req-{i}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().status(), StatusCode::OK);
    }

    let lines = capture.lines();
    assert_eq!(lines.len(), 50);
    for i in 0..10 {
        let prefix = format!("[trace_id: req-{i}] ");
        let mine: Vec<_> = lines.iter().filter(|l| l.starts_with(&prefix)).collect();
        assert_eq!(mine.len(), 5, "request {i} lines: {mine:?}");
        for (n, line) in mine.iter().enumerate() {
            assert_eq!(**line, format!("{prefix}line {n}"));
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_slow_sink_does_not_delay_response() {
    let logger = RequestLogger::builder()
        .install_tagged_output(false)
        .log_function(|_| std::thread::sleep(Duration::from_millis(500)))
        .build()
        .unwrap();
    let app = common::test_app(&logger);

    let started = Instant::now();
    let response = app
        .oneshot(Request::get("/ok").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(started.elapsed() < Duration::from_millis(400));
}

#[tokio::test]
async fn test_panicking_sink_does_not_affect_response() {
    let logger = RequestLogger::builder()
        .install_tagged_output(false)
        .log_function(|_| panic!("sink exploded"))
        .build()
        .unwrap();
    let server = TestServer::new(common::test_app(&logger)).unwrap();

    server.get("/ok").await.assert_status_ok();
    server.get("/ok").await.assert_status_ok();
}
