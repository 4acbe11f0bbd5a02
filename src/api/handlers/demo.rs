//! Sample endpoints showing trace propagation through handler code.

use axum::{Extension, Json, extract::Query};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

use crate::domain::context;
use crate::error::AppError;
use crate::infrastructure::tagged_output::TaggedOutput;
use crate::tprintln;

/// Budget for `/hello` before it answers with 504.
const HELLO_TIMEOUT: Duration = Duration::from_secs(1);

/// `GET /`
///
/// Prints a tagged line and echoes the trace id.
pub async fn root_handler() -> Json<Value> {
    tprintln!("Inside /");

    Json(json!({
        "message": "Hello from trace-logger",
        "trace_id": context::current(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct HelloQuery {
    pub name: Option<String>,
    /// Simulated work before answering.
    pub delay_ms: Option<u64>,
}

/// `GET /hello?name=<name>&delay_ms=<ms>`
///
/// # Errors
///
/// Returns `504 Gateway Timeout` when the simulated work takes longer than one
/// second.
pub async fn hello_handler(
    Extension(out): Extension<TaggedOutput>,
    Query(query): Query<HelloQuery>,
) -> Result<Json<Value>, AppError> {
    let name = query.name.unwrap_or_else(|| "world".to_string());
    let delay = Duration::from_millis(query.delay_ms.unwrap_or(0));

    let work = async {
        out.println(format_args!("Inside /hello"));
        tokio::time::sleep(delay).await;
        format!("Hello {name}")
    };

    match tokio::time::timeout(HELLO_TIMEOUT, work).await {
        Ok(message) => Ok(Json(json!({ "message": message }))),
        Err(_) => Err(AppError::timeout(
            "Request timed out",
            json!({ "timeout_ms": HELLO_TIMEOUT.as_millis() as u64 }),
        )),
    }
}

/// `GET /nested`
///
/// Walks through two levels of async calls, the second on a spawned task, and
/// reports the trace id seen at each level.
pub async fn nested_handler() -> Result<Json<Value>, AppError> {
    let levels = level_one().await?;

    Ok(Json(json!({
        "message": "Nested functions with trace ID propagation",
        "trace_id": context::current(),
        "levels": levels,
    })))
}

async fn level_one() -> Result<Vec<Option<String>>, AppError> {
    tracing::info!("In function level 1");
    let first = context::current().map(String::from);

    let second = context::spawn(level_two())
        .await
        .map_err(|e| AppError::internal("Nested task failed", json!({ "reason": e.to_string() })))?;

    Ok(vec![first, second])
}

async fn level_two() -> Option<String> {
    tracing::info!("In function level 2");
    context::current().map(String::from)
}

/// `GET /error`
///
/// Always fails with 500 and a structured error body.
pub async fn error_handler() -> Result<Json<Value>, AppError> {
    tracing::info!("About to fail");
    Err(AppError::internal(
        "Intentional error for testing",
        json!({}),
    ))
}

/// `GET /panic`
///
/// Panics inside the handler. The request logger records it as a 500 and the
/// router's panic layer produces the response.
pub async fn panic_handler() -> Json<Value> {
    panic!("Intentional panic for testing");
}
