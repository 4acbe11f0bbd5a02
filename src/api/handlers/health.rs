//! Handler for health check endpoint.

use axum::{Json, extract::State, http::StatusCode};

use crate::api::dto::health::{CheckStatus, HealthChecks, HealthResponse};
use crate::infrastructure::tagged_output;
use crate::state::AppState;

/// Returns service health status with component checks.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response Codes
///
/// - **200 OK**: Log sink accepting records
/// - **503 Service Unavailable**: Log sink degraded
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "checks": {
///     "log_sink": { "status": "ok", "message": "remote sink accepting records" },
///     "tagged_output": { "status": "ok", "message": "installed" }
///   }
/// }
/// ```
pub async fn health_handler(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<HealthResponse>)> {
    let sink_check = check_log_sink(&state).await;
    let output_check = check_tagged_output();

    let healthy = sink_check.status == "ok";

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: HealthChecks {
            log_sink: sink_check,
            tagged_output: output_check,
        },
    };

    if healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

async fn check_log_sink(state: &AppState) -> CheckStatus {
    let sink = state.logger.sink();

    if sink.health_check().await {
        CheckStatus {
            status: "ok".to_string(),
            message: Some(format!("{} sink accepting records", sink.name())),
        }
    } else {
        CheckStatus {
            status: "error".to_string(),
            message: Some(format!("{} sink is closed", sink.name())),
        }
    }
}

/// Informational only; an uninstalled handle never degrades the service.
fn check_tagged_output() -> CheckStatus {
    CheckStatus {
        status: "ok".to_string(),
        message: Some(
            if tagged_output::is_installed() {
                "installed"
            } else {
                "not installed"
            }
            .to_string(),
        ),
    }
}
