use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorInfo,
}

#[derive(Serialize)]
struct ErrorInfo {
    code: &'static str,
    message: String,
    details: Value,
}

/// Errors returned by HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    Validation { message: String, details: Value },
    NotFound { message: String, details: Value },
    Timeout { message: String, details: Value },
    Internal { message: String, details: Value },
}

impl AppError {
    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::Validation {
            message: message.into(),
            details,
        }
    }
    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::NotFound {
            message: message.into(),
            details,
        }
    }
    pub fn timeout(message: impl Into<String>, details: Value) -> Self {
        Self::Timeout {
            message: message.into(),
            details,
        }
    }
    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::Internal {
            message: message.into(),
            details,
        }
    }
}

/// Response extension describing why a handler failed.
///
/// Inserted by [`AppError`]'s `IntoResponse` so the request logger can put the
/// message in the record's `error` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            AppError::Validation { message, details } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                message,
                details,
            ),
            AppError::NotFound { message, details } => {
                (StatusCode::NOT_FOUND, "not_found", message, details)
            }
            AppError::Timeout { message, details } => {
                (StatusCode::GATEWAY_TIMEOUT, "timeout", message, details)
            }
            AppError::Internal { message, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                message,
                details,
            ),
        };

        let failure = HandlerError(message.clone());
        let body = ErrorBody {
            error: ErrorInfo {
                code,
                message,
                details,
            },
        };

        let mut response = (status, Json(body)).into_response();
        response.extensions_mut().insert(failure);
        response
    }
}

/// Rejected request logger configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("excluded path must start with '/', got {0:?}")]
    InvalidExcludePath(String),

    #[error("excluded method is not a valid HTTP method: {0:?}")]
    InvalidExcludeMethod(String),

    #[error("unsupported log format {0:?}, expected 'json' or 'text'")]
    InvalidFormat(String),

    #[error("max body size must be greater than 0")]
    ZeroBodyLimit,

    #[error("invalid remote endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("remote sink timeout must be greater than 0")]
    ZeroTimeout,

    #[error("queue capacity must be between 1 and 1000000, got {0}")]
    QueueCapacity(usize),

    #[error("sink concurrency must be between 1 and 256, got {0}")]
    Concurrency(usize),

    #[error("forwarding tagged output requires the remote sink")]
    ForwardingRequiresRemote,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
