//! Error types for the request pipeline and the process lifecycle.
//!
//! [`ApiError`] is the request-level taxonomy. Every rejection a pipeline
//! stage produces is one of its variants, and every variant renders the same
//! JSON body shape:
//!
//! ```text
//! {"error": {"code": "PERMISSION_DENIED", "message": "..."}}
//! ```
//!
//! Faults (`SystemFault`, `UnrecoverableFault`) are reported to the operator
//! through `tracing::error!` and never reach the client in detail.

use std::time::Duration;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON body carried by every rejected request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Machine-readable category plus a human-readable message.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Request-level failures.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed, unknown or expired bearer credential (401).
    #[error("invalid or missing authentication token")]
    InvalidCredentialFormat,

    /// Anonymous principal on a route that needs an identity (401).
    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,

    /// Authenticated but not yet activated (403).
    #[error("your user account must be activated to access this resource")]
    AccountInactive,

    /// Activated but missing the route's permission code (403).
    #[error("your user account doesn't have the necessary permissions to access this resource")]
    PermissionDenied,

    /// Client exhausted its token bucket (429).
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// Unexpected collaborator failure (500). Detail is logged, not returned.
    #[error("system fault: {0}")]
    SystemFault(String),

    /// A stage panicked while serving the request (500).
    #[error("unrecoverable fault: {0}")]
    UnrecoverableFault(String),

    #[error("the requested resource could not be found")]
    NotFound,

    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(Method),

    /// Business endpoint with no handler behind it (501).
    #[error("the {0} endpoint is not implemented")]
    NotImplemented(&'static str),
}

const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

impl ApiError {
    /// Build a `SystemFault` from any displayable collaborator error.
    pub fn system(err: impl std::fmt::Display) -> Self {
        Self::SystemFault(err.to_string())
    }

    /// HTTP status and machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::InvalidCredentialFormat => (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIAL"),
            Self::AuthenticationRequired => (StatusCode::UNAUTHORIZED, "AUTHENTICATION_REQUIRED"),
            Self::AccountInactive => (StatusCode::FORBIDDEN, "ACCOUNT_INACTIVE"),
            Self::PermissionDenied => (StatusCode::FORBIDDEN, "PERMISSION_DENIED"),
            Self::RateLimitExceeded => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED"),
            Self::SystemFault(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SYSTEM_FAULT"),
            Self::UnrecoverableFault(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "UNRECOVERABLE_FAULT")
            }
            Self::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::MethodNotAllowed(_) => (StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED"),
            Self::NotImplemented(_) => (StatusCode::NOT_IMPLEMENTED, "NOT_IMPLEMENTED"),
        }
    }

    fn is_fault(&self) -> bool {
        matches!(self, Self::SystemFault(_) | Self::UnrecoverableFault(_))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if self.is_fault() {
            tracing::error!(code, error = %self, "request failed with a server fault");
            SERVER_ERROR_MESSAGE.to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if matches!(self, Self::InvalidCredentialFormat) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Failures that end [`crate::lifecycle::launch`].
#[derive(Error, Debug)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(String),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// The idle-client sweep stopped abnormally while serving.
    #[error("rate limiter eviction task failed: {0}")]
    Eviction(#[source] tokio::task::JoinError),

    /// In-flight requests were still running when the grace period elapsed.
    #[error("in-flight requests did not drain within {0:?}")]
    ShutdownTimeout(Duration),
}
