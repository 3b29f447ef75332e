//! Cross-origin gate.
//!
//! Trusted origins (exact string match) are echoed back in
//! `Access-Control-Allow-Origin`. A pre-flight from a trusted origin is
//! answered here with 200 and never reaches the inner stages. Untrusted
//! origins get no CORS headers at all, leaving the browser's same-origin
//! policy in charge.

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::server::AppState;

const ALLOWED_METHODS: &str = "OPTIONS, PUT, PATCH, DELETE";
const ALLOWED_HEADERS: &str = "Authorization, Content-Type";

/// Exact-match allow-list of origins.
#[derive(Debug, Clone, Default)]
pub struct CorsPolicy {
    trusted_origins: Vec<String>,
}

impl CorsPolicy {
    pub fn new(trusted_origins: Vec<String>) -> Self {
        Self { trusted_origins }
    }

    pub fn is_trusted(&self, origin: &[u8]) -> bool {
        self.trusted_origins.iter().any(|o| o.as_bytes() == origin)
    }
}

pub async fn enable_cors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let trusted_origin = request
        .headers()
        .get(header::ORIGIN)
        .filter(|origin| !origin.is_empty() && state.cors.is_trusted(origin.as_bytes()))
        .cloned();

    let preflight = trusted_origin.is_some()
        && request.method() == Method::OPTIONS
        && request
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD);

    let mut response = if preflight {
        let mut response = StatusCode::OK.into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOWED_HEADERS),
        );
        response
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.append(header::VARY, HeaderValue::from_static("Origin"));
    headers.append(
        header::VARY,
        HeaderValue::from_static("Access-Control-Request-Method"),
    );
    if let Some(origin) = trusted_origin {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    response
}
