//! Bearer-token authentication.
//!
//! Resolves the `Authorization` header to a [`Principal`] and attaches it to
//! the request. Malformed headers, malformed tokens and unknown tokens all
//! produce the same `InvalidCredentialFormat` rejection so a caller cannot
//! tell which one happened. Store outages are faults, not bad credentials.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;
use crate::http::server::AppState;
use crate::security::principal::Principal;
use crate::store::{StoreError, TokenScope, UserStore};

/// Length of an authentication token in characters.
pub const TOKEN_LENGTH: usize = 26;

/// A bearer token that passed the shape check.
///
/// The value never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Accept exactly [`TOKEN_LENGTH`] characters of the base-32 alphabet.
    pub fn parse(raw: &str) -> Option<Self> {
        let well_formed = raw.len() == TOKEN_LENGTH
            && raw.bytes().all(|b| b.is_ascii_uppercase() || (b'2'..=b'7').contains(&b));
        well_formed.then(|| Self(raw.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// Resolves authorization headers against the user store.
#[derive(Clone)]
pub struct Authenticator {
    users: Arc<dyn UserStore>,
}

impl Authenticator {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Resolve the raw `Authorization` header value.
    ///
    /// An absent or empty header is the anonymous principal. Anything other
    /// than `Bearer <token>` with a well-formed, known token is rejected.
    pub async fn authenticate(&self, header: Option<&HeaderValue>) -> Result<Principal, ApiError> {
        let value = match header {
            None => return Ok(Principal::Anonymous),
            Some(v) if v.is_empty() => return Ok(Principal::Anonymous),
            Some(v) => v.to_str().map_err(|_| ApiError::InvalidCredentialFormat)?,
        };

        let credential = bearer_token(value)
            .and_then(Credential::parse)
            .ok_or(ApiError::InvalidCredentialFormat)?;

        match self
            .users
            .get_for_token(TokenScope::Authentication, credential.expose())
            .await
        {
            Ok(user) => Ok(Principal::User(user)),
            Err(StoreError::RecordNotFound) => Err(ApiError::InvalidCredentialFormat),
            Err(err) => Err(ApiError::system(err)),
        }
    }
}

/// Split `Bearer <token>` on single spaces; any other shape is `None`.
fn bearer_token(value: &str) -> Option<&str> {
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Some(token),
        _ => None,
    }
}

/// Middleware: attach the request's principal, or reject it.
///
/// `Vary: Authorization` is added to every response, rejections included.
pub async fn authenticate_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let authorization = request.headers().get(header::AUTHORIZATION).cloned();

    let mut response = match state.authenticator.authenticate(authorization.as_ref()).await {
        Ok(principal) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    };

    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    response
}
