//! Handlers owned by the gateway, and the seam to the ones it is not.
//!
//! Business endpoints (movies, users, tokens) live behind
//! [`HandlerRegistry`]. The pipeline has already authenticated, rate
//! limited and authorized a request by the time it is dispatched there.

use axum::{
    extract::{Request, State},
    http::Method,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::future::{self, BoxFuture};
use serde::Serialize;

use crate::error::ApiError;
use crate::http::server::AppState;

/// Every business endpoint the route table dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    ListMovies,
    ShowMovie,
    CreateMovie,
    UpdateMovie,
    DeleteMovie,
    RegisterUser,
    ActivateUser,
    CreateAuthenticationToken,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListMovies => "list_movies",
            Self::ShowMovie => "show_movie",
            Self::CreateMovie => "create_movie",
            Self::UpdateMovie => "update_movie",
            Self::DeleteMovie => "delete_movie",
            Self::RegisterUser => "register_user",
            Self::ActivateUser => "activate_user",
            Self::CreateAuthenticationToken => "create_authentication_token",
        }
    }
}

/// Serves business endpoints.
///
/// The request still carries its [`crate::security::Principal`] in the
/// extensions, and path parameters are in the URI.
pub trait HandlerRegistry: Send + Sync {
    fn dispatch(&self, endpoint: Endpoint, request: Request) -> BoxFuture<'static, Response>;
}

/// Registry for a gateway deployed without business handlers: every
/// endpoint answers 501.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnimplementedHandlers;

impl HandlerRegistry for UnimplementedHandlers {
    fn dispatch(&self, endpoint: Endpoint, _request: Request) -> BoxFuture<'static, Response> {
        Box::pin(future::ready(
            ApiError::NotImplemented(endpoint.as_str()).into_response(),
        ))
    }
}

/// Axum handler forwarding to the registry for `endpoint`.
pub fn dispatch(
    endpoint: Endpoint,
) -> impl Fn(State<AppState>, Request) -> BoxFuture<'static, Response> + Clone + Send + Sync + 'static
{
    move |State(state): State<AppState>, request: Request| {
        state.handlers.dispatch(endpoint, request)
    }
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub system_info: SystemInfo,
}

#[derive(Debug, Serialize)]
pub struct SystemInfo {
    pub environment: String,
    pub version: &'static str,
}

/// `GET /v1/healthcheck`
pub async fn healthcheck(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "available",
        system_info: SystemInfo {
            environment: state.config.env.clone(),
            version: env!("CARGO_PKG_VERSION"),
        },
    })
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method)
}
