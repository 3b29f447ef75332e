//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble the shared [`AppState`]
//! - Wire the request pipeline around the route table
//! - Bind the listener and serve until shutdown

use std::future::Future;
use std::sync::Arc;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::validation::validate_config;
use crate::config::{ApiConfig, ConfigError};
use crate::error::ServeError;
use crate::http::handlers::{method_not_allowed, not_found, HandlerRegistry};
use crate::http::middleware::{enable_cors, recover_panic, CorsPolicy};
use crate::http::request::X_REQUEST_ID;
use crate::http::routes::routes;
use crate::lifecycle::shutdown::{serve, Shutdown};
use crate::lifecycle::signals::wait_for_termination;
use crate::observability::metrics::metrics_middleware;
use crate::observability::RequestMetrics;
use crate::security::authentication::{authenticate_middleware, Authenticator};
use crate::security::rate_limit::{rate_limit_middleware, ClientRegistry};
use crate::store::{PermissionStore, UserStore};

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub limiter: Arc<ClientRegistry>,
    pub authenticator: Authenticator,
    pub permissions: Arc<dyn PermissionStore>,
    pub metrics: Arc<RequestMetrics>,
    pub cors: CorsPolicy,
    pub handlers: Arc<dyn HandlerRegistry>,
}

/// External collaborators the gateway consults but does not own.
#[derive(Clone)]
pub struct Collaborators {
    pub users: Arc<dyn UserStore>,
    pub permissions: Arc<dyn PermissionStore>,
    pub handlers: Arc<dyn HandlerRegistry>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Validate `config` and assemble the pipeline.
    pub fn new(config: ApiConfig, collaborators: Collaborators) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let state = AppState {
            limiter: Arc::new(ClientRegistry::new(&config.rate_limit)),
            authenticator: Authenticator::new(collaborators.users),
            permissions: collaborators.permissions,
            metrics: Arc::new(RequestMetrics::new()),
            cors: CorsPolicy::new(config.cors.trusted_origins.clone()),
            handlers: collaborators.handlers,
            config: Arc::new(config),
        };

        let router = Self::build_router(state.clone());
        Ok(Self { router, state })
    }

    /// Build the router with the full pipeline.
    ///
    /// Layers wrap outward: the last one added sees the request first.
    /// Request order is request id, trace, metrics, panic boundary, CORS,
    /// rate limiter, authenticator, then the route's gate and handler.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        routes(&state.permissions)
            .fallback(not_found)
            .method_not_allowed_fallback(method_not_allowed)
            .layer(TimeoutLayer::new(state.config.timeouts.request()))
            .layer(from_fn_with_state(state.clone(), authenticate_middleware))
            .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
            .layer(from_fn_with_state(state.clone(), enable_cors))
            .layer(from_fn(recover_panic))
            .layer(from_fn_with_state(state.metrics.clone(), metrics_middleware))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .with_state(state)
    }

    /// The assembled router, for driving the pipeline without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Bind the configured address and serve until SIGINT or SIGTERM.
    pub async fn run(self) -> Result<(), ServeError> {
        let addr = self.state.config.listener.bind_address.clone();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServeError::Bind { addr, source })?;

        self.run_until(listener, async {
            let signal = wait_for_termination().await;
            tracing::info!(signal, "Shutdown signal received");
        })
        .await
    }

    /// Serve on `listener` until `signal` resolves, then drain within the
    /// configured grace period.
    ///
    /// A serve failure wins over an eviction task failure; either one is
    /// returned as an error.
    pub async fn run_until<F>(self, listener: TcpListener, signal: F) -> Result<(), ServeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let shutdown = Shutdown::new();
        let eviction = self.state.limiter.spawn_eviction(shutdown.subscribe());
        let grace = self.state.config.timeouts.shutdown_grace();

        let result = serve(listener, self.router, grace, &shutdown, signal).await;

        shutdown.trigger();
        let eviction = eviction.await;
        result?;
        eviction.map_err(|e| {
            tracing::error!(error = %e, "Rate limiter eviction task failed");
            ServeError::Eviction(e)
        })
    }
}
