//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start the optional Prometheus exporter
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Configuration arrives already validated
//! - Listener starts last (traffic only when ready)

use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::ApiConfig;
use crate::error::ServeError;
use crate::http::{Collaborators, HttpServer, UnimplementedHandlers};
use crate::observability::metrics::init_prometheus;
use crate::store::MemoryStore;

/// Run the gateway with the in-memory store until a termination signal.
pub async fn launch(config: ApiConfig) -> Result<(), ServeError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|e| ServeError::Metrics(format!("invalid metrics address: {e}")))?;
        init_prometheus(addr).map_err(|e| ServeError::Metrics(e.to_string()))?;
    }

    let store = MemoryStore::from_seed(&config.users);
    tracing::info!(
        env = %config.env,
        seeded_users = store.len(),
        limiter_enabled = config.rate_limit.enabled,
        "Gateway initialized"
    );

    let collaborators = Collaborators {
        users: store.clone(),
        permissions: store,
        handlers: Arc::new(UnimplementedHandlers),
    };
    HttpServer::new(config, collaborators)?.run().await
}
