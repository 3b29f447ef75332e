//! Greenlight API gateway library.
//!
//! The request pipeline in front of the movie catalogue API: per-client rate
//! limiting, bearer-token authentication, route-level authorization, CORS, a
//! panic boundary, request metrics and a bounded graceful shutdown.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod store;

pub use config::schema::ApiConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
