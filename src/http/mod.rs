//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, pipeline layers)
//!     → request.rs (client identity, request id header)
//!     → middleware/ (panic boundary, CORS)
//!     → [security stages: rate limit, authenticate]
//!     → routes.rs (route table, per-route authorization)
//!     → handlers.rs (healthcheck, fallbacks, handler registry)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod routes;
pub mod server;

pub use handlers::{Endpoint, HandlerRegistry, UnimplementedHandlers};
pub use request::X_REQUEST_ID;
pub use server::{AppState, Collaborators, HttpServer};
