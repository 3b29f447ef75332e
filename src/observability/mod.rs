//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events; error! is the fault channel)
//!     → metrics.rs (atomic request counters, Prometheus facade)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → GET /debug/vars (read-only counter snapshot)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through every request span
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use metrics::{RequestMetrics, RequestMetricsSnapshot};
