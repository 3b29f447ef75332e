//! Request metrics collection and exposition.
//!
//! # Responsibilities
//! - Count requests received, responses sent, responses per status code and
//!   cumulative processing time
//! - Expose those counters read-only at `/debug/vars`
//! - Mirror request events into the `metrics` facade for Prometheus
//!
//! # Metrics
//! - `http_requests_total` (counter): responses by method, status
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `http_rate_limited_total` (counter): requests refused by the limiter
//!
//! # Design Decisions
//! - Every counter is an independent atomic; nothing here takes a lock
//! - Per-status counts live in a fixed slot per possible status code
//! - The collector is an owned value, so independent servers never share counts

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
    Json,
};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use serde::Serialize;

use crate::http::server::AppState;

const LOWEST_STATUS: u16 = 100;
const STATUS_SLOTS: usize = 900;

/// Process-lifetime request counters.
#[derive(Debug)]
pub struct RequestMetrics {
    received: AtomicU64,
    sent: AtomicU64,
    by_status: Box<[AtomicU64]>,
    processing_micros: AtomicU64,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self {
            received: AtomicU64::new(0),
            sent: AtomicU64::new(0),
            by_status: (0..STATUS_SLOTS).map(|_| AtomicU64::new(0)).collect(),
            processing_micros: AtomicU64::new(0),
        }
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sent(&self, status: StatusCode, elapsed: Duration) {
        self.sent.fetch_add(1, Ordering::Relaxed);
        if let Some(slot) = self.slot(status) {
            slot.fetch_add(1, Ordering::Relaxed);
        }
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.processing_micros.fetch_add(micros, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RequestMetricsSnapshot {
        let by_status = self
            .by_status
            .iter()
            .enumerate()
            .filter_map(|(i, count)| {
                let count = count.load(Ordering::Relaxed);
                (count > 0).then(|| ((i as u16 + LOWEST_STATUS).to_string(), count))
            })
            .collect();

        RequestMetricsSnapshot {
            total_requests_received: self.received.load(Ordering::Relaxed),
            total_responses_sent: self.sent.load(Ordering::Relaxed),
            total_responses_sent_by_status: by_status,
            total_processing_time_micros: self.processing_micros.load(Ordering::Relaxed),
        }
    }

    fn slot(&self, status: StatusCode) -> Option<&AtomicU64> {
        let index = status.as_u16().checked_sub(LOWEST_STATUS)?;
        self.by_status.get(usize::from(index))
    }
}

impl Default for RequestMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
///
/// Each field is read independently, so under load the fields may be a few
/// events apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestMetricsSnapshot {
    pub total_requests_received: u64,
    pub total_responses_sent: u64,
    pub total_responses_sent_by_status: BTreeMap<String, u64>,
    pub total_processing_time_micros: u64,
}

/// Body of `GET /debug/vars`.
#[derive(Debug, Serialize)]
pub struct DebugVars {
    pub version: &'static str,
    pub timestamp: u64,
    pub rate_limiter_clients: usize,
    #[serde(flatten)]
    pub requests: RequestMetricsSnapshot,
}

/// Middleware: count the request and observe the final status.
///
/// Sits outermost, so it sees every response the pipeline produces,
/// including rejections and panic-boundary 500s.
pub async fn metrics_middleware(
    State(metrics): State<Arc<RequestMetrics>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    metrics.record_received();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    metrics.record_sent(response.status(), elapsed);
    record_request(&method, response.status().as_u16(), elapsed);
    response
}

/// Handler for `GET /debug/vars`.
pub async fn debug_vars(State(state): State<AppState>) -> Json<DebugVars> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    Json(DebugVars {
        version: env!("CARGO_PKG_VERSION"),
        timestamp,
        rate_limiter_clients: state.limiter.len(),
        requests: state.metrics.snapshot(),
    })
}

/// Start the Prometheus scrape endpoint. Must run inside the Tokio runtime.
pub fn init_prometheus(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

fn record_request(method: &str, status: u16, elapsed: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    ::metrics::counter!("http_requests_total", &labels).increment(1);
    ::metrics::histogram!("http_request_duration_seconds", &labels)
        .record(elapsed.as_secs_f64());
}

pub fn record_rate_limited() {
    ::metrics::counter!("http_rate_limited_total").increment(1);
}
