//! Per-client rate limiting with a token bucket per identity.
//!
//! The [`ClientRegistry`] owns every client's bucket behind one mutex. Each
//! check is O(1) and never awaits while holding the lock, so a single coarse
//! lock is enough. A background sweep drops clients that have been idle
//! longer than the configured threshold.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::RateLimitConfig;
use crate::error::ApiError;
use crate::http::request::client_identity;
use crate::http::server::AppState;
use crate::observability::metrics;

/// A lazily refilled token bucket.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// A full bucket.
    pub fn new(capacity: f64, refill_per_sec: f64, now: Instant) -> Self {
        Self {
            capacity,
            refill_per_sec,
            tokens: capacity,
            last_refill: now,
        }
    }

    /// Refill for the time elapsed since the last call, then take one token
    /// if there is one.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }
}

#[derive(Debug)]
struct ClientEntry {
    bucket: TokenBucket,
    last_seen: Instant,
}

/// Concurrency-safe map from client identity to limiter state.
#[derive(Debug)]
pub struct ClientRegistry {
    enabled: bool,
    requests_per_second: f64,
    burst_size: f64,
    sweep_interval: Duration,
    stale_after: Duration,
    clients: Mutex<HashMap<String, ClientEntry>>,
}

impl ClientRegistry {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            enabled: config.enabled,
            requests_per_second: config.requests_per_second,
            burst_size: f64::from(config.burst_size),
            sweep_interval: config.sweep_interval(),
            stale_after: config.stale_after(),
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Decide whether `identity` may make one more request now.
    ///
    /// Denial is a normal outcome, not an error. A disabled limiter answers
    /// `true` without touching the map.
    pub fn allow(&self, identity: &str) -> bool {
        if !self.enabled {
            return true;
        }

        let now = Instant::now();
        let mut clients = self.lock();
        let entry = clients
            .entry(identity.to_string())
            .or_insert_with(|| ClientEntry {
                bucket: TokenBucket::new(self.burst_size, self.requests_per_second, now),
                last_seen: now,
            });

        // Denied clients are still active; evicting them would hand them a
        // fresh, full bucket.
        entry.last_seen = now;
        entry.bucket.try_acquire(now)
    }

    /// Remove every client idle for longer than the staleness threshold.
    /// Returns how many were removed.
    pub fn evict_stale(&self) -> usize {
        let now = Instant::now();
        let mut clients = self.lock();
        let before = clients.len();
        clients.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= self.stale_after);
        before - clients.len()
    }

    /// Number of tracked identities.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.lock().contains_key(identity)
    }

    /// Spawn the periodic sweep. It runs until `shutdown` fires (or its
    /// sender is dropped).
    ///
    /// The sweep interval must be non-zero; `validate_config` rejects zero.
    pub fn spawn_eviction(
        self: &Arc<Self>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let period = self.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = registry.evict_stale();
                        if evicted > 0 {
                            tracing::debug!(
                                evicted,
                                remaining = registry.len(),
                                "Evicted idle rate limiter clients"
                            );
                        }
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Rate limiter eviction stopped");
                        break;
                    }
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ClientEntry>> {
        // Critical sections never leave an entry half-updated, so a poisoned
        // map is still consistent.
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Middleware: reject clients that have exhausted their bucket.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let limiter = &state.limiter;
    if !limiter.is_enabled() {
        return next.run(request).await;
    }

    let identity = client_identity(&request, state.config.rate_limit.trust_forwarded_headers);
    if limiter.allow(&identity) {
        next.run(request).await
    } else {
        tracing::warn!(client = %identity, "Rate limit exceeded");
        metrics::record_rate_limited();
        ApiError::RateLimitExceeded.into_response()
    }
}
