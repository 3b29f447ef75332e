//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, rates > 0)
//! - Validate addresses and CORS origins
//! - Check seeded users (token shape, unique ids)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ApiConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::ApiConfig;
use crate::security::authentication::Credential;

/// A single semantic problem, tagged with the offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &ApiConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    }
    if config.timeouts.shutdown_grace_secs == 0 {
        errors.push(ValidationError::new(
            "timeouts.shutdown_grace_secs",
            "must be greater than 0",
        ));
    }

    let limiter = &config.rate_limit;
    if limiter.enabled {
        if !(limiter.requests_per_second.is_finite() && limiter.requests_per_second > 0.0) {
            errors.push(ValidationError::new(
                "rate_limit.requests_per_second",
                "must be a positive number",
            ));
        }
        if limiter.burst_size == 0 {
            errors.push(ValidationError::new("rate_limit.burst_size", "must be at least 1"));
        }
    }
    if limiter.sweep_interval_secs == 0 {
        errors.push(ValidationError::new(
            "rate_limit.sweep_interval_secs",
            "must be greater than 0",
        ));
    }
    if limiter.stale_after_secs < limiter.sweep_interval_secs {
        errors.push(ValidationError::new(
            "rate_limit.stale_after_secs",
            "must not be shorter than the sweep interval",
        ));
    }

    for (i, origin) in config.cors.trusted_origins.iter().enumerate() {
        if let Err(message) = check_origin(origin) {
            errors.push(ValidationError::new(format!("cors.trusted_origins[{i}]"), message));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    let mut seen = HashSet::new();
    for (i, user) in config.users.iter().enumerate() {
        if !seen.insert(user.id) {
            errors.push(ValidationError::new(
                format!("users[{i}].id"),
                format!("duplicate user id {}", user.id),
            ));
        }
        if Credential::parse(&user.token).is_none() {
            errors.push(ValidationError::new(
                format!("users[{i}].token"),
                "must be 26 base-32 characters (A-Z, 2-7)",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// An origin is scheme + host (+ port), nothing else. Browsers send it
/// without a trailing slash, so a configured one would never match.
fn check_origin(origin: &str) -> Result<(), String> {
    let url = Url::parse(origin).map_err(|e| format!("'{origin}' is not a URL: {e}"))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("'{origin}' must use http or https"));
    }
    if url.host_str().is_none() {
        return Err(format!("'{origin}' has no host"));
    }
    if origin.ends_with('/') || url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(format!("'{origin}' must not carry a path, query or fragment"));
    }
    Ok(())
}
