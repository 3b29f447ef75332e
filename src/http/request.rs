//! Request inspection helpers.
//!
//! # Responsibilities
//! - Resolve the client identity used to key rate limiting
//! - Name the request id header shared by the request id layers

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::{HeaderName, Request};

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Identity shared by requests whose origin cannot be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Proxy headers consulted for the real client address, in priority order.
const FORWARDED_HEADERS: &[&str] = &["x-forwarded-for", "x-real-ip"];

/// The client's IP address as a string.
///
/// With `trust_forwarded` the first address in `X-Forwarded-For`, then
/// `X-Real-IP`, wins over the socket peer. The peer address is only known
/// when the server was started with connect info.
pub fn client_identity<B>(request: &Request<B>, trust_forwarded: bool) -> String {
    let forwarded = trust_forwarded
        .then(|| forwarded_ip(request))
        .flatten();

    forwarded
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .map_or_else(|| UNKNOWN_CLIENT.to_string(), |ip| ip.to_string())
}

fn forwarded_ip<B>(request: &Request<B>) -> Option<IpAddr> {
    FORWARDED_HEADERS.iter().find_map(|name| {
        request
            .headers()
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .map(str::trim)
            .and_then(|s| s.parse::<IpAddr>().ok())
    })
}
