//! In-process tests of the full request pipeline.

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};

mod common;
use common::*;

fn router() -> (axum::Router, std::sync::Arc<RecordingHandlers>) {
    let (server, handlers) = build_server(test_config(), Duration::ZERO);
    (server.router(), handlers)
}

#[tokio::test]
async fn healthcheck_is_open_to_anonymous_clients() {
    let (router, _) = router();
    let (status, _, body) = send(&router, get("/v1/healthcheck")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "available");
    assert_eq!(body["system_info"]["environment"], "testing");
    assert_eq!(body["system_info"]["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn gated_routes_walk_the_check_ladder() {
    let (router, handlers) = router();

    let (status, _, body) = send(&router, get("/v1/movies")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "AUTHENTICATION_REQUIRED");

    let (status, _, body) = send(&router, with_token("GET", "/v1/movies", INACTIVE_TOKEN)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "ACCOUNT_INACTIVE");

    let (status, _, body) = send(&router, with_token("GET", "/v1/movies/7", NO_PERMS_TOKEN)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "PERMISSION_DENIED");

    assert_eq!(handlers.calls(), 0, "no rejected request reaches a handler");
}

#[tokio::test]
async fn reader_cannot_write() {
    let (router, handlers) = router();

    let (status, _, body) = send(&router, with_token("GET", "/v1/movies", READER_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoint"], "list_movies");

    let (status, _, body) = send(&router, with_token("POST", "/v1/movies", READER_TOKEN)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "PERMISSION_DENIED");

    assert_eq!(handlers.calls(), 1);
}

#[tokio::test]
async fn writer_reaches_every_movie_endpoint() {
    let (router, handlers) = router();

    for (method, uri, endpoint) in [
        ("GET", "/v1/movies", "list_movies"),
        ("POST", "/v1/movies", "create_movie"),
        ("GET", "/v1/movies/7", "show_movie"),
        ("PATCH", "/v1/movies/7", "update_movie"),
        ("DELETE", "/v1/movies/7", "delete_movie"),
    ] {
        let (status, _, body) = send(&router, with_token(method, uri, WRITER_TOKEN)).await;
        assert_eq!(status, StatusCode::OK, "{method} {uri}");
        assert_eq!(body["endpoint"], endpoint);
    }
    assert_eq!(handlers.calls(), 5);
}

#[tokio::test]
async fn identity_endpoints_need_no_permission() {
    let (router, handlers) = router();

    let request = Request::post("/v1/tokens/authentication")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoint"], "create_authentication_token");

    let request = Request::post("/v1/users").body(Body::empty()).unwrap();
    let (status, _, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    assert_eq!(handlers.calls(), 2);
}

#[tokio::test]
async fn bad_credentials_are_rejected_everywhere() {
    let (router, _) = router();

    let malformed = Request::get("/v1/healthcheck")
        .header(header::AUTHORIZATION, "Token abc")
        .body(Body::empty())
        .unwrap();
    let unknown = with_token("GET", "/v1/healthcheck", UNKNOWN_TOKEN);

    for request in [malformed, unknown] {
        let (status, headers, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(&body), "INVALID_CREDENTIAL");
        assert_eq!(headers[header::WWW_AUTHENTICATE], "Bearer");
    }
}

#[tokio::test]
async fn trusted_preflight_is_answered_without_a_handler() {
    let (router, handlers) = router();

    let preflight = Request::options("/v1/movies")
        .header(header::ORIGIN, TRUSTED_ORIGIN)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(&router, preflight).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], TRUSTED_ORIGIN);
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_METHODS],
        "OPTIONS, PUT, PATCH, DELETE"
    );
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
        "Authorization, Content-Type"
    );
    assert_eq!(handlers.calls(), 0);
}

#[tokio::test]
async fn untrusted_origin_gets_no_cors_headers() {
    let (router, _) = router();

    let request = Request::get("/v1/healthcheck")
        .header(header::ORIGIN, "https://elsewhere.example")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(&router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());

    let vary: Vec<_> = headers
        .get_all(header::VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    for expected in ["Origin", "Access-Control-Request-Method", "Authorization"] {
        assert!(vary.contains(&expected), "missing Vary: {expected}");
    }
}

#[tokio::test]
async fn trusted_simple_request_echoes_origin() {
    let (router, _) = router();

    let request = Request::get("/v1/healthcheck")
        .header(header::ORIGIN, TRUSTED_ORIGIN)
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(&router, request).await;
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], TRUSTED_ORIGIN);
    assert!(headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).is_none());
}

#[tokio::test]
async fn handler_panic_is_contained() {
    let (router, _) = router();

    let request = Request::put("/v1/users/activated")
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_code(&body), "UNRECOVERABLE_FAULT");
    assert_eq!(headers[header::CONNECTION], "close");

    let (status, _, _) = send(&router, get("/v1/healthcheck")).await;
    assert_eq!(status, StatusCode::OK, "the server keeps serving");
}

#[tokio::test(start_paused = true)]
async fn burst_is_enforced_per_client() {
    let mut config = test_config();
    config.rate_limit.enabled = true;
    config.rate_limit.requests_per_second = 2.0;
    config.rate_limit.burst_size = 4;
    let (server, _) = build_server(config, Duration::ZERO);
    let router = server.router();

    let from = |ip: &str| {
        Request::get("/v1/healthcheck")
            .header("x-forwarded-for", ip)
            .body(Body::empty())
            .unwrap()
    };

    for _ in 0..4 {
        let (status, _, _) = send(&router, from("203.0.113.7")).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _, body) = send(&router, from("203.0.113.7")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(error_code(&body), "RATE_LIMIT_EXCEEDED");

    let (status, _, _) = send(&router, from("198.51.100.20")).await;
    assert_eq!(status, StatusCode::OK, "other clients keep their own bucket");

    tokio::time::advance(Duration::from_millis(500)).await;
    let (status, _, _) = send(&router, from("203.0.113.7")).await;
    assert_eq!(status, StatusCode::OK, "one token refilled");

    assert_eq!(server.state().limiter.len(), 2);
}

#[tokio::test]
async fn debug_vars_reports_counters() {
    let (router, _) = router();

    send(&router, get("/v1/healthcheck")).await;
    send(&router, get("/v1/healthcheck")).await;
    send(&router, get("/no/such/route")).await;

    let (status, _, body) = send(&router, get("/debug/vars")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["total_requests_received"], 4);
    assert_eq!(body["total_responses_sent"], 3);
    assert_eq!(body["total_responses_sent_by_status"]["200"], 2);
    assert_eq!(body["total_responses_sent_by_status"]["404"], 1);
    assert_eq!(body["rate_limiter_clients"], 0);
    assert!(body["timestamp"].as_u64().is_some());
}

#[tokio::test]
async fn fallbacks_render_json_errors() {
    let (router, _) = router();

    let (status, headers, body) = send(&router, get("/v2/movies")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");
    assert!(headers.get(header::VARY).is_some(), "fallbacks pass the pipeline");

    let request = Request::put("/v1/movies").body(Body::empty()).unwrap();
    let (status, _, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(error_code(&body), "METHOD_NOT_ALLOWED");
    assert!(body["error"]["message"].as_str().unwrap().contains("PUT"));
}

#[tokio::test]
async fn request_id_is_generated_or_echoed() {
    let (router, _) = router();

    let (_, headers, _) = send(&router, get("/v1/healthcheck")).await;
    let generated = headers["x-request-id"].to_str().unwrap();
    assert_eq!(generated.len(), 36, "uuid v4");

    let request = Request::get("/v1/healthcheck")
        .header("x-request-id", "trace-me")
        .body(Body::empty())
        .unwrap();
    let (_, headers, _) = send(&router, request).await;
    assert_eq!(headers["x-request-id"], "trace-me");
}

#[tokio::test(start_paused = true)]
async fn slow_handlers_time_out() {
    let mut config = test_config();
    config.timeouts.request_secs = 1;
    let (server, _) = build_server(config, Duration::from_secs(5));
    let router = server.router();

    let request = Request::post("/v1/users").body(Body::empty()).unwrap();
    let (status, _, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);

    let snapshot = server.state().metrics.snapshot();
    assert_eq!(snapshot.total_responses_sent_by_status.get("408"), Some(&1));
}
