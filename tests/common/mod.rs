//! Shared utilities for pipeline and lifecycle tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use futures_util::future::BoxFuture;
use greenlight_gateway::config::ApiConfig;
use greenlight_gateway::error::ServeError;
use greenlight_gateway::http::{Collaborators, Endpoint, HandlerRegistry, HttpServer};
use greenlight_gateway::security::{Permissions, User};
use greenlight_gateway::store::MemoryStore;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower::ServiceExt;

pub const READER_TOKEN: &str = "READERAAAAAAAAAAAAAAAAAAAA";
pub const WRITER_TOKEN: &str = "WRITERAAAAAAAAAAAAAAAAAAAA";
pub const INACTIVE_TOKEN: &str = "INACTIVEAAAAAAAAAAAAAAAAAA";
pub const NO_PERMS_TOKEN: &str = "NOPERMSAAAAAAAAAAAAAAAAAAA";
pub const UNKNOWN_TOKEN: &str = "UNKNOWNAAAAAAAAAAAAAAAAAAA";

pub const TRUSTED_ORIGIN: &str = "https://greenlight.example";

/// Config for in-process tests: limiter off so request counts are free.
pub fn test_config() -> ApiConfig {
    let mut config = ApiConfig::default();
    config.env = "testing".into();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.rate_limit.enabled = false;
    config.cors.trusted_origins = vec![TRUSTED_ORIGIN.into()];
    config
}

pub fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    let users: [(i64, bool, &str, &[&str]); 4] = [
        (1, true, READER_TOKEN, &["movies:read"]),
        (2, true, WRITER_TOKEN, &["movies:read", "movies:write"]),
        (3, false, INACTIVE_TOKEN, &["movies:read"]),
        (4, true, NO_PERMS_TOKEN, &[]),
    ];
    for (id, activated, token, codes) in users {
        let permissions: Permissions = codes.iter().copied().collect();
        store.insert_user(User { id, activated }, token, permissions);
    }
    Arc::new(store)
}

/// Business handlers that count their invocations.
///
/// `RegisterUser` sleeps for `slow` before answering, `ActivateUser`
/// panics, every other endpoint echoes its name.
pub struct RecordingHandlers {
    calls: AtomicUsize,
    slow: Duration,
}

impl RecordingHandlers {
    pub fn new(slow: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            slow,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl HandlerRegistry for RecordingHandlers {
    fn dispatch(&self, endpoint: Endpoint, _request: Request<Body>) -> BoxFuture<'static, Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let slow = self.slow;
        Box::pin(async move {
            match endpoint {
                Endpoint::RegisterUser => {
                    tokio::time::sleep(slow).await;
                    (StatusCode::ACCEPTED, Json(json!({"endpoint": endpoint.as_str()})))
                        .into_response()
                }
                Endpoint::ActivateUser => panic!("activation handler exploded"),
                _ => Json(json!({"endpoint": endpoint.as_str()})).into_response(),
            }
        })
    }
}

pub fn collaborators(handlers: Arc<RecordingHandlers>) -> Collaborators {
    let store = seeded_store();
    Collaborators {
        users: store.clone(),
        permissions: store,
        handlers,
    }
}

pub fn build_server(config: ApiConfig, slow: Duration) -> (HttpServer, Arc<RecordingHandlers>) {
    let handlers = RecordingHandlers::new(slow);
    let collaborators = collaborators(handlers.clone());
    (HttpServer::new(config, collaborators).unwrap(), handlers)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

pub fn with_token(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

/// Drive one request through the router; the body is `Null` when not JSON.
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

/// A server on an ephemeral port, stopped by sending on `stop`.
pub struct Running {
    pub addr: SocketAddr,
    pub stop: oneshot::Sender<()>,
    pub handle: JoinHandle<Result<(), ServeError>>,
    pub handlers: Arc<RecordingHandlers>,
}

impl Running {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub async fn spawn(config: ApiConfig, slow: Duration) -> Running {
    let (server, handlers) = build_server(config, slow);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let handle = tokio::spawn(server.run_until(listener, async move {
        let _ = stopped.await;
    }));

    Running {
        addr,
        stop,
        handle,
        handlers,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
