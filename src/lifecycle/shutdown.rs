//! Shutdown coordination for the gateway.

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::error::ServeError;

/// Stop signal shared by the accept loop and the limiter sweep.
///
/// [`serve`] fires it when the OS signal arrives; `HttpServer::run_until`
/// fires it again once serving has ended, in case serving stopped on its own.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Idempotent; firing with no subscribers left is a no-op.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Serve `app` on `listener` until `signal` resolves.
///
/// Once the signal fires the listener stops accepting and in-flight
/// requests get `grace` to finish. Only a clean drain returns `Ok`; a drain
/// that outlives `grace` is [`ServeError::ShutdownTimeout`] and the
/// remaining connections are dropped.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    grace: Duration,
    shutdown: &Shutdown,
    signal: F,
) -> Result<(), ServeError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    let mut stop = shutdown.subscribe();

    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = stop.recv().await;
    })
    .into_future();
    tokio::pin!(server);

    tracing::info!(address = %addr, "Starting server");

    tokio::select! {
        result = &mut server => {
            // Stopped without a signal: only a listener failure gets here.
            result?;
            tracing::info!(address = %addr, "Stopped server");
            return Ok(());
        }
        _ = signal => {}
    }

    tracing::info!(address = %addr, grace = ?grace, "Shutting down server");
    shutdown.trigger();

    match tokio::time::timeout(grace, server).await {
        Ok(result) => {
            result?;
            tracing::info!(address = %addr, "Stopped server");
            Ok(())
        }
        Err(_) => {
            tracing::error!(address = %addr, grace = ?grace, "Shutdown grace period elapsed");
            Err(ServeError::ShutdownTimeout(grace))
        }
    }
}
