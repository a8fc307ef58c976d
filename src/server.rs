//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()`, so no new connections are made.
//! 2. Letting every in-flight connection task run to completion.
//! 3. Returning from [`Server::serve`], which lets `main` exit cleanly.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::error::{BoxError, Error};
use crate::failure::{ApiError, ErrorKind};
use crate::request::Request;
use crate::response::error_response;
use crate::router::Router;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
    request_timeout: Option<Duration>,
    body_limit: Option<usize>,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// use jsonfn::Server;
    /// let server = Server::bind("0.0.0.0:3000")?;
    /// # Ok::<(), jsonfn::Error>(())
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        Ok(Self { addr: addr.parse()?, request_timeout: None, body_limit: None })
    }

    /// Gives every request a deadline `timeout` after it arrives.
    ///
    /// Handlers read it from [`Context::deadline`](crate::Context::deadline);
    /// the server does not cancel anything when it passes.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Rejects request bodies larger than `bytes` with `413 Payload Too Large`.
    ///
    /// Unlimited by default.
    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = Some(bytes);
        self
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let router = Arc::new(router);
        let timeout = self.request_timeout;
        let limit = self.body_limit;

        info!(addr = %self.addr, "jsonfn listening");

        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM stops accepting new
                // connections even if more are queued.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { dispatch(router, req, timeout, limit).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("jsonfn stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Buffers one request and routes it. Never fails: every problem is a response.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<Incoming>,
    timeout: Option<Duration>,
    limit: Option<usize>,
) -> Result<http::Response<Full<Bytes>>, std::convert::Infallible> {
    let arrived = Instant::now();
    let (parts, body) = req.into_parts();

    let mut req = Request::new(parts.method, parts.uri.path());
    req.headers = parts.headers;
    req.extensions = parts.extensions;
    if let Some(timeout) = timeout {
        req = req.with_deadline(arrived + timeout);
    }

    let response = match read_body(body, limit).await {
        Ok(bytes) => router.dispatch(req.with_body(bytes)).await,
        Err(err) => {
            warn!(method = %req.method(), path = req.path(), status = %err.status(), "could not read request body");
            error_response(&err)
        }
    };

    Ok(response.into_inner())
}

/// Buffers `body`, stopping once it grows past `limit`.
async fn read_body<B>(body: B, limit: Option<usize>) -> Result<Bytes, ApiError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let collected = match limit {
        Some(limit) => Limited::new(body, limit).collect().await,
        None => body.collect().await.map_err(Into::into),
    };

    match collected {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(ApiError::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::InvalidRequest,
            "Request body is too large",
        )),
        Err(e) => Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            ErrorKind::InvalidRequest,
            "Could not read request body",
        )
        .with_cause(e)),
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// A signal that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(len: usize) -> Full<Bytes> {
        Full::new(Bytes::from(vec![b'x'; len]))
    }

    #[tokio::test]
    async fn bodies_within_the_limit_are_buffered() {
        let bytes = read_body(body(16), Some(16)).await.unwrap();
        assert_eq!(bytes.len(), 16);

        let bytes = read_body(body(1 << 20), None).await.unwrap();
        assert_eq!(bytes.len(), 1 << 20);
    }

    #[tokio::test]
    async fn oversized_bodies_are_413() {
        let err = read_body(body(17), Some(16)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        assert_eq!(err.details(), "Request body is too large");
        assert!(err.cause().is_none());
    }
}
