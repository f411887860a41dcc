//! HTTP server and graceful shutdown.
//!
//! The server owns the async side: accepting connections, reading bodies,
//! and draining on shutdown. Dispatch itself is synchronous, so each request
//! is handed to [`App::handle`] on tokio's blocking pool.
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or **SIGINT** the server:
//! 1. Stops `listener.accept()` immediately, so no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::app::App;
use crate::config::Config;
use crate::error::{Error, HttpError};
use crate::response::Response;

/// The HTTP server.
#[derive(Debug)]
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust
    /// use hearth::Server;
    ///
    /// assert!(Server::bind("0.0.0.0:3000").is_ok());
    /// assert!(Server::bind("localhost").is_err());
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        let addr: SocketAddr = addr.parse().map_err(|_| Error::Addr(addr.to_owned()))?;
        Ok(Self { addr })
    }

    /// Binds to `config.listen`.
    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Self::bind(&config.listen)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Starts accepting connections and dispatching them through `app`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, app: App) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        let app = Arc::new(app);

        info!(addr = %self.addr, app = %app.config().app, "hearth listening");

        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Checked first so a signal stops accepting even while
                // connections are queued.
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

                    let app = Arc::clone(&app);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            async move { dispatch(app, req, remote_addr).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("hearth stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Reads one request, runs it through the app, and converts the result.
///
/// Never fails: unreadable bodies and untranslatable requests become `400`,
/// errors the app propagates become `500`.
async fn dispatch(
    app: Arc<App>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "reading request body: {e}");
            return Ok(HttpError::BadRequest.into_response().into_http());
        }
    };

    let req = match app.factory().from_http(http::Request::from_parts(parts, body)) {
        Ok(req) => req,
        Err(e) => {
            debug!(peer = %remote_addr, status = e.code(), "request rejected");
            return Ok(e.into_response().into_http());
        }
    };

    let response = match tokio::task::spawn_blocking(move || app.handle(req)).await {
        Ok(Ok(res)) => res,
        Ok(Err(e)) => {
            error!(peer = %remote_addr, "unhandled error: {e}");
            Response::status(crate::Status::InternalServerError)
        }
        Err(e) => {
            error!(peer = %remote_addr, "dispatch task failed: {e}");
            Response::status(crate::Status::InternalServerError)
        }
    };

    Ok(response.into_http())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT. If a handler cannot be
/// installed, that arm never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("installing Ctrl-C handler: {e}");
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
                error!("installing SIGTERM handler: {e}");
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
