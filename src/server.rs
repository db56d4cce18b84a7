//! HTTP server and graceful shutdown.
//!
//! The server is deliberately thin: it reads each request body in full,
//! runs the handler chain against a [`Response`] whose writer buffers the
//! body, closes the response and sends what was written.
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or **SIGINT** the server:
//! 1. Immediately stops `listener.accept()`; no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::fmt::Display;
use std::io;
use std::mem;
use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;
use crate::writer::ResponseWriter;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// use tsu_log::Server;
    /// let server = Server::bind(([0, 0, 0, 0], 3000));
    /// ```
    pub fn bind(addr: impl Into<SocketAddr>) -> Self {
        Self { addr: addr.into() }
    }

    /// Starts accepting connections and dispatching every request to
    /// `handler`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, handler: BoxedHandler) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;

        info!(addr = %self.addr, "tsu listening");

        let mut tasks = tokio::task::JoinSet::new();

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a SIGTERM stops accepting even if
                // more connections are queued.
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

                    let handler = handler.clone();
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| dispatch(handler.clone(), req, remote_addr));

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

        info!("tsu stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Runs one request through the handler chain.
///
/// The error type is [`Infallible`]: an unreadable body becomes
/// `400 Bad Request`, and a writer that fails to close is logged, since the
/// handler has already answered. hyper never sees an error.
///
/// The handler runs inline on the connection task, so it must not block.
async fn dispatch<B>(
    handler: BoxedHandler,
    req: http::Request<B>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible>
where
    B: hyper::body::Body,
    B::Error: Display,
{
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            let mut res = http::Response::new(Full::new(Bytes::new()));
            *res.status_mut() = StatusCode::BAD_REQUEST;
            return Ok(res);
        }
    };
    let request = Request::from_parts(parts, body).with_remote_addr(remote_addr);

    // The body travels back through `rx` rather than out of `response`: by
    // the time the chain is done, the `BodyWriter` is buried under whatever
    // writers the middleware wrapped around it.
    let (tx, rx) = oneshot::channel();
    let mut response = Response::new(BodyWriter::new(tx));

    handler.call(&mut response, &request);
    if let Err(e) = response.close() {
        error!(peer = %remote_addr, path = request.path(), "failed to close response: {e}");
    }

    // A wrapper may swallow `close` (default no-op, or an error before it
    // forwards), leaving the sender inside `response`. Dropping the response
    // drops the `BodyWriter`, which hands over its buffer on drop, so `rx`
    // always resolves once `into_parts` has run. Never await `rx` before it.
    let (status, headers) = response.into_parts();
    let body = rx.await.unwrap_or_default();

    let mut res = http::Response::new(Full::new(body));
    *res.status_mut() = status;
    *res.headers_mut() = headers;
    Ok(res)
}

/// Collects the body and hands it to [`dispatch`] when the response closes,
/// or when the writer is dropped without having been closed.
struct BodyWriter {
    buf: BytesMut,
    done: Option<oneshot::Sender<Bytes>>,
}

impl BodyWriter {
    fn new(done: oneshot::Sender<Bytes>) -> Self {
        Self { buf: BytesMut::new(), done: Some(done) }
    }

    fn send(&mut self) {
        if let Some(done) = self.done.take() {
            // The receiver only goes away if dispatch itself was dropped.
            let _ = done.send(mem::take(&mut self.buf).freeze());
        }
    }
}

impl ResponseWriter for BodyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.done.is_none() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "response already sent"));
        }
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn close(&mut self, _response: &Response) -> io::Result<()> {
        self.send();
        Ok(())
    }
}

impl Drop for BodyWriter {
    fn drop(&mut self) {
        self.send();
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available. If a handler cannot be installed the
/// corresponding arm never resolves.
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
