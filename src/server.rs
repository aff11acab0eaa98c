//! HTTP server and graceful shutdown.
//!
//! # Graceful shutdown and Kubernetes
//!
//! When Kubernetes terminates a pod it sends **SIGTERM** and waits
//! `terminationGracePeriodSeconds` (default 30 s) before sending SIGKILL.
//!
//! The server reacts by:
//! 1. Immediately stopping `listener.accept()` — no new connections are made.
//! 2. Asking every open connection to close: idle keep-alive connections
//!    close at once, busy ones after their current response.
//! 3. Waiting for the connection tasks, then returning from [`Server::serve`].
//!
//! # Timeouts
//!
//! [`ServerConfig`] carries three:
//! - `read_timeout` — time allowed to receive request headers (HTTP/1)
//! - `write_timeout` — time allowed for the application to produce a
//!   response; on expiry the client gets `503`
//! - `idle_timeout` — how long a connection may sit with no request in
//!   flight before the server closes it

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::app::App;
use crate::config::ServerConfig;
use crate::error::Error;
use crate::handler::BoxedService;
use crate::json::write_string;
use crate::middleware::AccessControl;
use crate::request::Request;
use crate::writer::{ResponseBuffer, ResponseWriter};

/// The HTTP server.
pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// A server on `addr` with default timeouts.
    ///
    /// ```rust,no_run
    /// use trellis::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        Self::new(ServerConfig::new(addr))
    }

    /// Binds the configured host and serves `app` until SIGTERM or Ctrl-C,
    /// then drains open connections.
    pub async fn serve(self, app: App) -> Result<(), Error> {
        self.serve_with_shutdown(app, shutdown_signal()).await
    }

    /// Like [`serve`](Self::serve), but stops accepting when `signal` resolves.
    pub async fn serve_with_shutdown(
        self,
        app: App,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = TcpListener::bind(self.config.host.as_str()).await?;
        self.serve_listener(listener, app, signal).await
    }

    /// Serves on an already bound listener. Useful when the port is chosen by
    /// the OS (`127.0.0.1:0`) and the caller needs the address first.
    pub async fn serve_listener(
        self,
        listener: TcpListener,
        app: App,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let addr = listener.local_addr()?;
        let idle_timeout = self.config.idle_timeout;
        let dispatch = Arc::new(Dispatch {
            access_control: app.access_control().clone(),
            service: app.into_service(),
            write_timeout: self.config.write_timeout,
        });

        let mut builder = ConnBuilder::new(TokioExecutor::new());
        builder
            .http1()
            .timer(TokioTimer::new())
            .header_read_timeout(self.config.read_timeout);
        let builder = Arc::new(builder);

        // Flipped to `true` once; every connection task watches it.
        let (closing_tx, closing_rx) = watch::channel(false);

        info!(%addr, "trellis listening");

        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting right away,
                // even if more connections are queued.
                biased;

                () = &mut signal => {
                    info!(open = tasks.len(), "shutdown signal received, closing connections");
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

                    let dispatch = Arc::clone(&dispatch);
                    let builder = Arc::clone(&builder);
                    let closing = closing_rx.clone();
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        serve_connection(&builder, io, dispatch, remote_addr, idle_timeout, closing)
                            .await;
                    });
                }

                // Reap finished connection tasks so the JoinSet does not grow
                // without bound on long-running servers.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        // Fails only when no connection is left to tell.
        let _ = closing_tx.send(true);
        while tasks.join_next().await.is_some() {}

        info!("trellis stopped");
        Ok(())
    }
}

// ── Connections ───────────────────────────────────────────────────────────────

/// Drives one connection until the peer leaves, it sits idle for
/// `idle_timeout`, or the server shuts down. The last two end it gracefully:
/// a response in progress is still completed.
async fn serve_connection(
    builder: &ConnBuilder<TokioExecutor>,
    io: TokioIo<tokio::net::TcpStream>,
    dispatch: Arc<Dispatch>,
    remote_addr: SocketAddr,
    idle_timeout: Duration,
    mut closing: watch::Receiver<bool>,
) {
    let activity = Arc::new(Activity::new());

    // Called once per request on the connection.
    let svc = service_fn({
        let activity = Arc::clone(&activity);
        move |req| {
            let dispatch = Arc::clone(&dispatch);
            let activity = Arc::clone(&activity);
            async move {
                let _busy = activity.begin();
                dispatch.handle(req, remote_addr).await
            }
        }
    });

    let conn = builder.serve_connection(io, svc);
    tokio::pin!(conn);

    let mut shutting_down = false;
    loop {
        tokio::select! {
            res = conn.as_mut() => {
                if let Err(e) = res {
                    error!(peer = %remote_addr, "connection error: {e}");
                }
                break;
            }

            _ = closing.changed(), if !shutting_down => {
                shutting_down = true;
                conn.as_mut().graceful_shutdown();
            }

            () = tokio::time::sleep_until(activity.idle_deadline(idle_timeout)), if !shutting_down => {
                if activity.idle_for(idle_timeout) {
                    debug!(peer = %remote_addr, ?idle_timeout, "closing idle connection");
                    shutting_down = true;
                    conn.as_mut().graceful_shutdown();
                }
            }
        }
    }
}

/// Request activity on one connection.
struct Activity {
    opened: Instant,
    in_flight: AtomicUsize,
    /// Milliseconds after `opened` at which the last request finished.
    last_seen_ms: AtomicU64,
}

impl Activity {
    fn new() -> Self {
        Self { opened: Instant::now(), in_flight: AtomicUsize::new(0), last_seen_ms: AtomicU64::new(0) }
    }

    fn begin(&self) -> InFlight<'_> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        InFlight(self)
    }

    /// When the connection started idling, `None` while a request runs.
    fn idle_since(&self) -> Option<Instant> {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            return None;
        }
        Some(self.opened + Duration::from_millis(self.last_seen_ms.load(Ordering::SeqCst)))
    }

    /// Next moment the connection could cross `idle_timeout`.
    fn idle_deadline(&self, idle_timeout: Duration) -> Instant {
        self.idle_since().unwrap_or_else(Instant::now) + idle_timeout
    }

    fn idle_for(&self, idle_timeout: Duration) -> bool {
        self.idle_since().is_some_and(|since| since.elapsed() >= idle_timeout)
    }
}

/// Marks a request as running until dropped, including when the request
/// future is cancelled.
struct InFlight<'a>(&'a Activity);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let activity = self.0;
        let now = u64::try_from(activity.opened.elapsed().as_millis()).unwrap_or(u64::MAX);
        activity.last_seen_ms.store(now, Ordering::SeqCst);
        activity.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Everything a request needs from the server, shared by all connections.
struct Dispatch {
    service: BoxedService,
    access_control: AccessControl,
    write_timeout: Duration,
}

impl Dispatch {
    /// Reads one request, runs it through the composed service, and returns
    /// what the service wrote.
    ///
    /// The error type is [`Infallible`]: failures become 400 or 503 responses
    /// so hyper never sees an error. Those responses carry the app's CORS
    /// headers like any other.
    async fn handle(
        &self,
        req: hyper::Request<Incoming>,
        remote_addr: SocketAddr,
    ) -> Result<http::Response<Full<Bytes>>, Infallible> {
        let (parts, body) = req.into_parts();

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(peer = %remote_addr, "failed to read request body: {e}");
                return Ok(self.plain(StatusCode::BAD_REQUEST, "bad request"));
            }
        };

        let req = Request::new(http::Request::from_parts(parts, body)).with_remote_addr(remote_addr);
        let path = req.path().to_owned();

        let mut sink = ResponseBuffer::new();
        let finished = tokio::time::timeout(self.write_timeout, self.service.call(req, &mut sink)).await;
        match finished {
            Ok(()) => Ok(sink.into_response()),
            Err(_) => {
                warn!(
                    peer = %remote_addr,
                    path = %path,
                    write_timeout = ?self.write_timeout,
                    "handler timed out"
                );
                Ok(self.plain(StatusCode::SERVICE_UNAVAILABLE, "request timed out"))
            }
        }
    }

    fn plain(&self, status: StatusCode, body: &str) -> http::Response<Full<Bytes>> {
        let mut sink = ResponseBuffer::new();
        self.access_control.apply(sink.headers());
        write_string(&mut sink, status, body);
        sink.into_response()
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM (Unix) or Ctrl-C the process receives.
///
/// If a handler cannot be installed the failure is logged and that signal is
/// ignored.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    // `pending()` never resolves — on non-Unix platforms the SIGTERM arm is
    // effectively disabled.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
