//! HTTP/1 server hosting a [`JsonRouter`].
//!
//! Besides the routed API the server answers two built-in endpoints that
//! bypass the middleware pipeline:
//!
//! - `GET /health` - liveness, service name, version and uptime
//! - `GET /metrics` - Prometheus text, `404` when no recorder is installed
//!
//! Every routed request gets one deadline covering body collection and
//! dispatch. When it fires the request's cancellation token is cancelled and
//! the client receives a `408` envelope.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use configmgr_config::ServerConfig;
use configmgr_core::{Cancellation, ManagerError};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Method, Request, Response};
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tokio::net::{TcpListener, TcpStream};

use crate::error::ServerError;
use crate::json_router::{encode_error, JsonRouter};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

type HttpResponse = Response<Full<Bytes>>;

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthStatus {
    /// Always `"healthy"` while the server answers.
    pub status: &'static str,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
    /// Seconds since the server was created.
    pub uptime_seconds: u64,
}

/// The HTTP server.
///
/// ```no_run
/// use std::sync::Arc;
/// use configmgr_config::ServerConfig;
/// use configmgr_middleware::Pipeline;
/// use configmgr_plugin::{JsonRouter, Server, ShutdownSignal};
///
/// # async fn run() -> Result<(), configmgr_plugin::ServerError> {
/// let router = Arc::new(JsonRouter::new(Pipeline::builder().build()));
/// let server = Server::new(ServerConfig::default(), router);
/// server.run_with_shutdown(ShutdownSignal::with_os_signals()).await
/// # }
/// ```
pub struct Server {
    config: ServerConfig,
    router: Arc<JsonRouter>,
    service_name: String,
    service_version: String,
    started_at: Instant,
}

impl Server {
    /// Creates a server for `router`.
    pub fn new(config: ServerConfig, router: Arc<JsonRouter>) -> Self {
        Self {
            config,
            router,
            service_name: env!("CARGO_PKG_NAME").to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Instant::now(),
        }
    }

    /// Sets the name and version reported by `/health`.
    pub fn with_service(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.service_name = name.into();
        self.service_version = version.into();
        self
    }

    /// Returns the per-request deadline.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.config.request_timeout_ms)
    }

    /// Returns how long shutdown waits for open connections.
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.config.shutdown_timeout_secs)
    }

    /// Returns the current health report.
    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            status: "healthy",
            service: self.service_name.clone(),
            version: self.service_version.clone(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }

    /// Binds the configured address.
    ///
    /// # Errors
    ///
    /// [`ServerError::InvalidAddress`] or [`ServerError::Bind`].
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr: SocketAddr =
            self.config
                .http_addr
                .parse()
                .map_err(|e: std::net::AddrParseError| ServerError::InvalidAddress {
                    addr: self.config.http_addr.clone(),
                    reason: e.to_string(),
                })?;

        TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })
    }

    /// Binds the configured address and serves until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Fails if the address cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serves connections from `listener` until `shutdown` fires.
    ///
    /// On shutdown the server stops accepting, asks every open connection to
    /// finish its in-flight request, and waits up to the shutdown timeout.
    ///
    /// # Errors
    ///
    /// Fails if the listener has no local address.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "server listening");

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                result = listener.accept() => match result {
                    Ok((stream, remote_addr)) => {
                        let server = Arc::clone(&server);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(stream, shutdown).await {
                                tracing::debug!(remote = %remote_addr, error = %e, "connection error");
                            }
                            drop(token);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "failed to accept connection"),
                },
                () = shutdown.recv() => {
                    tracing::info!("shutdown requested, no longer accepting connections");
                    break;
                }
            }
        }
        drop(listener);

        let grace = server.shutdown_timeout();
        tracing::info!(
            active = tracker.active_connections(),
            grace_secs = grace.as_secs(),
            "draining connections"
        );
        if tokio::time::timeout(grace, tracker.drained()).await.is_err() {
            tracing::warn!(
                active = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            );
        }

        tracing::info!("server stopped");
        Ok(())
    }

    async fn handle_connection(
        self: &Arc<Self>,
        stream: TcpStream,
        shutdown: ShutdownSignal,
    ) -> Result<(), hyper::Error> {
        let server = Arc::clone(self);
        let service = service_fn(move |request: Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { server.handle_request(request).await }
        });

        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        tokio::pin!(conn);

        tokio::select! {
            result = conn.as_mut() => result,
            () = shutdown.recv() => {
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        }
    }

    async fn handle_request(&self, request: Request<Incoming>) -> Result<HttpResponse, Infallible> {
        match (request.method(), request.uri().path()) {
            (&Method::GET, "/health") => return Ok(self.handle_health()),
            (&Method::GET, "/metrics") => return Ok(Self::handle_metrics()),
            _ => {}
        }

        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let cancellation = Cancellation::new();

        let routed = tokio::time::timeout(
            self.request_timeout(),
            self.route(request, cancellation.clone()),
        )
        .await;

        let response = match routed {
            Ok(response) => response,
            Err(_) => {
                cancellation.cancel();
                tracing::warn!(
                    %method,
                    %path,
                    timeout_ms = self.config.request_timeout_ms,
                    "request deadline exceeded"
                );
                encode_error(
                    &ManagerError::cancelled("request deadline exceeded"),
                    None,
                )
            }
        };

        Ok(response.map(Full::new))
    }

    async fn route(&self, request: Request<Incoming>, cancellation: Cancellation) -> Response<Bytes> {
        let (parts, body) = request.into_parts();
        let limit = self.config.max_body_bytes;

        let body = match Limited::new(body, limit).collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                let err = if e.is::<http_body_util::LengthLimitError>() {
                    ManagerError::bad_request(format!("request body exceeds {limit} bytes"))
                } else {
                    ManagerError::bad_request(format!("failed to read request body: {e}"))
                };
                tracing::debug!(error = %err, "rejected request body");
                return encode_error(&err, None);
            }
        };

        self.router
            .dispatch_with(Request::from_parts(parts, body), cancellation)
            .await
    }

    fn handle_health(&self) -> HttpResponse {
        let body = serde_json::to_vec(&self.health())
            .unwrap_or_else(|_| br#"{"status":"healthy"}"#.to_vec());
        let mut response = Response::new(Full::new(Bytes::from(body)));
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }

    fn handle_metrics() -> HttpResponse {
        match configmgr_telemetry::render_metrics() {
            Some(text) => {
                let mut response = Response::new(Full::new(Bytes::from(text)));
                response.headers_mut().insert(
                    CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; version=0.0.4"),
                );
                response
            }
            None => encode_error(&ManagerError::not_found("metrics are disabled"), None)
                .map(Full::new),
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("service_name", &self.service_name)
            .field("service_version", &self.service_version)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use configmgr_middleware::Pipeline;

    fn server(addr: &str) -> Server {
        let config = ServerConfig {
            http_addr: addr.to_string(),
            shutdown_timeout_secs: 1,
            ..ServerConfig::default()
        };
        Server::new(config, Arc::new(JsonRouter::new(Pipeline::builder().build())))
    }

    #[test]
    fn test_timeouts_from_config() {
        let server = server("127.0.0.1:0");
        assert_eq!(server.request_timeout(), Duration::from_secs(30));
        assert_eq!(server.shutdown_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_health_report() {
        let health = server("127.0.0.1:0")
            .with_service("configmgr", "9.9.9")
            .health();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.service, "configmgr");
        assert_eq!(health.version, "9.9.9");
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_address() {
        let err = server("not-an-address").bind().await.unwrap_err();
        assert!(matches!(err, ServerError::InvalidAddress { addr, .. } if addr == "not-an-address"));
    }

    #[tokio::test]
    async fn test_triggered_shutdown_stops_server() {
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            server("127.0.0.1:0").run_with_shutdown(shutdown),
        )
        .await;
        assert!(matches!(result, Ok(Ok(()))));
    }
}
