//! HTTP server.
//!
//! Accepts connections with hyper and, per request:
//!
//! 1. collects the request body,
//! 2. creates a fresh [`MiddlewareContext`],
//! 3. runs the [`Pipeline`] around the downstream handler,
//! 4. records metrics from the [`EnvelopeRecord`] the envelope stage left
//!    in the context.
//!
//! A fault that escapes the pipeline (no envelope stage installed, or a
//! bypassed request failing) is answered with a bare `500`.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::net::{TcpListener, TcpStream};

use veneer_config::{ServerConfig, VeneerConfig};
use veneer_core::{ApplicationFault, HandlerResult};
use veneer_middleware::stages::EnvelopeRecord;
use veneer_middleware::{
    BoxError, BoxFuture, MiddlewareContext, Pipeline, Request, Response, ResponseExt,
};
use veneer_telemetry::{record_bypass, record_envelope, InFlightGuard};

use crate::config::{envelope_stage, request_timeout, shutdown_timeout, socket_addr};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};
use crate::ServerError;

/// Downstream handler shared across connections.
pub type BoxedHandler = Arc<
    dyn Fn(&mut MiddlewareContext, Request) -> BoxFuture<'static, HandlerResult<Response>>
        + Send
        + Sync,
>;

/// Message of the fault raised when the handler exceeds the request timeout.
pub const TIMEOUT_MESSAGE: &str = "Request timed out";

/// The Veneer HTTP server.
///
/// ```rust,ignore
/// use veneer_config::ConfigLoader;
/// use veneer_middleware::{Response, ResponseExt};
/// use veneer_server::Server;
///
/// let config = ConfigLoader::new().with_env_prefix("VENEER").load()?;
///
/// Server::from_config(&config)?
///     .handler(|ctx, _request| {
///         let caller = ctx.user_id();
///         async move {
///             Ok(Response::json(http::StatusCode::OK, &serde_json::json!({ "caller": caller })))
///         }
///     })
///     .build()
///     .run()
///     .await?;
/// ```
pub struct Server {
    config: ServerConfig,
    pipeline: Pipeline,
    handler: BoxedHandler,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}

impl Server {
    /// Creates a new server builder.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Creates a builder from a full configuration.
    ///
    /// The pipeline holds one [`ResponseEnvelopeMiddleware`] built from the
    /// `normalization` section.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::InvalidConfig` if the envelope stage cannot be
    /// built.
    ///
    /// [`ResponseEnvelopeMiddleware`]: veneer_middleware::stages::ResponseEnvelopeMiddleware
    pub fn from_config(config: &VeneerConfig) -> Result<ServerBuilder, ServerError> {
        let stage = envelope_stage(&config.normalization)?;
        Ok(Self::builder()
            .config(config.server.clone())
            .pipeline(Pipeline::builder().stage(stage).build()))
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Runs until SIGTERM or SIGINT.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured address is invalid or cannot be
    /// bound.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_with_shutdown(ShutdownSignal::with_os_signals())
            .await
    }

    /// Runs until `shutdown` is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured address is invalid or cannot be
    /// bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let addr = socket_addr(&self.config)?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        self.serve(listener, shutdown).await;
        Ok(())
    }

    /// Serves connections from an already bound listener until `shutdown`
    /// is triggered, then waits up to the shutdown timeout for open
    /// connections to finish.
    pub async fn serve(self, listener: TcpListener, shutdown: ShutdownSignal) {
        match listener.local_addr() {
            Ok(addr) => tracing::info!(%addr, stages = ?self.pipeline.stage_names(), "server listening"),
            Err(e) => tracing::warn!(error = %e, "server listening on unknown address"),
        }

        let server = Arc::new(self);
        let tracker = ConnectionTracker::new();

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, remote_addr)) => {
                        let server = Arc::clone(&server);
                        let token = tracker.acquire();
                        let shutdown = shutdown.clone();

                        tokio::spawn(async move {
                            server.handle_connection(stream, remote_addr, shutdown).await;
                            drop(token);
                        });
                    }
                    Err(e) => tracing::error!(error = %e, "failed to accept connection"),
                },
                () = shutdown.recv() => {
                    tracing::info!("shutdown signal received, no longer accepting connections");
                    break;
                }
            }
        }

        let timeout = shutdown_timeout(&server.config);
        tracing::info!(
            timeout_secs = timeout.as_secs(),
            connections = tracker.active_connections(),
            "waiting for open connections"
        );

        if tokio::time::timeout(timeout, tracker.wait_for_drain())
            .await
            .is_err()
        {
            tracing::warn!(
                connections = tracker.active_connections(),
                "shutdown timeout reached with connections still open"
            );
        }

        tracing::info!("server stopped");
    }

    async fn handle_connection(
        self: Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        shutdown: ShutdownSignal,
    ) {
        let io = TokioIo::new(stream);
        let server = Arc::clone(&self);
        let service = service_fn(move |request: http::Request<Incoming>| {
            let server = Arc::clone(&server);
            async move { Ok::<_, Infallible>(server.handle_request(request).await) }
        });

        // On shutdown, in-flight requests on this connection are allowed to finish.
        let result: Result<(), BoxError> = if self.config.http2_enabled {
            let builder = auto::Builder::new(TokioExecutor::new());
            let mut connection = pin!(builder.serve_connection(io, service));
            tokio::select! {
                result = connection.as_mut() => result,
                () = shutdown.recv() => {
                    connection.as_mut().graceful_shutdown();
                    connection.await
                }
            }
        } else {
            let mut connection = pin!(http1::Builder::new().serve_connection(io, service));
            tokio::select! {
                result = connection.as_mut() => result.map_err(Into::into),
                () = shutdown.recv() => {
                    connection.as_mut().graceful_shutdown();
                    connection.await.map_err(Into::into)
                }
            }
        };

        if let Err(e) = result {
            tracing::debug!(%remote_addr, error = %e, "connection closed with error");
        }
    }

    async fn handle_request(&self, request: http::Request<Incoming>) -> Response {
        let (parts, body) = request.into_parts();
        let bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read request body");
                return Response::empty(StatusCode::BAD_REQUEST);
            }
        };

        self.respond(http::Request::from_parts(parts, Full::new(bytes)))
            .await
    }

    /// Runs one collected request through the pipeline and handler.
    ///
    /// Never fails: a fault escaping the pipeline becomes a bare `500`.
    pub async fn respond(&self, request: Request) -> Response {
        let _in_flight = InFlightGuard::new();
        let mut ctx = MiddlewareContext::new();
        let method = request.method().clone();
        let path = request.uri().path().to_owned();

        let handler = Arc::clone(&self.handler);
        let timeout = request_timeout(&self.config);

        let result = self
            .pipeline
            .process(&mut ctx, request, move |ctx, request| {
                with_timeout((*handler)(ctx, request), timeout)
            })
            .await;

        let response = match result {
            Ok(response) => response,
            Err(fault) => {
                tracing::error!(
                    request_id = %ctx.request_id(),
                    fault_kind = fault.kind(),
                    error = %fault,
                    "fault escaped the pipeline"
                );
                Response::empty(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };

        let elapsed = ctx.elapsed();
        match ctx.get_extension::<EnvelopeRecord>() {
            Some(record) => record_envelope(record.outcome, record.status_code, elapsed),
            None => record_bypass(),
        }

        tracing::debug!(
            request_id = %ctx.request_id(),
            caller = %ctx.identity().log_id(),
            %method,
            path = %path,
            status = response.status().as_u16(),
            duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "request completed"
        );

        response
    }
}

fn with_timeout(
    future: BoxFuture<'static, HandlerResult<Response>>,
    limit: Option<Duration>,
) -> BoxFuture<'static, HandlerResult<Response>> {
    match limit {
        None => future,
        Some(limit) => Box::pin(async move {
            tokio::time::timeout(limit, future).await.unwrap_or_else(|_| {
                Err(ApplicationFault::new(StatusCode::GATEWAY_TIMEOUT, TIMEOUT_MESSAGE).into())
            })
        }),
    }
}

/// Builder for [`Server`].
#[derive(Default)]
pub struct ServerBuilder {
    config: Option<ServerConfig>,
    pipeline: Option<Pipeline>,
    handler: Option<BoxedHandler>,
}

impl ServerBuilder {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server configuration.
    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the bind address.
    #[must_use]
    pub fn http_addr(mut self, addr: impl Into<String>) -> Self {
        let config = self.config.take().unwrap_or_default();
        self.config = Some(ServerConfig {
            http_addr: addr.into(),
            ..config
        });
        self
    }

    /// Sets the middleware pipeline.
    #[must_use]
    pub fn pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Sets the downstream handler.
    ///
    /// The returned future must not borrow the context; copy what it needs
    /// out of `ctx` first.
    #[must_use]
    pub fn handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(&mut MiddlewareContext, Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult<Response>> + Send + 'static,
    {
        self.handler = Some(Arc::new(
            move |ctx: &mut MiddlewareContext, request: Request| -> BoxFuture<'static, HandlerResult<Response>> {
                Box::pin(handler(ctx, request))
            },
        ));
        self
    }

    /// Builds the server.
    ///
    /// Without a handler every request is answered `404`; without a pipeline
    /// the handler's responses are returned unwrapped.
    #[must_use]
    pub fn build(self) -> Server {
        Server {
            config: self.config.unwrap_or_default(),
            pipeline: self.pipeline.unwrap_or_default(),
            handler: self.handler.unwrap_or_else(|| {
                Arc::new(|_: &mut MiddlewareContext, _: Request| -> BoxFuture<'static, HandlerResult<Response>> {
                    Box::pin(async { Ok(Response::empty(StatusCode::NOT_FOUND)) })
                })
            }),
        }
    }
}
