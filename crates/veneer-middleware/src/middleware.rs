//! Core middleware trait and types.
//!
//! Middleware wraps the downstream handler: it receives the request, decides
//! whether to call [`Next::run`], and may inspect or replace what comes back.
//! Downstream outcomes are tagged results ([`HandlerResult`]), so a stage can
//! tell a normal response from a raised fault without unwinding.
//!
//! # Example
//!
//! ```
//! use veneer_middleware::{BoxFuture, Middleware, Next, Request, Response};
//! use veneer_middleware::context::MiddlewareContext;
//! use veneer_core::HandlerResult;
//!
//! struct LoggingMiddleware;
//!
//! impl Middleware for LoggingMiddleware {
//!     fn name(&self) -> &'static str {
//!         "logging"
//!     }
//!
//!     fn process<'a>(
//!         &'a self,
//!         ctx: &'a mut MiddlewareContext,
//!         request: Request,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, HandlerResult<Response>> {
//!         Box::pin(async move {
//!             let request_id = ctx.request_id();
//!             let result = next.run(ctx, request).await;
//!             println!("{request_id}: ok={}", result.is_ok());
//!             result
//!         })
//!     }
//! }
//! ```

use crate::context::MiddlewareContext;
use crate::types::{Request, Response};
use std::future::Future;
use std::pin::Pin;
use veneer_core::HandlerResult;

/// A boxed future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The core middleware trait.
///
/// Middleware MUST call `next.run()` at most once. Not calling it
/// short-circuits the pipeline.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the unique name of this middleware stage.
    fn name(&self) -> &'static str;

    /// Process the request through this middleware.
    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult<Response>>;
}

/// The terminal downstream handler invoked at the end of a chain.
pub type Downstream<'a> = Box<
    dyn FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, HandlerResult<Response>>
        + Send
        + 'a,
>;

/// Callback to invoke the next middleware in the chain.
///
/// `run` consumes `self`, so the continuation can only be invoked once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    Handler(Downstream<'a>),
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will invoke the given middleware.
    pub(crate) fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes the handler.
    pub(crate) fn handler<F>(f: F) -> Self
    where
        F: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, HandlerResult<Response>>
            + Send
            + 'a,
    {
        Self {
            inner: NextInner::Handler(Box::new(f)),
        }
    }

    /// Invokes the next middleware or handler in the chain.
    pub async fn run(self, ctx: &mut MiddlewareContext, request: Request) -> HandlerResult<Response> {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.process(ctx, request, *next).await,
            NextInner::Handler(handler) => handler(ctx, request).await,
        }
    }
}

/// A middleware created from a function.
///
/// The returned future may not borrow the context, which limits this to
/// stages that decide synchronously whether to short-circuit.
///
/// ```
/// use veneer_core::ApiFault;
/// use veneer_middleware::FnMiddleware;
///
/// let maintenance = FnMiddleware::new("maintenance", |_ctx, _req, _next| async move {
///     Err(ApiFault::unauthorized("service is in maintenance"))
/// });
/// # let _ = maintenance;
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F, Fut> FnMiddleware<F>
where
    F: Fn(&mut MiddlewareContext, Request, Next<'_>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<Response>> + Send + 'static,
{
    /// Creates a new function-based middleware.
    pub fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(&mut MiddlewareContext, Request, Next<'_>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult<Response>> + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult<Response>> {
        Box::pin((self.func)(ctx, request, next))
    }
}
