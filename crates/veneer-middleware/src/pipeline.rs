//! Ordered middleware pipeline.
//!
//! Stages run in the order they were added. The first stage sees the request
//! first and the response last:
//!
//! ```text
//! Request → stage 1 → stage 2 → … → handler
//! Response ← stage 1 ← stage 2 ← … ←──┘
//! ```

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::types::{Request, Response};
use std::sync::Arc;
use veneer_core::HandlerResult;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// An immutable, ordered middleware pipeline.
///
/// # Example
///
/// ```
/// use veneer_middleware::Pipeline;
/// use veneer_middleware::stages::ResponseEnvelopeMiddleware;
///
/// let pipeline = Pipeline::builder()
///     .stage(ResponseEnvelopeMiddleware::new())
///     .build();
///
/// assert_eq!(pipeline.stage_names(), vec!["response_envelope"]);
/// ```
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<BoxedMiddleware>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Processes a request through every stage and then the handler.
    ///
    /// The context is borrowed so the caller can read what stages recorded
    /// in it once processing finishes.
    pub async fn process<H>(
        &self,
        ctx: &mut MiddlewareContext,
        request: Request,
        handler: H,
    ) -> HandlerResult<Response>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, HandlerResult<Response>>
            + Send
            + 'static,
    {
        let next = self.build_chain(handler);
        next.run(ctx, request).await
    }

    fn build_chain<'a, H>(&'a self, handler: H) -> Next<'a>
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, HandlerResult<Response>>
            + Send
            + 'a,
    {
        let mut next = Next::handler(handler);
        for middleware in self.stages.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next
    }

    /// Returns the names of all middleware stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the number of middleware stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Builder for constructing a [`Pipeline`].
#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a middleware stage.
    #[must_use]
    pub fn stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.stages.push(Arc::new(middleware));
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        Pipeline {
            stages: self.stages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use bytes::Bytes;
    use http::{Request as HttpRequest, StatusCode};
    use http_body_util::Full;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingMiddleware {
        name: &'static str,
        counter: Arc<AtomicUsize>,
    }

    impl Middleware for CountingMiddleware {
        fn name(&self) -> &'static str {
            self.name
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, HandlerResult<Response>> {
            Box::pin(async move {
                self.counter.fetch_add(1, Ordering::SeqCst);
                next.run(ctx, request).await
            })
        }
    }

    fn make_request() -> Request {
        HttpRequest::builder()
            .uri("/test")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[test]
    fn test_empty_pipeline() {
        let pipeline = Pipeline::builder().build();
        assert_eq!(pipeline.stage_count(), 0);
        assert!(pipeline.stage_names().is_empty());
    }

    #[tokio::test]
    async fn test_every_stage_runs_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pipeline = Pipeline::builder()
            .stage(CountingMiddleware {
                name: "one",
                counter: Arc::clone(&counter),
            })
            .stage(CountingMiddleware {
                name: "two",
                counter: Arc::clone(&counter),
            })
            .build();

        assert_eq!(pipeline.stage_names(), vec!["one", "two"]);

        let mut ctx = MiddlewareContext::new();
        let response = pipeline
            .process(&mut ctx, make_request(), |_ctx, _req| {
                Box::pin(async { Ok(Response::text(StatusCode::OK, "done")) })
            })
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_handler_sees_context() {
        let pipeline = Pipeline::builder().build();
        let mut ctx = MiddlewareContext::new();
        let expected = ctx.request_id();

        let response = pipeline
            .process(&mut ctx, make_request(), move |ctx, _req| {
                let seen = ctx.request_id();
                Box::pin(async move {
                    assert_eq!(seen, expected);
                    Ok(Response::empty(StatusCode::NO_CONTENT))
                })
            })
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
