//! # Veneer Middleware
//!
//! Middleware pipeline and the response-envelope stage.
//!
//! The envelope stage is built from four parts, one module each:
//!
//! ```text
//! Request → [preprocess] → downstream handler
//!                                  ↓
//! Response ← [writer] ← [classify] ← [capture]
//! ```
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`preprocess`] | Bypass rules and identity extraction |
//! | [`capture`] | In-memory buffer standing in for the response body |
//! | [`classify`] | Maps a status code or fault to an outcome |
//! | [`writer`] | Serializes the envelope into the buffer |
//!
//! ## Example
//!
//! ```
//! use veneer_middleware::{MiddlewareContext, Pipeline, Request, Response, ResponseExt};
//! use veneer_middleware::stages::ResponseEnvelopeMiddleware;
//! use http::StatusCode;
//!
//! # tokio_test::block_on(async {
//! let pipeline = Pipeline::builder()
//!     .stage(ResponseEnvelopeMiddleware::new())
//!     .build();
//!
//! let request: Request = http::Request::builder()
//!     .uri("/api/ping")
//!     .body(Default::default())
//!     .unwrap();
//!
//! let mut ctx = MiddlewareContext::new();
//! let response = pipeline
//!     .process(&mut ctx, request, |_ctx, _req| {
//!         Box::pin(async { Ok(Response::text(StatusCode::OK, "pong")) })
//!     })
//!     .await
//!     .unwrap();
//!
//! assert_eq!(response.status(), StatusCode::OK);
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/veneer-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod capture;
pub mod classify;
pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod preprocess;
pub mod stages;
pub mod types;
pub mod writer;

pub use context::MiddlewareContext;
pub use middleware::{BoxFuture, Downstream, FnMiddleware, Middleware, Next};
pub use pipeline::{BoxedMiddleware, Pipeline, PipelineBuilder};
pub use types::{full_body, BoxError, Request, Response, ResponseBody, ResponseExt};
