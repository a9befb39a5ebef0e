//! # Veneer
//!
//! **Uniform JSON response envelopes for HTTP services**
//!
//! Veneer wraps every response an application produces in one envelope:
//!
//! ```json
//! { "statusCode": 200, "message": "Success", "data": { ... }, "error": null }
//! ```
//!
//! - **Envelope normalization** – success bodies, faults, and panics all leave
//!   in the same shape
//! - **Caller identity** – the `UserId` header is parsed once and exposed on
//!   the request context
//! - **Bypass rules** – API docs, file downloads, and CORS preflight pass
//!   through untouched
//! - **Observability** – structured logs and Prometheus metrics per envelope
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use veneer::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().with_env_prefix("VENEER").load()?;
//!     init_telemetry(&config.telemetry)?;
//!
//!     Server::from_config(&config)?
//!         .handler(|ctx, _request| {
//!             let caller = ctx.user_id();
//!             async move {
//!                 Ok(Response::json(StatusCode::OK, &serde_json::json!({ "caller": caller })))
//!             }
//!         })
//!         .build()
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → Bypass check → Identity → Handler
//!                                       ↓
//! Response ← Envelope writer ← Classify ← Capture
//! ```

#![doc(html_root_url = "https://docs.rs/veneer/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use veneer_core as core;

// Re-export middleware types
pub use veneer_middleware as middleware;

// Re-export configuration types
pub use veneer_config as config;

// Re-export logging and metrics setup
pub use veneer_telemetry as telemetry;

// Re-export server types
pub use veneer_server as server;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use veneer::prelude::*;
/// ```
pub mod prelude {
    pub use http::StatusCode;

    pub use veneer_core::{
        ApiFault, ApiResponse, ApplicationFault, CallerIdentity, HandlerResult, Outcome,
        RequestId, ValidationErrors,
    };

    pub use veneer_middleware::preprocess::BypassRules;
    pub use veneer_middleware::stages::ResponseEnvelopeMiddleware;
    pub use veneer_middleware::{
        BoxFuture, FnMiddleware, Middleware, MiddlewareContext, Next, Pipeline, Request,
        Response, ResponseExt,
    };

    pub use veneer_config::{ConfigLoader, VeneerConfig};

    pub use veneer_telemetry::init_telemetry;

    pub use veneer_server::{Server, ServerError, ShutdownSignal};
}
