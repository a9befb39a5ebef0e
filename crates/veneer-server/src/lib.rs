//! # Veneer Server
//!
//! Minimal hyper host for a Veneer pipeline:
//!
//! - HTTP/1.1, plus HTTP/2 when enabled
//! - One downstream handler behind the middleware [`Pipeline`]
//! - A fresh [`MiddlewareContext`] per request
//! - Envelope metrics recorded after every request
//! - Graceful shutdown on SIGTERM / SIGINT or an explicit [`ShutdownSignal`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use veneer_config::VeneerConfig;
//! use veneer_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     Server::from_config(&VeneerConfig::default())?
//!         .handler(|_ctx, _request| async { Ok(my_app::route().await?) })
//!         .build()
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! [`Pipeline`]: veneer_middleware::Pipeline
//! [`MiddlewareContext`]: veneer_middleware::MiddlewareContext

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
mod server;
pub mod shutdown;

pub use config::envelope_stage;
pub use error::ServerError;
pub use server::{BoxedHandler, Server, ServerBuilder, TIMEOUT_MESSAGE};
pub use shutdown::{ConnectionTracker, ShutdownSignal};
