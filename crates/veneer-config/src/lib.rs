//! Typed configuration for Veneer services.
//!
//! A [`VeneerConfig`] is read from a TOML or JSON file, then overridden by
//! `PREFIX__SECTION__KEY` environment variables. Unknown keys are rejected.
//!
//! [`NormalizationConfig`] decides which requests skip the envelope, where the
//! caller's identity comes from and whether fault traces reach clients.
//! [`ServerConfig`] covers the listener, and [`TelemetryConfig`] covers logs
//! and metrics.
//!
//! # Example
//!
//! ```no_run
//! use veneer_config::ConfigLoader;
//!
//! # fn main() -> Result<(), veneer_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_defaults()
//!     .with_file("veneer.toml")?
//!     .with_env_prefix("VENEER")
//!     .load()?;
//!
//! println!("listening on {}", config.server.http_addr);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! shutdown_timeout_secs = 30
//! request_timeout_ms = 30000
//!
//! [telemetry]
//! service_name = "billing-api"
//! environment = "production"
//!
//! [telemetry.metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//!
//! [telemetry.logging]
//! level = "info"
//! format = "json"
//!
//! [normalization]
//! docs_path_prefix = "/swagger"
//! download_path_marker = "/Download"
//! identity_header = "UserId"
//! expose_diagnostics = false
//! ```
//!
//! # Environment Variable Overrides
//!
//! Values can be overridden with `PREFIX__SECTION__KEY` variables:
//!
//! - `VENEER__SERVER__HTTP_ADDR=0.0.0.0:9000`
//! - `VENEER__TELEMETRY__LOGGING__LEVEL=debug`
//! - `VENEER__NORMALIZATION__EXPOSE_DIAGNOSTICS=false`

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::*;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
