//! Observability for Veneer services.
//!
//! - **Logging**: structured JSON or pretty output through `tracing-subscriber`
//! - **Metrics**: Prometheus-format envelope metrics through the `metrics` crate
//!
//! Both are driven by the `[telemetry]` section of a
//! [`VeneerConfig`](veneer_config::VeneerConfig).
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels |
//! |--------|------|--------|
//! | `veneer_envelopes_total` | Counter | `outcome`, `status` |
//! | `veneer_request_duration_seconds` | Histogram | `outcome` |
//! | `veneer_in_flight_requests` | Gauge | - |
//! | `veneer_bypassed_requests_total` | Counter | - |
//!
//! ```text
//! # TYPE veneer_envelopes_total counter
//! veneer_envelopes_total{outcome="Success",status="200"} 1234
//! veneer_envelopes_total{outcome="UnAuthorized",status="401"} 17
//! veneer_envelopes_total{outcome="Exception",status="500"} 3
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use veneer_config::ConfigLoader;
//! use veneer_telemetry::init_telemetry;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().with_env_prefix("VENEER").load()?;
//!     init_telemetry(&config.telemetry)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod logging;
pub mod metrics;

use veneer_config::TelemetryConfig;

pub use error::TelemetryError;
pub use logging::init_logging;
pub use metrics::{init_metrics, record_bypass, record_envelope, render_metrics, InFlightGuard};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging, then metrics.
///
/// Must be called from within a Tokio runtime when metrics are enabled.
///
/// # Errors
///
/// Returns `TelemetryError` if either subsystem fails to initialize.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<()> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;

    tracing::info!(
        service = %config.service_name,
        version = config.service_version.as_deref().unwrap_or("unknown"),
        environment = %config.environment,
        "telemetry initialized"
    );
    Ok(())
}
