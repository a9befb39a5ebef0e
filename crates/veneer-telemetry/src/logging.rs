//! Structured logging.
//!
//! One global `tracing-subscriber` registry: an [`EnvFilter`] built from
//! `telemetry.logging.level` over a JSON or pretty fmt layer. The envelope
//! stage puts `request_id` on every event, so the lines for one request can
//! be grepped together.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use veneer_config::{LogFormat, LoggingConfig};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Installs the global log subscriber. Does nothing when logging is disabled.
///
/// # Errors
///
/// Returns `TelemetryError::LoggingInit` if the level directive does not
/// parse or another subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = EnvFilter::try_new(&config.level)
        .map_err(|e| TelemetryError::LoggingInit(format!("level {:?}: {e}", config.level)))?;

    let fmt = tracing_subscriber::fmt::layer()
        .with_ansi(config.ansi_enabled)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    let layer = match config.format {
        LogFormat::Json => fmt.json().with_filter(filter).boxed(),
        LogFormat::Pretty => fmt.pretty().with_filter(filter).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}
