//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while initializing telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Failed to initialize metrics.
    #[error("cannot start metrics exporter: {0}")]
    MetricsInit(String),

    /// Failed to initialize logging.
    #[error("cannot install log subscriber: {0}")]
    LoggingInit(String),

    /// Failed to parse address.
    #[error("invalid metrics address {0}")]
    InvalidAddress(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::MetricsInit("failed".to_string());
        assert_eq!(err.to_string(), "cannot start metrics exporter: failed");

        let err = TelemetryError::InvalidAddress("nowhere".to_string());
        assert_eq!(err.to_string(), "invalid metrics address nowhere");
    }
}
