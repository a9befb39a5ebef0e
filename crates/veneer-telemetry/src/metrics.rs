//! Prometheus metrics.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `veneer_envelopes_total` | Counter | `outcome`, `status` | Envelopes emitted |
//! | `veneer_request_duration_seconds` | Histogram | `outcome` | Request latency |
//! | `veneer_in_flight_requests` | Gauge | - | Requests being processed |
//! | `veneer_bypassed_requests_total` | Counter | - | Requests passed through unwrapped |
//!
//! Recording functions are no-ops until a recorder is installed.

use crate::error::TelemetryError;
use crate::TelemetryResult;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;
use veneer_config::MetricsConfig;
use veneer_core::Outcome;

/// Envelope counter name.
pub const ENVELOPES_TOTAL: &str = "veneer_envelopes_total";
/// Request duration histogram name.
pub const REQUEST_DURATION_SECONDS: &str = "veneer_request_duration_seconds";
/// In-flight gauge name.
pub const IN_FLIGHT_REQUESTS: &str = "veneer_in_flight_requests";
/// Bypass counter name.
pub const BYPASSED_REQUESTS_TOTAL: &str = "veneer_bypassed_requests_total";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the Prometheus recorder and spawns its scrape endpoint.
///
/// Must be called from within a Tokio runtime. Does nothing when
/// `config.enabled` is false.
///
/// # Errors
///
/// Returns `TelemetryError` if the address is invalid, no runtime is
/// available, the listener cannot be bound or a recorder is already
/// installed.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .addr
        .parse()
        .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", config.addr)))?;

    let runtime = tokio::runtime::Handle::try_current()
        .map_err(|e| TelemetryError::MetricsInit(format!("no Tokio runtime: {e}")))?;

    let (recorder, exporter) = PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(REQUEST_DURATION_SECONDS.to_string()),
            &config.histogram_buckets,
        )
        .and_then(PrometheusBuilder::build)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let handle = recorder.handle();
    metrics::set_global_recorder(recorder)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    runtime.spawn(async move {
        if let Err(e) = exporter.await {
            tracing::error!(error = ?e, "prometheus exporter stopped");
        }
    });

    let _ = METRICS_HANDLE.set(handle);
    register_metric_descriptions();

    tracing::info!(%addr, "metrics endpoint listening");
    Ok(())
}

/// Renders metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

fn register_metric_descriptions() {
    describe_counter!(ENVELOPES_TOTAL, "Total number of enveloped responses");
    describe_histogram!(
        REQUEST_DURATION_SECONDS,
        "Request duration in seconds, from context creation to envelope flush"
    );
    describe_gauge!(
        IN_FLIGHT_REQUESTS,
        "Number of requests currently being processed"
    );
    describe_counter!(
        BYPASSED_REQUESTS_TOTAL,
        "Requests passed through without an envelope"
    );
}

/// Records an emitted envelope.
pub fn record_envelope(outcome: Outcome, status_code: u16, duration: Duration) {
    counter!(
        ENVELOPES_TOTAL,
        "outcome" => outcome.label(),
        "status" => status_code.to_string()
    )
    .increment(1);

    histogram!(REQUEST_DURATION_SECONDS, "outcome" => outcome.label())
        .record(duration.as_secs_f64());
}

/// Records a request that was passed through without an envelope.
pub fn record_bypass() {
    counter!(BYPASSED_REQUESTS_TOTAL).increment(1);
}

/// Keeps `veneer_in_flight_requests` raised while alive.
#[derive(Debug)]
pub struct InFlightGuard {
    _private: (),
}

impl InFlightGuard {
    /// Increments the gauge; the matching decrement happens on drop.
    #[must_use]
    pub fn new() -> Self {
        gauge!(IN_FLIGHT_REQUESTS).increment(1.0);
        Self { _private: () }
    }
}

impl Default for InFlightGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        gauge!(IN_FLIGHT_REQUESTS).decrement(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render_with_local<F: FnOnce()>(f: F) -> String {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::with_local_recorder(&recorder, f);
        handle.render()
    }

    #[test]
    fn test_record_envelope() {
        let output = render_with_local(|| {
            record_envelope(Outcome::Success, 200, Duration::from_millis(12));
            record_envelope(Outcome::Success, 200, Duration::from_millis(8));
            record_envelope(Outcome::ExceptionRaised, 500, Duration::from_millis(3));
        });

        let success = output
            .lines()
            .find(|l| {
                l.starts_with(ENVELOPES_TOTAL)
                    && l.contains(r#"outcome="Success""#)
                    && l.contains(r#"status="200""#)
            })
            .expect("success counter line");
        assert!(success.ends_with(" 2"));

        assert!(output
            .lines()
            .any(|l| l.starts_with(ENVELOPES_TOTAL) && l.contains(r#"outcome="Exception""#)));
        assert!(output.contains(REQUEST_DURATION_SECONDS));
    }

    #[test]
    fn test_in_flight_guard() {
        let output = render_with_local(|| {
            let _first = InFlightGuard::new();
            let second = InFlightGuard::new();
            drop(second);
        });

        let line = output
            .lines()
            .find(|l| l.starts_with(IN_FLIGHT_REQUESTS))
            .expect("gauge line");
        assert!(line.ends_with(" 0"));
    }

    #[test]
    fn test_record_functions_without_recorder() {
        record_envelope(Outcome::Failure, 404, Duration::from_millis(1));
        record_bypass();
        drop(InFlightGuard::new());
    }

    #[test]
    fn test_init_metrics_disabled() {
        let config = MetricsConfig {
            enabled: false,
            addr: "invalid".to_string(),
            ..MetricsConfig::default()
        };
        assert!(init_metrics(&config).is_ok());
    }

    #[test]
    fn test_init_metrics_invalid_addr() {
        let config = MetricsConfig {
            addr: "not-an-address".to_string(),
            ..MetricsConfig::default()
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_init_metrics_outside_runtime() {
        let config = MetricsConfig {
            addr: "127.0.0.1:0".to_string(),
            ..MetricsConfig::default()
        };
        assert!(matches!(
            init_metrics(&config),
            Err(TelemetryError::MetricsInit(_))
        ));
    }
}
