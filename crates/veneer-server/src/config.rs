//! Mapping from [`VeneerConfig`] sections to runtime components.

use std::net::SocketAddr;
use std::time::Duration;

use veneer_config::{NormalizationConfig, ServerConfig};
use veneer_middleware::preprocess::BypassRules;
use veneer_middleware::stages::ResponseEnvelopeMiddleware;

use crate::ServerError;

/// Builds the envelope stage described by the `normalization` section.
///
/// # Errors
///
/// Returns `ServerError::InvalidConfig` if the identity header is not a
/// valid header name.
pub fn envelope_stage(
    config: &NormalizationConfig,
) -> Result<ResponseEnvelopeMiddleware, ServerError> {
    let rules = BypassRules::new()
        .docs_path_prefix(config.docs_path_prefix.clone())
        .download_path_marker(config.download_path_marker.clone())
        .bypass_preflight(config.bypass_preflight);

    ResponseEnvelopeMiddleware::new()
        .bypass_rules(rules)
        .expose_diagnostics(config.expose_diagnostics)
        .identity_header(&config.identity_header)
        .map_err(|e| {
            ServerError::InvalidConfig(format!(
                "identity header {:?}: {e}",
                config.identity_header
            ))
        })
}

pub(crate) fn socket_addr(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
    config
        .http_addr
        .parse()
        .map_err(|e: std::net::AddrParseError| ServerError::InvalidAddress {
            addr: config.http_addr.clone(),
            reason: e.to_string(),
        })
}

pub(crate) fn shutdown_timeout(config: &ServerConfig) -> Duration {
    Duration::from_secs(config.shutdown_timeout_secs)
}

/// `None` when the timeout is disabled.
pub(crate) fn request_timeout(config: &ServerConfig) -> Option<Duration> {
    (config.request_timeout_ms > 0).then(|| Duration::from_millis(config.request_timeout_ms))
}
