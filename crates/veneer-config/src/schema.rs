//! Configuration sections.
//!
//! Every section is `#[serde(default)]`, so a file only names the keys it
//! changes, and `deny_unknown_fields`, so a misspelled key is an error
//! rather than a silently ignored setting.

use std::net::SocketAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// How requests are normalized into envelopes.
///
/// ```toml
/// [normalization]
/// docs_path_prefix = "/swagger"
/// download_path_marker = "/Download"
/// bypass_preflight = true
/// identity_header = "UserId"
/// expose_diagnostics = false
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizationConfig {
    /// Paths starting with this prefix (the API docs UI) skip the envelope.
    pub docs_path_prefix: String,

    /// Paths containing this marker (file downloads) skip the envelope.
    pub download_path_marker: String,

    /// CORS preflight (`OPTIONS`) requests skip the envelope.
    pub bypass_preflight: bool,

    /// Header carrying the caller's user id.
    pub identity_header: String,

    /// Unclassified faults carry their trace in `error.details`.
    pub expose_diagnostics: bool,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            docs_path_prefix: "/swagger".to_string(),
            download_path_marker: "/Download".to_string(),
            bypass_preflight: true,
            identity_header: "UserId".to_string(),
            expose_diagnostics: true,
        }
    }
}

impl NormalizationConfig {
    /// Checks that the bypass patterns are non-empty and the identity header
    /// is a legal header name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // An empty pattern would bypass every request.
        if self.docs_path_prefix.is_empty() {
            return Err(ConfigError::invalid(
                "normalization.docs_path_prefix",
                "must not be empty",
            ));
        }
        if self.download_path_marker.is_empty() {
            return Err(ConfigError::invalid(
                "normalization.download_path_marker",
                "must not be empty",
            ));
        }
        http::HeaderName::from_bytes(self.identity_header.as_bytes()).map_err(|_| {
            ConfigError::invalid(
                "normalization.identity_header",
                format!("{:?} is not a header name", self.identity_header),
            )
        })?;
        Ok(())
    }
}

/// HTTP listener settings.
///
/// ```
/// use veneer_config::ServerConfig;
///
/// let config = ServerConfig {
///     http_addr: "127.0.0.1:3000".to_string(),
///     ..Default::default()
/// };
/// assert_eq!(config.request_timeout_ms, 30_000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listen address, `host:port`.
    pub http_addr: String,

    /// How long shutdown waits for open connections to drain.
    pub shutdown_timeout_secs: u64,

    /// Upper bound on the handler, in milliseconds. `0` means unbounded.
    pub request_timeout_ms: u64,

    /// Negotiate HTTP/2 alongside HTTP/1.1.
    pub http2_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            shutdown_timeout_secs: 30,
            request_timeout_ms: 30_000,
            http2_enabled: true,
        }
    }
}

impl ServerConfig {
    /// Checks that `http_addr` is a socket address.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for `server.http_addr`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_socket_addr("server.http_addr", &self.http_addr)
    }
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => Err(()),
        }
    }
}

/// `[telemetry.logging]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Install a subscriber at all.
    pub enabled: bool,

    /// `EnvFilter` directive, e.g. `info` or `veneer_middleware=debug,hyper=warn`.
    pub level: String,

    /// Line format.
    pub format: LogFormat,

    /// Colorize output.
    pub ansi_enabled: bool,

    /// Record file and line of each event.
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormat::Json,
            ansi_enabled: false,
            include_location: false,
        }
    }
}

/// `[telemetry.metrics]`: the Prometheus scrape endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MetricsConfig {
    /// Serve the scrape endpoint.
    pub enabled: bool,

    /// Scrape endpoint address.
    pub addr: String,

    /// Bucket bounds of `veneer_request_duration_seconds`.
    pub histogram_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: "0.0.0.0:9090".to_string(),
            // 1ms .. 10s
            histogram_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

/// `[telemetry]`: who this service is, and where logs and metrics go.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Recorded on the startup log line.
    pub service_name: String,

    /// Deployed version, if known.
    pub service_version: Option<String>,

    /// Deployment environment label.
    pub environment: String,

    /// Metrics exporter.
    pub metrics: MetricsConfig,

    /// Log subscriber.
    pub logging: LoggingConfig,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "veneer-service".to_string(),
            service_version: None,
            environment: "development".to_string(),
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TelemetryConfig {
    /// Checks the metrics address when the exporter is enabled.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for `telemetry.metrics.addr`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics.enabled {
            check_socket_addr("telemetry.metrics.addr", &self.metrics.addr)?;
        }
        Ok(())
    }
}

fn check_socket_addr(key: &'static str, addr: &str) -> Result<(), ConfigError> {
    addr.parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|e| ConfigError::invalid(key, format!("{addr:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization_defaults_match_envelope_stage() {
        let config = NormalizationConfig::default();
        assert_eq!(config.docs_path_prefix, "/swagger");
        assert_eq!(config.download_path_marker, "/Download");
        assert_eq!(config.identity_header, "UserId");
        assert!(config.bypass_preflight);
        assert!(config.expose_diagnostics);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_normalization_partial_override() {
        let config: NormalizationConfig = toml::from_str(
            r#"
                docs_path_prefix = "/docs"
                expose_diagnostics = false
            "#,
        )
        .unwrap();
        assert_eq!(config.docs_path_prefix, "/docs");
        assert!(!config.expose_diagnostics);
        assert_eq!(config.download_path_marker, "/Download");
    }

    #[test]
    fn test_normalization_rejects_catch_all_patterns() {
        let config = NormalizationConfig {
            download_path_marker: String::new(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "normalization.download_path_marker",
                ..
            }
        ));
    }

    #[test]
    fn test_normalization_rejects_bad_header() {
        let config = NormalizationConfig {
            identity_header: "User Id".to_string(),
            ..Default::default()
        };
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("\"User Id\" is not a header name"));
    }

    #[test]
    fn test_server_partial_override() {
        let config: ServerConfig = toml::from_str(r#"http_addr = "127.0.0.1:3000""#).unwrap();
        assert_eq!(config.http_addr, "127.0.0.1:3000");
        assert_eq!(config.request_timeout_ms, 30_000);
        assert!(config.http2_enabled);
    }

    #[test]
    fn test_server_unknown_key_rejected() {
        let result: Result<ServerConfig, _> = toml::from_str("max_connections = 10");
        assert!(result.is_err());
    }

    #[test]
    fn test_server_addr_must_be_socket_addr() {
        let config = ServerConfig {
            http_addr: "localhost".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                key: "server.http_addr",
                ..
            })
        ));
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("Pretty".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("xml".parse::<LogFormat>().is_err());
        assert!(serde_json::from_str::<LogFormat>(r#""xml""#).is_err());
    }

    #[test]
    fn test_metrics_addr_checked_only_when_enabled() {
        let mut config = TelemetryConfig::default();
        config.metrics.addr = "nowhere".to_string();
        assert!(config.validate().is_err());

        config.metrics.enabled = false;
        assert!(config.validate().is_ok());
    }
}
