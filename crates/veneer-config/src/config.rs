//! The root configuration document.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, LogFormat, NormalizationConfig, ServerConfig, TelemetryConfig};

/// Everything a Veneer deployment reads at startup.
///
/// Load it with [`ConfigLoader`](crate::ConfigLoader); a file may contain any
/// subset of the three sections.
///
/// ```
/// use veneer_config::VeneerConfig;
///
/// let config = VeneerConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert_eq!(config.normalization.identity_header, "UserId");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct VeneerConfig {
    /// `[server]`
    pub server: ServerConfig,

    /// `[telemetry]`
    pub telemetry: TelemetryConfig,

    /// `[normalization]`
    pub normalization: NormalizationConfig,
}

impl VeneerConfig {
    /// Validates each section in turn.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError::Invalid` found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.telemetry.validate()?;
        self.normalization.validate()
    }

    /// Local work: pretty colored `debug` logs with source locations, and
    /// fault traces in responses.
    ///
    /// ```
    /// use veneer_config::VeneerConfig;
    ///
    /// let config = VeneerConfig::development();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// assert!(config.normalization.expose_diagnostics);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        let logging = &mut config.telemetry.logging;
        logging.level = "debug".to_string();
        logging.format = LogFormat::Pretty;
        logging.ansi_enabled = true;
        logging.include_location = true;
        config.telemetry.environment = "development".to_string();
        config.normalization.expose_diagnostics = true;
        config
    }

    /// Deployed services: JSON logs at `info`, no fault traces in responses.
    ///
    /// ```
    /// use veneer_config::{LogFormat, VeneerConfig};
    ///
    /// let config = VeneerConfig::production();
    /// assert_eq!(config.telemetry.logging.format, LogFormat::Json);
    /// assert!(!config.normalization.expose_diagnostics);
    /// ```
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.telemetry.environment = "production".to_string();
        config.normalization.expose_diagnostics = false;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = VeneerConfig::default();
        assert_eq!(config.telemetry.service_name, "veneer-service");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_reports_first_bad_section() {
        let mut config = VeneerConfig::default();
        config.normalization.docs_path_prefix = String::new();
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .starts_with("normalization.docs_path_prefix"));

        config.server.http_addr = "not-an-address".to_string();
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .starts_with("server.http_addr"));
    }

    #[test]
    fn test_presets() {
        let dev = VeneerConfig::development();
        assert_eq!(dev.telemetry.logging.format, LogFormat::Pretty);
        assert!(dev.telemetry.logging.ansi_enabled);
        assert!(dev.telemetry.logging.include_location);

        let prod = VeneerConfig::production();
        assert_eq!(prod.telemetry.logging.level, "info");
        assert_eq!(prod.telemetry.environment, "production");
        assert!(!prod.normalization.expose_diagnostics);
        assert_eq!(prod.server, ServerConfig::default());
    }

    #[test]
    fn test_section_only_file() {
        let config: VeneerConfig = toml::from_str(
            r#"
                [normalization]
                identity_header = "X-Caller"
            "#,
        )
        .unwrap();
        assert_eq!(config.normalization.identity_header, "X-Caller");
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&VeneerConfig::default()).unwrap();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[normalization]"));
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result: Result<VeneerConfig, _> = toml::from_str("[authorization]\nenabled = true");
        assert!(result.is_err());
    }
}
