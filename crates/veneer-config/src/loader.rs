//! Layered configuration loading.
//!
//! Sources are applied in order, each overriding the last: built-in
//! defaults (or a preset), a configuration file, then environment variables.

use std::env;
use std::fs;
use std::path::Path;

use crate::{ConfigError, VeneerConfig};

/// Configuration loader.
///
/// # Example
///
/// ```no_run
/// use veneer_config::ConfigLoader;
///
/// # fn main() -> Result<(), veneer_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_production()
///     .with_optional_file("veneer.toml")?
///     .with_env_prefix("VENEER")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: VeneerConfig,
    env_prefix: Option<String>,
    file_loaded: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader starting from the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: VeneerConfig::default(),
            env_prefix: None,
            file_loaded: false,
        }
    }

    /// Reset to the default configuration.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = VeneerConfig::default();
        self
    }

    /// Start from the development preset.
    ///
    /// ```
    /// use veneer_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.telemetry.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = VeneerConfig::development();
        self
    }

    /// Start from the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = VeneerConfig::production();
        self
    }

    /// Load configuration from a `.toml` or `.json` file.
    ///
    /// The file replaces the current configuration; sections it omits take
    /// their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` if the file is missing or unreadable,
    /// `ConfigError::UnsupportedFormat` for other extensions, and a parse
    /// error for malformed content or unknown keys.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let file_config = Self::parse_file(&content, path)?;
        self.merge_config(file_config);
        self.file_loaded = true;

        Ok(self)
    }

    /// Load a configuration file if it exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Load configuration from a string in the given format (`toml` or
    /// `json`).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the format is unsupported or parsing fails.
    ///
    /// ```
    /// use veneer_config::ConfigLoader;
    ///
    /// let toml = r#"
    ///     [normalization]
    ///     docs_path_prefix = "/docs"
    /// "#;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string(toml, "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.normalization.docs_path_prefix, "/docs");
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        let file_config = match format.to_lowercase().as_str() {
            "toml" => toml::from_str(content)?,
            "json" => serde_json::from_str(content)?,
            _ => return Err(ConfigError::UnsupportedFormat(format.to_string())),
        };

        self.merge_config(file_config);
        Ok(self)
    }

    /// Set the prefix for environment overrides.
    ///
    /// Variables take the form `PREFIX__SECTION__KEY`, for example
    /// `VENEER__SERVER__HTTP_ADDR=0.0.0.0:9000` or
    /// `VENEER__NORMALIZATION__EXPOSE_DIAGNOSTICS=false`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Load variables from a `.env` file into the process environment.
    ///
    /// A missing `.env` file is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Err(e) if !e.not_found() => Err(e.into()),
            _ => Ok(self),
        }
    }

    /// Whether a configuration file has been loaded.
    #[must_use]
    pub fn file_loaded(&self) -> bool {
        self.file_loaded
    }

    /// Apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an environment value cannot be parsed or
    /// the final configuration is invalid.
    pub fn load(mut self) -> Result<VeneerConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_overrides(&prefix)?;
        }

        self.config.validate()?;

        Ok(self.config)
    }

    /// Return the configuration without environment overrides or
    /// validation.
    #[must_use]
    pub fn load_unvalidated(self) -> VeneerConfig {
        self.config
    }

    fn parse_file(content: &str, path: &Path) -> Result<VeneerConfig, ConfigError> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "toml" => Ok(toml::from_str(content)?),
            "json" => Ok(serde_json::from_str(content)?),
            _ => Err(ConfigError::UnsupportedFormat(extension)),
        }
    }

    // Full replace; missing sections already fell back to defaults in serde.
    fn merge_config(&mut self, file_config: VeneerConfig) {
        self.config = file_config;
    }

    fn apply_env_overrides(&mut self, prefix: &str) -> Result<(), ConfigError> {
        self.apply_env_vars(env::vars(), prefix)
    }

    /// Variables outside `{prefix}__` are not ours and are skipped.
    fn apply_env_vars<I>(&mut self, vars: I, prefix: &str) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let scoped = format!("{prefix}__");
        vars.into_iter()
            .filter(|(key, _)| key.starts_with(&scoped))
            .try_for_each(|(key, value)| self.apply_env_var(&key, &value, prefix))
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(key_without_prefix) = key
            .strip_prefix(prefix)
            .and_then(|k| k.strip_prefix("__"))
        else {
            return Ok(());
        };

        let parts: Vec<&str> = key_without_prefix.split("__").collect();
        let config = &mut self.config;

        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => {
                config.server.http_addr = value.to_string();
            }
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                config.server.shutdown_timeout_secs = parse_u64(key, value)?;
            }
            ["SERVER", "REQUEST_TIMEOUT_MS"] => {
                config.server.request_timeout_ms = parse_u64(key, value)?;
            }
            ["SERVER", "HTTP2_ENABLED"] => {
                config.server.http2_enabled = require_bool(key, value)?;
            }

            ["TELEMETRY", "SERVICE_NAME"] => {
                config.telemetry.service_name = value.to_string();
            }
            ["TELEMETRY", "SERVICE_VERSION"] => {
                config.telemetry.service_version =
                    (!value.is_empty()).then(|| value.to_string());
            }
            ["TELEMETRY", "ENVIRONMENT"] => {
                config.telemetry.environment = value.to_string();
            }
            ["TELEMETRY", "METRICS", "ENABLED"] => {
                config.telemetry.metrics.enabled = require_bool(key, value)?;
            }
            ["TELEMETRY", "METRICS", "ADDR"] => {
                config.telemetry.metrics.addr = value.to_string();
            }
            ["TELEMETRY", "LOGGING", "ENABLED"] => {
                config.telemetry.logging.enabled = require_bool(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "LEVEL"] => {
                config.telemetry.logging.level = value.to_string();
            }
            ["TELEMETRY", "LOGGING", "FORMAT"] => {
                config.telemetry.logging.format = value
                    .parse()
                    .map_err(|()| ConfigError::env(key, value, "`json` or `pretty`"))?;
            }
            ["TELEMETRY", "LOGGING", "ANSI_ENABLED"] => {
                config.telemetry.logging.ansi_enabled = require_bool(key, value)?;
            }
            ["TELEMETRY", "LOGGING", "INCLUDE_LOCATION"] => {
                config.telemetry.logging.include_location = require_bool(key, value)?;
            }

            ["NORMALIZATION", "DOCS_PATH_PREFIX"] => {
                config.normalization.docs_path_prefix = value.to_string();
            }
            ["NORMALIZATION", "DOWNLOAD_PATH_MARKER"] => {
                config.normalization.download_path_marker = value.to_string();
            }
            ["NORMALIZATION", "BYPASS_PREFLIGHT"] => {
                config.normalization.bypass_preflight = require_bool(key, value)?;
            }
            ["NORMALIZATION", "IDENTITY_HEADER"] => {
                config.normalization.identity_header = value.to_string();
            }
            ["NORMALIZATION", "EXPOSE_DIAGNOSTICS"] => {
                config.normalization.expose_diagnostics = require_bool(key, value)?;
            }

            // Unrecognized keys are ignored.
            _ => {}
        }

        Ok(())
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn require_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env(key, value, "a boolean"))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::env(key, value, "a non-negative integer"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogFormat;

    #[test]
    fn test_loader_new() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config.server.http_addr, "0.0.0.0:8080");
        assert_eq!(config.normalization.docs_path_prefix, "/swagger");
    }

    #[test]
    fn test_loader_presets() {
        let config = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(config.telemetry.logging.format, LogFormat::Pretty);

        let config = ConfigLoader::new().with_production().load().unwrap();
        assert_eq!(config.telemetry.logging.format, LogFormat::Json);
        assert!(!config.normalization.expose_diagnostics);

        let config = ConfigLoader::new()
            .with_production()
            .with_defaults()
            .load()
            .unwrap();
        assert!(config.normalization.expose_diagnostics);
    }

    #[test]
    fn test_loader_with_string_json() {
        let json = r#"{"normalization": {"identity_header": "X-User-Id"}}"#;

        let config = ConfigLoader::new()
            .with_string(json, "json")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.normalization.identity_header, "X-User-Id");
    }

    #[test]
    fn test_loader_with_string_unsupported_format() {
        let result = ConfigLoader::new().with_string("a: b", "yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(f)) if f == "yaml"));
    }

    #[test]
    fn test_loader_with_file_not_found() {
        let err = ConfigLoader::new()
            .with_file("/nonexistent/veneer.toml")
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_loader_with_optional_file_not_found() {
        let loader = ConfigLoader::new()
            .with_optional_file("/nonexistent/veneer.toml")
            .unwrap();
        assert!(!loader.file_loaded());
        assert_eq!(loader.load().unwrap(), VeneerConfig::default());
    }

    #[test]
    fn test_loader_rejects_invalid_values() {
        let toml = r#"
            [normalization]
            identity_header = "User Id"
        "#;

        let loader = ConfigLoader::new().with_string(toml, "toml").unwrap();
        assert!(loader.load().is_err());

        let unvalidated = ConfigLoader::new()
            .with_string(toml, "toml")
            .unwrap()
            .load_unvalidated();
        assert_eq!(unvalidated.normalization.identity_header, "User Id");
    }

    #[test]
    fn test_parse_bool() {
        for truthy in ["true", "TRUE", "1", "yes", "on"] {
            assert_eq!(parse_bool(truthy), Some(true), "{truthy}");
        }
        for falsy in ["false", "False", "0", "no", "off"] {
            assert_eq!(parse_bool(falsy), Some(false), "{falsy}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }

    #[test]
    fn test_apply_env_var_server() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__SERVER__HTTP_ADDR", "192.168.1.1:9000", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__SERVER__HTTP2_ENABLED", "off", "TEST")
            .unwrap();
        assert_eq!(loader.config.server.http_addr, "192.168.1.1:9000");
        assert!(!loader.config.server.http2_enabled);
    }

    #[test]
    fn test_apply_env_var_normalization() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__NORMALIZATION__DOCS_PATH_PREFIX", "/docs", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__NORMALIZATION__BYPASS_PREFLIGHT", "no", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__NORMALIZATION__EXPOSE_DIAGNOSTICS", "0", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__NORMALIZATION__IDENTITY_HEADER", "X-Caller", "TEST")
            .unwrap();

        let normalization = &loader.config.normalization;
        assert_eq!(normalization.docs_path_prefix, "/docs");
        assert!(!normalization.bypass_preflight);
        assert!(!normalization.expose_diagnostics);
        assert_eq!(normalization.identity_header, "X-Caller");
    }

    #[test]
    fn test_apply_env_var_telemetry() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__TELEMETRY__SERVICE_NAME", "billing", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__TELEMETRY__LOGGING__FORMAT", "pretty", "TEST")
            .unwrap();
        loader
            .apply_env_var("TEST__TELEMETRY__SERVICE_VERSION", "", "TEST")
            .unwrap();
        assert_eq!(loader.config.telemetry.service_name, "billing");
        assert_eq!(loader.config.telemetry.logging.format, LogFormat::Pretty);
        assert_eq!(loader.config.telemetry.service_version, None);
    }

    #[test]
    fn test_apply_env_var_errors() {
        let mut loader = ConfigLoader::new();
        let err = loader
            .apply_env_var("TEST__SERVER__REQUEST_TIMEOUT_MS", "soon", "TEST")
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"TEST__SERVER__REQUEST_TIMEOUT_MS="soon": expected a non-negative integer"#
        );
        assert!(loader
            .apply_env_var("TEST__NORMALIZATION__BYPASS_PREFLIGHT", "maybe", "TEST")
            .is_err());
        assert!(loader
            .apply_env_var("TEST__TELEMETRY__LOGGING__FORMAT", "xml", "TEST")
            .is_err());
    }

    #[test]
    fn test_apply_env_var_unknown_key_ignored() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_var("TEST__CACHE__SIZE", "10", "TEST")
            .unwrap();
        assert_eq!(loader.config, VeneerConfig::default());
    }

    #[test]
    fn test_env_vars_outside_scope_ignored() {
        let vars = [
            ("VENEER_HOME", "/opt/veneer"),
            ("VENEERX__SERVER__HTTP_ADDR", "nonsense"),
            ("VENEER__SERVER__HTTP_ADDR", "127.0.0.1:7000"),
            ("PATH", "/usr/bin"),
        ]
        .map(|(k, v)| (k.to_string(), v.to_string()));

        let mut loader = ConfigLoader::new();
        loader.apply_env_vars(vars, "VENEER").unwrap();
        assert_eq!(loader.config.server.http_addr, "127.0.0.1:7000");
        assert!(loader.load().is_ok());
    }

    #[test]
    fn test_with_dotenv_missing_file_is_ok() {
        // The workspace ships no `.env`.
        let loader = ConfigLoader::new().with_dotenv().unwrap();
        assert!(!loader.file_loaded());
    }
}
