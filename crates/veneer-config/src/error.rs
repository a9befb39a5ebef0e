//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

/// Why a configuration could not be loaded.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read (including when it does not exist).
    #[error("cannot read config file {}", path.display())]
    Read {
        /// File that was requested.
        path: PathBuf,
        /// I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Neither `toml` nor `json`.
    #[error("unsupported config format {0:?}, expected toml or json")]
    UnsupportedFormat(String),

    /// The TOML document is malformed or has unknown keys.
    #[error("malformed TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// The JSON document is malformed or has unknown keys.
    #[error("malformed JSON config: {0}")]
    Json(#[from] serde_json::Error),

    /// A `.env` file exists but could not be parsed.
    #[error("cannot load .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),

    /// An override variable does not hold the expected kind of value.
    #[error("{var}={value:?}: expected {expected}")]
    Env {
        /// Variable name.
        var: String,
        /// Value as found.
        value: String,
        /// What the key accepts.
        expected: &'static str,
    },

    /// A loaded value fails validation.
    #[error("{key}: {reason}")]
    Invalid {
        /// Dotted key, e.g. `normalization.identity_header`.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }

    pub(crate) fn env(var: &str, value: &str, expected: &'static str) -> Self {
        Self::Env {
            var: var.to_string(),
            value: value.to_string(),
            expected,
        }
    }

    /// `true` when the requested config file does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_env_error_names_variable_and_value() {
        let err = ConfigError::env("VENEER__SERVER__HTTP2_ENABLED", "maybe", "a boolean");
        assert_eq!(
            err.to_string(),
            r#"VENEER__SERVER__HTTP2_ENABLED="maybe": expected a boolean"#
        );
    }

    #[test]
    fn test_invalid_error_names_key() {
        let err = ConfigError::invalid("normalization.identity_header", "not a header name");
        assert_eq!(
            err.to_string(),
            "normalization.identity_header: not a header name"
        );
    }

    #[test]
    fn test_read_error_keeps_source() {
        let err = ConfigError::Read {
            path: PathBuf::from("/etc/veneer/veneer.toml"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.is_not_found());
        assert!(err.to_string().contains("/etc/veneer/veneer.toml"));
        assert!(err.source().is_some());

        assert!(!ConfigError::UnsupportedFormat("yaml".to_string()).is_not_found());
    }
}
