//! Request preprocessing: bypass decisions and identity extraction.

use http::{HeaderMap, HeaderName, Method};
use veneer_core::{CallerIdentity, IdentityError};

/// Default path prefix of the API documentation UI.
pub const DEFAULT_DOCS_PATH_PREFIX: &str = "/swagger";

/// Default path marker of file-download endpoints.
pub const DEFAULT_DOWNLOAD_PATH_MARKER: &str = "/Download";

/// Decides which requests skip normalization.
///
/// A request bypasses the envelope when its path starts with the docs
/// prefix, its path contains the download marker, or it is a CORS preflight
/// (`OPTIONS`) and preflight bypass is enabled. Matching is case-sensitive.
///
/// # Example
///
/// ```
/// use http::Method;
/// use veneer_middleware::preprocess::BypassRules;
///
/// let rules = BypassRules::default();
/// assert!(rules.should_bypass(&Method::GET, "/swagger/index.html"));
/// assert!(rules.should_bypass(&Method::GET, "/api/reports/Download/42"));
/// assert!(rules.should_bypass(&Method::OPTIONS, "/api/users"));
/// assert!(!rules.should_bypass(&Method::GET, "/api/users"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BypassRules {
    docs_path_prefix: String,
    download_path_marker: String,
    bypass_preflight: bool,
}

impl Default for BypassRules {
    fn default() -> Self {
        Self {
            docs_path_prefix: DEFAULT_DOCS_PATH_PREFIX.to_string(),
            download_path_marker: DEFAULT_DOWNLOAD_PATH_MARKER.to_string(),
            bypass_preflight: true,
        }
    }
}

impl BypassRules {
    /// Creates rules with the default prefix, marker and preflight bypass.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the docs path prefix.
    #[must_use]
    pub fn docs_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.docs_path_prefix = prefix.into();
        self
    }

    /// Sets the download path marker.
    #[must_use]
    pub fn download_path_marker(mut self, marker: impl Into<String>) -> Self {
        self.download_path_marker = marker.into();
        self
    }

    /// Sets whether `OPTIONS` requests bypass normalization.
    #[must_use]
    pub fn bypass_preflight(mut self, enabled: bool) -> Self {
        self.bypass_preflight = enabled;
        self
    }

    /// Returns `true` if the request must pass through untouched.
    #[must_use]
    pub fn should_bypass(&self, method: &Method, path: &str) -> bool {
        if self.bypass_preflight && *method == Method::OPTIONS {
            return true;
        }
        // An empty pattern would match every path.
        (!self.docs_path_prefix.is_empty() && path.starts_with(&self.docs_path_prefix))
            || (!self.download_path_marker.is_empty() && path.contains(&self.download_path_marker))
    }
}

/// Reads the caller identity from `header`.
///
/// Returns `Ok(None)` when the header is absent. A present but unparseable
/// value is an error.
pub fn extract_identity(
    headers: &HeaderMap,
    header: &HeaderName,
) -> Result<Option<CallerIdentity>, IdentityError> {
    let Some(value) = headers.get(header) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| IdentityError {
        header: header.to_string(),
        reason: "value is not visible ASCII".to_string(),
    })?;

    CallerIdentity::parse(header.as_str(), value).map(Some)
}

/// The default identity header name, `UserId`.
///
/// Header names are case-insensitive and [`HeaderName`] stores them
/// lowercase.
#[must_use]
pub fn default_identity_header() -> HeaderName {
    HeaderName::from_static("userid")
}
