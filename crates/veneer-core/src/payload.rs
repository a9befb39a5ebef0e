//! Captured downstream response bodies.

use serde_json::Value;

/// A downstream response body, classified once when it is captured.
///
/// # Example
///
/// ```
/// use veneer_core::CapturedBody;
/// use serde_json::json;
///
/// assert_eq!(CapturedBody::from_bytes(b"").into_value(), json!(null));
/// assert_eq!(CapturedBody::from_bytes(b"{\"id\":1}").into_value(), json!({"id": 1}));
/// assert_eq!(CapturedBody::from_bytes(b"plain text").into_value(), json!("plain text"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum CapturedBody {
    /// No bytes, or only whitespace.
    Empty,
    /// A valid JSON document.
    Structured(Value),
    /// Anything else, decoded as UTF-8 (lossily).
    Raw(String),
}

impl CapturedBody {
    /// Classifies raw body bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Self::Empty;
        }

        match serde_json::from_slice::<Value>(bytes) {
            Ok(value) => Self::Structured(value),
            Err(_) => Self::Raw(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// Returns `true` for [`CapturedBody::Empty`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Converts the body into the value placed in the envelope's `data` field.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Empty => Value::Null,
            Self::Structured(value) => value,
            Self::Raw(text) => Value::String(text),
        }
    }
}
