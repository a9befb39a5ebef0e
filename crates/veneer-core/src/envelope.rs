//! The response envelope wire format.
//!
//! Every non-bypassed response body is replaced with exactly this shape:
//!
//! ```json
//! {
//!   "statusCode": 422,
//!   "message": "Exception",
//!   "data": null,
//!   "error": {
//!     "message": "Invalid name",
//!     "validationErrors": { "name": "required" },
//!     "referenceErrorCode": null,
//!     "referenceDocumentLink": null,
//!     "details": null
//!   }
//! }
//! ```
//!
//! Absent values are serialized as explicit `null`s so the set of keys never
//! varies between responses.

use crate::error::{ApplicationFault, EnvelopeError};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The outcome category of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// The handler returned `200 OK`.
    Success,
    /// The handler returned `401 Unauthorized`.
    UnauthorizedAccess,
    /// The handler returned any other status.
    Failure,
    /// The handler raised a fault.
    ExceptionRaised,
}

impl Outcome {
    /// Returns the label written to the envelope's `message` field.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::UnauthorizedAccess => "UnAuthorized",
            Self::Failure => "Failure",
            Self::ExceptionRaised => "Exception",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Field-level validation errors: field name to message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(HashMap<String, String>);

impl ValidationErrors {
    /// Creates an empty set of validation errors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error for `field`, replacing any earlier message.
    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    /// Returns the message recorded for `field`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Returns `true` if no field has an error.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of fields with errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over `(field, message)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Error detail attached to non-success envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Human-readable message.
    pub message: String,
    /// Field-level validation errors.
    pub validation_errors: Option<ValidationErrors>,
    /// Machine-readable reference code.
    pub reference_error_code: Option<String>,
    /// Link to documentation describing the error.
    pub reference_document_link: Option<String>,
    /// Diagnostic trace. Only set for unclassified faults.
    pub details: Option<String>,
}

impl ApiError {
    /// Creates an error with only a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            validation_errors: None,
            reference_error_code: None,
            reference_document_link: None,
            details: None,
        }
    }

    /// Sets the diagnostic trace.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<&ApplicationFault> for ApiError {
    fn from(fault: &ApplicationFault) -> Self {
        Self {
            message: fault.message.clone(),
            validation_errors: fault.validation_errors.clone(),
            reference_error_code: fault.reference_code.clone(),
            reference_document_link: fault.reference_link.clone(),
            details: None,
        }
    }
}

/// The envelope written in place of every non-bypassed response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    /// HTTP status code, mirrored in the response status line.
    pub status_code: u16,
    /// Outcome label (see [`Outcome::label`]).
    pub message: String,
    /// The downstream payload, or `null`.
    pub data: serde_json::Value,
    /// Error detail, or `null` on non-fault paths.
    pub error: Option<ApiError>,
}

impl ApiResponse {
    /// Builds an envelope.
    #[must_use]
    pub fn new(
        status_code: u16,
        outcome: Outcome,
        data: serde_json::Value,
        error: Option<ApiError>,
    ) -> Self {
        Self {
            status_code,
            message: outcome.label().to_string(),
            data,
            error,
        }
    }

    /// Serializes the envelope to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] if serialization fails or yields nothing.
    pub fn to_bytes(&self) -> Result<Bytes, EnvelopeError> {
        let bytes = serde_json::to_vec(self)?;
        if bytes.is_empty() {
            return Err(EnvelopeError::Empty);
        }
        Ok(Bytes::from(bytes))
    }
}
