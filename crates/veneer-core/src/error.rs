//! Fault types for Veneer.
//!
//! Downstream handlers report failure through [`ApiFault`], the error half of
//! [`HandlerResult`]. The response-envelope stage catches every fault exactly
//! once and turns it into an envelope, so the three variants below are the
//! whole taxonomy a client can ever observe:
//!
//! | Variant | Envelope status | `error.message` | `error.details` |
//! |---|---|---|---|
//! | [`ApiFault::Application`] | the fault's own status | the fault's message | `null` |
//! | [`ApiFault::Unauthorized`] | `401` | `Unauthorized Access` | `null` |
//! | [`ApiFault::Unclassified`] | `500` | root-cause message | diagnostic trace |

use crate::envelope::ValidationErrors;
use http::StatusCode;
use thiserror::Error;

/// Result type returned by downstream handlers and middleware.
pub type HandlerResult<T> = Result<T, ApiFault>;

/// A fault raised while producing a response.
///
/// # Example
///
/// ```
/// use veneer_core::{ApiFault, HandlerResult};
///
/// fn load_name(raw: &str) -> HandlerResult<String> {
///     if raw.is_empty() {
///         return Err(ApiFault::validation("Invalid name", "name", "required"));
///     }
///     Ok(raw.to_string())
/// }
///
/// assert!(load_name("").is_err());
/// ```
#[derive(Error, Debug)]
pub enum ApiFault {
    /// A fault raised on purpose by business logic.
    #[error(transparent)]
    Application(#[from] ApplicationFault),

    /// The caller is not allowed to perform the operation.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Internal reason, logged but never sent to the client.
        message: String,
    },

    /// Anything else. The client sees the root cause and the full trace.
    #[error(transparent)]
    Unclassified(#[from] anyhow::Error),
}

impl ApiFault {
    /// Creates a structured application fault.
    #[must_use]
    pub fn application(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Application(ApplicationFault::new(status, message))
    }

    /// Creates a `422 Unprocessable Entity` fault carrying one field error.
    #[must_use]
    pub fn validation(
        message: impl Into<String>,
        field: impl Into<String>,
        field_message: impl Into<String>,
    ) -> Self {
        Self::Application(
            ApplicationFault::new(StatusCode::UNPROCESSABLE_ENTITY, message)
                .with_validation_error(field, field_message),
        )
    }

    /// Creates an authorization-denied fault.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Wraps an arbitrary error as an unclassified fault.
    pub fn unclassified(error: impl Into<anyhow::Error>) -> Self {
        Self::Unclassified(error.into())
    }

    /// Returns a short name for the fault kind, used as a log field.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Application(_) => "application",
            Self::Unauthorized { .. } => "unauthorized",
            Self::Unclassified(_) => "unclassified",
        }
    }
}

/// A fault that carries its own intended status and user-facing detail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ApplicationFault {
    /// Status code the client should receive.
    pub status: StatusCode,
    /// Human-readable message.
    pub message: String,
    /// Field-level validation errors, if any.
    pub validation_errors: Option<ValidationErrors>,
    /// Machine-readable reference code.
    pub reference_code: Option<String>,
    /// Link to documentation describing the error.
    pub reference_link: Option<String>,
}

impl ApplicationFault {
    /// Creates a fault with a status and a message and no further detail.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            validation_errors: None,
            reference_code: None,
            reference_link: None,
        }
    }

    /// Adds a validation error for `field`.
    #[must_use]
    pub fn with_validation_error(
        mut self,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.validation_errors
            .get_or_insert_with(ValidationErrors::new)
            .insert(field, message);
        self
    }

    /// Replaces the validation errors wholesale.
    #[must_use]
    pub fn with_validation_errors(mut self, errors: ValidationErrors) -> Self {
        self.validation_errors = Some(errors);
        self
    }

    /// Sets the reference error code.
    #[must_use]
    pub fn with_reference_code(mut self, code: impl Into<String>) -> Self {
        self.reference_code = Some(code.into());
        self
    }

    /// Sets the reference documentation link.
    #[must_use]
    pub fn with_reference_link(mut self, link: impl Into<String>) -> Self {
        self.reference_link = Some(link.into());
        self
    }
}

/// The identity header could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {header} header: {reason}")]
pub struct IdentityError {
    /// Header name that carried the bad value.
    pub header: String,
    /// Why the value was rejected.
    pub reason: String,
}

/// Serializing an envelope failed.
#[derive(Error, Debug)]
pub enum EnvelopeError {
    /// The serializer returned an error.
    #[error("failed to serialize response envelope: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The serializer produced no bytes.
    #[error("response envelope serialized to an empty body")]
    Empty,
}
