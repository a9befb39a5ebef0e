//! Caller identity.
//!
//! The only authentication this layer performs is reading one header that
//! carries the caller's user id. Anything richer belongs to the host.

use crate::error::IdentityError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default name of the header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "UserId";

/// The identity of the caller making a request.
///
/// # Example
///
/// ```
/// use veneer_core::{CallerIdentity, USER_ID_HEADER};
///
/// let identity =
///     CallerIdentity::parse(USER_ID_HEADER, "0191b9f0-7c5e-7a8e-9b3c-0f1e2d3c4b5a").unwrap();
/// assert_eq!(identity.log_id(), "user:0191b9f0-7c5e-7a8e-9b3c-0f1e2d3c4b5a");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum CallerIdentity {
    /// No identity header was supplied.
    #[default]
    Anonymous,
    /// A user identified by id.
    User(Uuid),
}

impl CallerIdentity {
    /// Parses a header value into a user identity.
    ///
    /// Only the hyphenated 36-character form is accepted. Surrounding
    /// whitespace is ignored.
    pub fn parse(header: &str, value: &str) -> Result<Self, IdentityError> {
        let value = value.trim();
        let invalid = |reason: String| IdentityError {
            header: header.to_string(),
            reason,
        };

        if value.len() != 36 {
            return Err(invalid(format!(
                "expected a 36-character UUID, got {} characters",
                value.len()
            )));
        }

        Uuid::try_parse(value)
            .map(Self::User)
            .map_err(|e| invalid(e.to_string()))
    }

    /// Returns the user id, if the caller is a user.
    #[must_use]
    pub const fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::User(id) => Some(*id),
            Self::Anonymous => None,
        }
    }

    /// Returns `true` if no identity was supplied.
    #[must_use]
    pub const fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Returns a string identifier suitable for logging.
    #[must_use]
    pub fn log_id(&self) -> String {
        match self {
            Self::User(id) => format!("user:{id}"),
            Self::Anonymous => "anonymous".to_string(),
        }
    }
}
