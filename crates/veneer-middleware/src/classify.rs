//! Outcome classification.
//!
//! Classification is a pure function of what the downstream produced: either
//! a status code from a normal response, or a fault.
//!
//! | Downstream | Outcome | Status | `error` |
//! |---|---|---|---|
//! | `200` | `Success` | 200 | `null` |
//! | `401` | `UnAuthorized` | 401 | `null` |
//! | any other status | `Failure` | unchanged | `null` |
//! | application fault | `Exception` | the fault's | from the fault |
//! | unauthorized fault | `Exception` | 401 | `Unauthorized Access` |
//! | unclassified fault | `Exception` | 500 | root cause + trace |

use http::StatusCode;
use std::any::Any;
use veneer_core::{ApiError, ApiFault, Outcome, RequestId};

/// Message sent for unauthorized faults. The fault's own message stays in
/// the logs.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized Access";

/// The result of classifying one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Status code to emit. Always equal to the envelope's `statusCode`.
    pub status: StatusCode,
    /// Outcome category.
    pub outcome: Outcome,
    /// Error detail, present only for faults.
    pub error: Option<ApiError>,
}

/// Classifies a normal downstream response by its status code.
#[must_use]
pub fn classify_status(status: StatusCode) -> Classification {
    let outcome = match status {
        StatusCode::OK => Outcome::Success,
        StatusCode::UNAUTHORIZED => Outcome::UnauthorizedAccess,
        _ => Outcome::Failure,
    };

    Classification {
        status,
        outcome,
        error: None,
    }
}

/// Classifies a downstream fault.
///
/// `expose_diagnostics` controls whether unclassified faults carry their
/// full trace in `error.details`.
#[must_use]
pub fn classify_fault(fault: &ApiFault, expose_diagnostics: bool) -> Classification {
    let (status, error) = match fault {
        ApiFault::Application(app) => (app.status, ApiError::from(app)),
        ApiFault::Unauthorized { .. } => (StatusCode::UNAUTHORIZED, ApiError::new(UNAUTHORIZED_MESSAGE)),
        ApiFault::Unclassified(err) => {
            let error = ApiError::new(err.root_cause().to_string());
            let error = if expose_diagnostics {
                error.with_details(format!("{err:?}"))
            } else {
                error
            };
            (StatusCode::INTERNAL_SERVER_ERROR, error)
        }
    };

    Classification {
        status,
        outcome: Outcome::ExceptionRaised,
        error: Some(error),
    }
}

/// Logs a fault with everything needed to diagnose it.
pub fn log_fault(request_id: RequestId, fault: &ApiFault) {
    tracing::error!(
        request_id = %request_id,
        fault_kind = fault.kind(),
        error = %fault,
        details = ?fault,
        "request raised a fault"
    );
}

/// Converts a caught panic payload into an unclassified fault.
#[must_use]
pub fn panic_fault(payload: Box<dyn Any + Send>) -> ApiFault {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown payload".to_string()
    };

    ApiFault::unclassified(anyhow::anyhow!("handler panicked: {message}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use proptest::prelude::*;
    use veneer_core::ApplicationFault;

    #[test]
    fn test_status_mapping() {
        assert_eq!(classify_status(StatusCode::OK).outcome, Outcome::Success);
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED).outcome,
            Outcome::UnauthorizedAccess
        );
        assert_eq!(classify_status(StatusCode::CREATED).outcome, Outcome::Failure);
        assert_eq!(classify_status(StatusCode::NOT_FOUND).outcome, Outcome::Failure);
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE).outcome,
            Outcome::Failure
        );
    }

    #[test]
    fn test_application_fault() {
        let fault = ApiFault::from(
            ApplicationFault::new(StatusCode::UNPROCESSABLE_ENTITY, "Invalid name")
                .with_validation_error("name", "required"),
        );
        let c = classify_fault(&fault, true);

        assert_eq!(c.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(c.outcome, Outcome::ExceptionRaised);
        let error = c.error.unwrap();
        assert_eq!(error.message, "Invalid name");
        assert_eq!(
            error.validation_errors.unwrap().get("name"),
            Some("required")
        );
        assert!(error.details.is_none());
    }

    #[test]
    fn test_unauthorized_fault_hides_reason() {
        let c = classify_fault(&ApiFault::unauthorized("token expired at 12:00"), true);
        assert_eq!(c.status, StatusCode::UNAUTHORIZED);
        assert_eq!(c.error.unwrap().message, UNAUTHORIZED_MESSAGE);
    }

    #[test]
    fn test_unclassified_fault_root_cause_and_trace() {
        let err = Err::<(), _>(std::io::Error::other("disk full"))
            .context("saving report")
            .unwrap_err();
        let c = classify_fault(&ApiFault::from(err), true);

        assert_eq!(c.status, StatusCode::INTERNAL_SERVER_ERROR);
        let error = c.error.unwrap();
        assert_eq!(error.message, "disk full");
        let details = error.details.unwrap();
        assert!(details.contains("saving report"));
        assert!(details.contains("disk full"));
    }

    #[test]
    fn test_unclassified_fault_without_diagnostics() {
        let fault = ApiFault::unclassified(anyhow::anyhow!("boom"));
        let error = classify_fault(&fault, false).error.unwrap();
        assert_eq!(error.message, "boom");
        assert!(error.details.is_none());
    }

    #[test]
    fn test_panic_payloads() {
        let fault = panic_fault(Box::new("static str"));
        assert_eq!(fault.to_string(), "handler panicked: static str");

        let fault = panic_fault(Box::new(String::from("owned")));
        assert_eq!(fault.to_string(), "handler panicked: owned");

        let fault = panic_fault(Box::new(42_u8));
        assert_eq!(fault.to_string(), "handler panicked: unknown payload");
        assert_eq!(fault.kind(), "unclassified");
    }

    proptest! {
        #[test]
        fn prop_status_classification(code in 100_u16..=599) {
            let status = StatusCode::from_u16(code).unwrap();
            let c = classify_status(status);
            prop_assert_eq!(c.status, status);
            prop_assert!(c.error.is_none());
            let expected = match code {
                200 => Outcome::Success,
                401 => Outcome::UnauthorizedAccess,
                _ => Outcome::Failure,
            };
            prop_assert_eq!(c.outcome, expected);
        }

        #[test]
        fn prop_application_fault_status_is_emitted(code in 400_u16..=599, msg in "[a-zA-Z ]{1,30}") {
            let status = StatusCode::from_u16(code).unwrap();
            let c = classify_fault(&ApiFault::application(status, msg.clone()), true);
            prop_assert_eq!(c.status, status);
            prop_assert_eq!(c.error.unwrap().message, msg);
        }
    }
}
