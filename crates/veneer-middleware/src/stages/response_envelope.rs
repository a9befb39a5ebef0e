//! Response envelope middleware.
//!
//! Wraps every non-bypassed response in the uniform [`ApiResponse`]
//! envelope. Per request:
//!
//! 1. **Preprocess**: bypassed requests go straight downstream and their
//!    response is returned untouched. Otherwise the identity header, if
//!    present, is parsed into the context.
//! 2. **Capture**: the downstream runs. Its response body is drained into a
//!    [`CaptureBuffer`]; faults and panics become an empty fault buffer.
//!    A response with a `content-encoding` is returned untouched, like a
//!    bypassed one.
//! 3. **Classify**: the status code or fault decides the outcome.
//! 4. **Write**: the buffer is replaced with the envelope and flushed once.
//!
//! Faults raised downstream never propagate past this stage.
//!
//! # Example
//!
//! ```
//! use veneer_middleware::preprocess::BypassRules;
//! use veneer_middleware::stages::ResponseEnvelopeMiddleware;
//!
//! let envelope = ResponseEnvelopeMiddleware::new()
//!     .bypass_rules(BypassRules::new().docs_path_prefix("/docs"))
//!     .expose_diagnostics(false);
//! # let _ = envelope;
//! ```
//!
//! [`ApiResponse`]: veneer_core::ApiResponse

use crate::capture::{is_content_encoded, CaptureBuffer};
use crate::classify::{classify_fault, classify_status, log_fault, panic_fault, Classification};
use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::preprocess::{default_identity_header, extract_identity, BypassRules};
use crate::types::{Request, Response};
use crate::writer::write_envelope;
use futures_util::FutureExt;
use http::header::InvalidHeaderName;
use http::{HeaderName, StatusCode};
use std::panic::AssertUnwindSafe;
use veneer_core::{ApiFault, CapturedBody, HandlerResult, Outcome, USER_ID_HEADER};

/// What the stage emitted, stored in the context for metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeRecord {
    /// Outcome category.
    pub outcome: Outcome,
    /// Emitted status code.
    pub status_code: u16,
}

/// Middleware that normalizes responses into the envelope format.
#[derive(Debug, Clone)]
pub struct ResponseEnvelopeMiddleware {
    bypass: BypassRules,
    identity_header: HeaderName,
    /// Header name as configured, used in client-facing messages.
    identity_label: String,
    expose_diagnostics: bool,
}

impl Default for ResponseEnvelopeMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseEnvelopeMiddleware {
    /// Creates the stage with default bypass rules, the `UserId` identity
    /// header and diagnostics exposed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bypass: BypassRules::default(),
            identity_header: default_identity_header(),
            identity_label: USER_ID_HEADER.to_string(),
            expose_diagnostics: true,
        }
    }

    /// Sets the bypass rules.
    #[must_use]
    pub fn bypass_rules(mut self, rules: BypassRules) -> Self {
        self.bypass = rules;
        self
    }

    /// Sets the header the caller identity is read from.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid header name.
    pub fn identity_header(mut self, name: &str) -> Result<Self, InvalidHeaderName> {
        self.identity_header = HeaderName::from_bytes(name.as_bytes())?;
        self.identity_label = name.to_string();
        Ok(self)
    }

    /// Sets whether unclassified faults carry their trace in
    /// `error.details`.
    #[must_use]
    pub fn expose_diagnostics(mut self, expose: bool) -> Self {
        self.expose_diagnostics = expose;
        self
    }

    /// Returns the bypass rules.
    #[must_use]
    pub fn rules(&self) -> &BypassRules {
        &self.bypass
    }

    /// Reads the identity header, then runs the downstream with panics
    /// caught.
    ///
    /// A malformed identity header is an unclassified fault: the downstream
    /// never runs and the client gets a `500` envelope.
    async fn run_downstream(
        &self,
        ctx: &mut MiddlewareContext,
        request: Request,
        next: Next<'_>,
    ) -> HandlerResult<Response> {
        match extract_identity(request.headers(), &self.identity_header) {
            Ok(Some(identity)) => ctx.set_identity(identity),
            Ok(None) => {}
            Err(mut e) => {
                e.header.clone_from(&self.identity_label);
                return Err(ApiFault::unclassified(e));
            }
        }

        AssertUnwindSafe(next.run(ctx, request))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(panic_fault(payload)))
    }

    fn fault_path(
        &self,
        ctx: &MiddlewareContext,
        fault: &ApiFault,
    ) -> (CaptureBuffer, Classification, Option<CapturedBody>) {
        log_fault(ctx.request_id(), fault);
        (
            CaptureBuffer::for_fault(),
            classify_fault(fault, self.expose_diagnostics),
            None,
        )
    }
}

impl Middleware for ResponseEnvelopeMiddleware {
    fn name(&self) -> &'static str {
        "response_envelope"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult<Response>> {
        Box::pin(async move {
            if self
                .bypass
                .should_bypass(request.method(), request.uri().path())
            {
                tracing::debug!(
                    request_id = %ctx.request_id(),
                    method = %request.method(),
                    path = request.uri().path(),
                    "bypassing response envelope"
                );
                return next.run(ctx, request).await;
            }

            let (mut buffer, classification, body) =
                match self.run_downstream(ctx, request, next).await {
                    Ok(response) if is_content_encoded(&response) => {
                        tracing::debug!(
                            request_id = %ctx.request_id(),
                            status = response.status().as_u16(),
                            "passing encoded response through without envelope"
                        );
                        return Ok(response);
                    }
                    Ok(response) => match CaptureBuffer::capture(response).await {
                        Ok(buffer) => {
                            let classification = classify_status(buffer.status());
                            let body = buffer.body();
                            (buffer, classification, Some(body))
                        }
                        Err(e) => {
                            let fault = ApiFault::unclassified(anyhow::anyhow!(
                                "failed to read response body: {e}"
                            ));
                            self.fault_path(ctx, &fault)
                        }
                    },
                    Err(fault) => self.fault_path(ctx, &fault),
                };

            match write_envelope(&mut buffer, &classification, body) {
                Ok(()) => {
                    tracing::debug!(
                        request_id = %ctx.request_id(),
                        outcome = %classification.outcome,
                        status = classification.status.as_u16(),
                        "response enveloped"
                    );
                    ctx.set_extension(EnvelopeRecord {
                        outcome: classification.outcome,
                        status_code: classification.status.as_u16(),
                    });
                }
                Err(e) => {
                    tracing::error!(
                        request_id = %ctx.request_id(),
                        error = %e,
                        "failed to write response envelope, sending original body"
                    );
                }
            }

            Ok(buffer.flush())
        })
    }
}
