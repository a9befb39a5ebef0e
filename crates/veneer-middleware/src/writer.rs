//! Envelope writer.

use crate::capture::CaptureBuffer;
use crate::classify::Classification;
use http::StatusCode;
use serde_json::Value;
use veneer_core::{ApiResponse, CapturedBody, EnvelopeError};

/// Content type of every envelope.
pub const ENVELOPE_CONTENT_TYPE: &str = "application/json";

/// Status line used to carry an envelope with `statusCode` = `status`.
///
/// HTTP forbids a body on `1xx`, `204` and `304`, and hyper drops it, so
/// those envelopes travel under `200` and keep the original code inside.
#[must_use]
pub fn wire_status(status: StatusCode) -> StatusCode {
    if status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
    {
        StatusCode::OK
    } else {
        status
    }
}

/// Builds the envelope for a classified request.
///
/// `body` is `None` on fault paths, where the downstream body is discarded.
#[must_use]
pub fn build_envelope(classification: &Classification, body: Option<CapturedBody>) -> ApiResponse {
    let data = body.map_or(Value::Null, CapturedBody::into_value);
    ApiResponse::new(
        classification.status.as_u16(),
        classification.outcome,
        data,
        classification.error.clone(),
    )
}

/// Replaces the buffer's contents with the envelope.
///
/// On error the buffer is left exactly as it was.
pub fn write_envelope(
    buffer: &mut CaptureBuffer,
    classification: &Classification,
    body: Option<CapturedBody>,
) -> Result<(), EnvelopeError> {
    let bytes = build_envelope(classification, body).to_bytes()?;

    buffer.truncate();
    buffer.write(&bytes);
    buffer.set_status(wire_status(classification.status));
    buffer.set_content_type(ENVELOPE_CONTENT_TYPE);
    Ok(())
}
