//! In-memory response capture.
//!
//! [`CaptureBuffer`] stands in for the downstream response body while the
//! envelope stage decides what to send. The response head is kept as-is and
//! the body bytes live in a `BytesMut` until [`CaptureBuffer::flush`] turns
//! the pair back into a [`Response`].

use crate::types::{full_body, BoxError, Response};
use bytes::{Bytes, BytesMut};
use http::header::{HeaderValue, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING};
use http::response::Parts;
use http::StatusCode;
use http_body_util::BodyExt;
use veneer_core::CapturedBody;

/// Returns `true` if the response body carries a `content-encoding` other
/// than `identity`.
///
/// Encoded bytes cannot be classified without decoding them, so such
/// responses are never captured.
#[must_use]
pub fn is_content_encoded(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_ENCODING)
        .is_some_and(|value| !value.as_bytes().eq_ignore_ascii_case(b"identity"))
}

/// A response whose body has been drained into memory.
#[derive(Debug)]
pub struct CaptureBuffer {
    parts: Parts,
    buffer: BytesMut,
}

impl CaptureBuffer {
    /// Drains the downstream body into a buffer, keeping the response head.
    ///
    /// # Errors
    ///
    /// Returns the body's error if reading it fails part-way.
    pub async fn capture(response: Response) -> Result<Self, BoxError> {
        let (parts, body) = response.into_parts();
        let bytes = body.collect().await?.to_bytes();
        Ok(Self {
            parts,
            buffer: BytesMut::from(&bytes[..]),
        })
    }

    /// Starts an empty `500` buffer for requests whose downstream faulted.
    #[must_use]
    pub fn for_fault() -> Self {
        let (mut parts, ()) = http::Response::new(()).into_parts();
        parts.status = StatusCode::INTERNAL_SERVER_ERROR;
        Self {
            parts,
            buffer: BytesMut::new(),
        }
    }

    /// Returns the current status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.parts.status
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.parts.status = status;
    }

    /// Sets the `content-type` header.
    pub fn set_content_type(&mut self, content_type: &'static str) {
        self.parts
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }

    /// Classifies the buffered bytes. Can be called any number of times.
    #[must_use]
    pub fn body(&self) -> CapturedBody {
        CapturedBody::from_bytes(&self.buffer)
    }

    /// Returns the buffered bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Discards the buffered bytes.
    ///
    /// Any `content-encoding` no longer describes the buffer once it has
    /// been emptied, so the header is dropped too.
    pub fn truncate(&mut self) {
        self.buffer.clear();
        self.parts.headers.remove(CONTENT_ENCODING);
    }

    /// Appends bytes to the buffer.
    pub fn write(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Emits the buffered bytes as the response body.
    #[must_use]
    pub fn flush(self) -> Response {
        let Self { mut parts, buffer } = self;
        let body: Bytes = buffer.freeze();

        parts.headers.remove(TRANSFER_ENCODING);
        parts
            .headers
            .insert(CONTENT_LENGTH, HeaderValue::from(body.len()));

        http::Response::from_parts(parts, full_body(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResponseExt;
    use futures_util::stream;
    use serde_json::json;

    async fn read(response: Response) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[test]
    fn test_content_encoding_detection() {
        let mut response = Response::text(StatusCode::OK, "plain");
        assert!(!is_content_encoded(&response));

        response
            .headers_mut()
            .insert(CONTENT_ENCODING, HeaderValue::from_static("Identity"));
        assert!(!is_content_encoded(&response));

        response
            .headers_mut()
            .insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        assert!(is_content_encoded(&response));
    }

    #[tokio::test]
    async fn test_capture_keeps_head_and_bytes() {
        let mut response = Response::json(StatusCode::CREATED, &json!({"id": 1}));
        response
            .headers_mut()
            .insert("x-trace", HeaderValue::from_static("abc"));

        let buffer = CaptureBuffer::capture(response).await.unwrap();
        assert_eq!(buffer.status(), StatusCode::CREATED);
        assert_eq!(buffer.bytes(), br#"{"id":1}"#);
        assert_eq!(buffer.body(), CapturedBody::Structured(json!({"id": 1})));
        // Re-readable.
        assert_eq!(buffer.body(), CapturedBody::Structured(json!({"id": 1})));

        let flushed = buffer.flush();
        assert_eq!(flushed.headers().get("x-trace").unwrap(), "abc");
        assert_eq!(flushed.headers().get(CONTENT_LENGTH).unwrap(), "8");
        assert_eq!(&read(flushed).await[..], br#"{"id":1}"#);
    }

    #[tokio::test]
    async fn test_capture_streamed_body() {
        let chunks = stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"hel")),
            Ok(Bytes::from_static(b"lo")),
        ]);
        let response = Response::stream(StatusCode::OK, "text/plain", chunks);
        let buffer = CaptureBuffer::capture(response).await.unwrap();
        assert_eq!(buffer.body(), CapturedBody::Raw("hello".to_string()));
    }

    #[tokio::test]
    async fn test_capture_body_error() {
        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"par")),
            Err(std::io::Error::other("connection reset")),
        ]);
        let response = Response::stream(StatusCode::OK, "text/plain", chunks);
        let err = CaptureBuffer::capture(response).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_truncate_write_flush() {
        let mut response = Response::text(StatusCode::OK, "old");
        response
            .headers_mut()
            .insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        let mut buffer = CaptureBuffer::capture(response).await.unwrap();

        buffer.truncate();
        assert!(buffer.bytes().is_empty());
        buffer.write(b"new body");
        buffer.set_status(StatusCode::ACCEPTED);
        buffer.set_content_type("application/json");

        let flushed = buffer.flush();
        assert_eq!(flushed.status(), StatusCode::ACCEPTED);
        assert!(flushed.headers().get(CONTENT_ENCODING).is_none());
        assert_eq!(
            flushed.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(&read(flushed).await[..], b"new body");
    }

    #[test]
    fn test_for_fault_starts_empty() {
        let buffer = CaptureBuffer::for_fault();
        assert_eq!(buffer.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(buffer.body().is_empty());
    }
}
