//! Common types used throughout the middleware pipeline.

use bytes::Bytes;
use futures_util::{Stream, TryStreamExt};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body::Frame;
use http_body_util::{combinators::BoxBody, BodyExt, Full, StreamBody};

/// Error type carried by response bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The HTTP request type used in the middleware pipeline.
///
/// The host collects the request body before the pipeline runs.
pub type Request = http::Request<Full<Bytes>>;

/// The body of a pipeline response. May be streamed.
pub type ResponseBody = BoxBody<Bytes, BoxError>;

/// The HTTP response type used in the middleware pipeline.
pub type Response = http::Response<ResponseBody>;

/// Wraps in-memory bytes as a response body.
pub fn full_body(bytes: impl Into<Bytes>) -> ResponseBody {
    Full::new(bytes.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Convenience constructors for handler responses.
pub trait ResponseExt {
    /// Creates a JSON response.
    fn json(status: StatusCode, value: &serde_json::Value) -> Response;

    /// Creates a `text/plain` response.
    fn text(status: StatusCode, text: impl Into<String>) -> Response;

    /// Creates a response with no body.
    fn empty(status: StatusCode) -> Response;

    /// Creates a response whose body is produced by a stream of chunks.
    fn stream<S, E>(status: StatusCode, content_type: &'static str, stream: S) -> Response
    where
        S: Stream<Item = Result<Bytes, E>> + Send + Sync + 'static,
        E: Into<BoxError> + 'static;
}

fn with_parts(status: StatusCode, content_type: Option<&'static str>, body: ResponseBody) -> Response {
    let mut response = http::Response::new(body);
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    response
}

impl ResponseExt for Response {
    fn json(status: StatusCode, value: &serde_json::Value) -> Response {
        with_parts(
            status,
            Some("application/json"),
            full_body(value.to_string()),
        )
    }

    fn text(status: StatusCode, text: impl Into<String>) -> Response {
        with_parts(
            status,
            Some("text/plain; charset=utf-8"),
            full_body(text.into()),
        )
    }

    fn empty(status: StatusCode) -> Response {
        with_parts(status, None, full_body(Bytes::new()))
    }

    fn stream<S, E>(status: StatusCode, content_type: &'static str, stream: S) -> Response
    where
        S: Stream<Item = Result<Bytes, E>> + Send + Sync + 'static,
        E: Into<BoxError> + 'static,
    {
        let frames = stream
            .map_ok(Frame::data)
            .map_err(|e| -> BoxError { e.into() });
        with_parts(status, Some(content_type), BodyExt::boxed(StreamBody::new(frames)))
    }
}
