//! HTTP request header handling.
//!
//! [`RequestHeader`] wraps the standard `http::Request<()>` and adds the few accessors the
//! transport and the dispatcher above it need: the raw request target, the declared body
//! length, and keep-alive detection.

use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version, header};

/// Represents an HTTP request header.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl AsRef<Request<()>> for RequestHeader {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl AsMut<Request<()>> for RequestHeader {
    fn as_mut(&mut self) -> &mut Request<()> {
        &mut self.inner
    }
}

impl RequestHeader {
    /// Consumes the header and returns the inner `Request<()>`.
    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Attaches a body to this header, converting it into a full `Request<T>`.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|_| body)
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// The request target as delivered on the request line, query string included.
    ///
    /// Absolute-form targets are reduced to their path and query.
    pub fn request_target(&self) -> &str {
        self.uri().path_and_query().map_or_else(|| self.uri().path(), |pq| pq.as_str())
    }

    /// The value of the `Content-Length` header, if present and well formed.
    pub fn content_length(&self) -> Option<u64> {
        self.headers().get(header::CONTENT_LENGTH)?.to_str().ok()?.trim().parse().ok()
    }

    /// Whether the connection may serve another request after this one.
    ///
    /// HTTP/1.1 defaults to keep-alive unless `Connection: close` is sent; HTTP/1.0 only keeps
    /// the connection when `Connection: keep-alive` is sent.
    pub fn keep_alive(&self) -> bool {
        keep_alive(self.version(), self.headers())
    }
}

pub(crate) fn keep_alive(version: Version, headers: &HeaderMap) -> bool {
    let connection = headers.get(header::CONNECTION).and_then(|value| value.to_str().ok());
    match version {
        Version::HTTP_10 => connection.is_some_and(|value| value.eq_ignore_ascii_case("keep-alive")),
        _ => !connection.is_some_and(|value| value.eq_ignore_ascii_case("close")),
    }
}

/// Converts request parts into a RequestHeader.
impl From<Parts> for RequestHeader {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

/// Converts a bodyless request into a RequestHeader.
impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(builder: http::request::Builder) -> RequestHeader {
        builder.body(()).unwrap().into()
    }

    #[test]
    fn request_target_keeps_query() {
        let header = build(Request::builder().uri("/search?q=rust&page=2"));
        assert_eq!(header.uri().path(), "/search");
        assert_eq!(header.request_target(), "/search?q=rust&page=2");
    }

    #[test]
    fn request_target_of_absolute_form() {
        let header = build(Request::builder().uri("http://127.0.0.1:8080/users/7?x=1"));
        assert_eq!(header.request_target(), "/users/7?x=1");
    }

    #[test]
    fn content_length_parse() {
        let header = build(Request::builder().method(Method::POST).header(header::CONTENT_LENGTH, " 42 "));
        assert_eq!(header.content_length(), Some(42));

        let header = build(Request::builder().method(Method::POST).header(header::CONTENT_LENGTH, "abc"));
        assert_eq!(header.content_length(), None);

        let header = build(Request::builder().method(Method::POST));
        assert_eq!(header.content_length(), None);
    }

    #[test]
    fn keep_alive_by_version() {
        assert!(build(Request::builder().version(Version::HTTP_11)).keep_alive());
        assert!(!build(Request::builder().version(Version::HTTP_11).header(header::CONNECTION, "close")).keep_alive());
        assert!(!build(Request::builder().version(Version::HTTP_10)).keep_alive());
        assert!(build(Request::builder().version(Version::HTTP_10).header(header::CONNECTION, "Keep-Alive")).keep_alive());
    }
}
