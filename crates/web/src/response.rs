//! Response side of a dispatch.
//!
//! [`ResponseContext`] collects a status and headers and is finalized exactly once through
//! [`send`](ResponseContext::send) or [`json`](ResponseContext::json). The finalized response is
//! picked up by the dispatcher and written by the transport; later finalize attempts are rejected
//! and never reach the wire.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName};
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use http_body::{Body, Frame, SizeHint};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

const TEXT_PLAIN_UTF_8: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json";

#[derive(Error, Debug)]
pub enum ResponseError {
    #[error("response has already been finalized")]
    AlreadyFinalized,

    #[error("serialize json response error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Mutable response state shared by every handler of one dispatch.
#[derive(Debug)]
pub struct ResponseContext {
    status: StatusCode,
    headers: HeaderMap,
    finalized: bool,
    response: Option<Response<ResponseBody>>,
}

impl Default for ResponseContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseContext {
    pub fn new() -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), finalized: false, response: None }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        self.status = status;
        self
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Finalizes the response with a text body.
    ///
    /// Sets `Content-Type: text/plain; charset=utf-8` unless a content type is already present.
    pub fn send(&mut self, body: impl Into<Bytes>) -> Result<(), ResponseError> {
        self.ensure_open()?;
        if !self.headers.contains_key(CONTENT_TYPE) {
            self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF_8));
        }
        self.finalize(body.into());
        Ok(())
    }

    /// Finalizes the response with `value` serialized as JSON and `Content-Type: application/json`.
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), ResponseError> {
        self.ensure_open()?;
        let body = serde_json::to_vec(value)?;
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        self.finalize(Bytes::from(body));
        Ok(())
    }

    /// Writes one of the fixed fallback responses, keeping headers set by earlier handlers.
    pub(crate) fn send_fallback(&mut self, status: StatusCode, body: &'static str) {
        if self.finalized {
            return;
        }
        self.status = status;
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN_UTF_8));
        self.finalize(Bytes::from_static(body.as_bytes()));
    }

    pub(crate) fn take_response(&mut self) -> Option<Response<ResponseBody>> {
        self.response.take()
    }

    fn ensure_open(&self) -> Result<(), ResponseError> {
        if !self.finalized {
            return Ok(());
        }
        if cfg!(debug_assertions) {
            error!(status = %self.status, "response finalized twice, the second body is dropped");
        } else {
            warn!(status = %self.status, "response finalized twice, the second body is dropped");
        }
        Err(ResponseError::AlreadyFinalized)
    }

    fn finalize(&mut self, body: Bytes) {
        let mut response = Response::new(ResponseBody::once(body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers.clone();
        self.response = Some(response);
        self.finalized = true;
    }
}

/// A fully buffered response body.
#[derive(Debug, Default)]
pub struct ResponseBody {
    inner: Option<Bytes>,
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self { inner: None }
    }

    pub fn once(bytes: Bytes) -> Self {
        if bytes.is_empty() { Self::empty() } else { Self { inner: Some(bytes) } }
    }
}

impl From<String> for ResponseBody {
    fn from(value: String) -> Self {
        Self::once(Bytes::from(value))
    }
}

impl From<&'static str> for ResponseBody {
    fn from(value: &'static str) -> Self {
        Self::once(Bytes::from_static(value.as_bytes()))
    }
}

impl From<Bytes> for ResponseBody {
    fn from(value: Bytes) -> Self {
        Self::once(value)
    }
}

impl Body for ResponseBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(self.get_mut().inner.take().map(|bytes| Ok(Frame::data(bytes))))
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.inner.as_ref().map_or(0, |bytes| bytes.len() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use serde_json::json;

    async fn body_text(response: Response<ResponseBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn send_sets_text_content_type() {
        let mut ctx = ResponseContext::new();
        ctx.send("pong").unwrap();

        assert!(ctx.is_finalized());
        let response = ctx.take_response().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain; charset=utf-8");
        assert_eq!(body_text(response).await, "pong");
    }

    #[test]
    fn send_keeps_explicit_content_type() {
        let mut ctx = ResponseContext::new();
        ctx.insert_header(CONTENT_TYPE, HeaderValue::from_static("text/html")).set_status(StatusCode::CREATED);
        ctx.send("<p>hi</p>").unwrap();

        let response = ctx.take_response().unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/html");
    }

    #[tokio::test]
    async fn json_sets_json_content_type() {
        let mut ctx = ResponseContext::new();
        ctx.json(&json!({ "ok": true })).unwrap();

        let response = ctx.take_response().unwrap();
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(body_text(response).await, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn second_finalize_is_rejected() {
        let mut ctx = ResponseContext::new();
        ctx.send("first").unwrap();

        assert!(matches!(ctx.send("second"), Err(ResponseError::AlreadyFinalized)));
        assert!(matches!(ctx.json(&json!([])), Err(ResponseError::AlreadyFinalized)));

        assert_eq!(body_text(ctx.take_response().unwrap()).await, "first");
    }

    #[test]
    fn changes_after_finalize_do_not_reach_the_response() {
        let mut ctx = ResponseContext::new();
        ctx.send("done").unwrap();
        ctx.set_status(StatusCode::IM_A_TEAPOT);

        assert_eq!(ctx.take_response().unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn fallback_keeps_headers_and_forces_text() {
        let mut ctx = ResponseContext::new();
        ctx.insert_header(HeaderName::from_static("x-request-id"), HeaderValue::from_static("42"));
        ctx.insert_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        ctx.send_fallback(StatusCode::NOT_FOUND, "Not Found");

        let response = ctx.take_response().unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers().get("x-request-id").unwrap(), "42");
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/plain; charset=utf-8");
        assert_eq!(body_text(response).await, "Not Found");
    }

    #[test]
    fn fallback_never_overwrites_a_finalized_response() {
        let mut ctx = ResponseContext::new();
        ctx.send("kept").unwrap();
        ctx.send_fallback(StatusCode::INTERNAL_SERVER_ERROR, "Server Error");

        assert_eq!(ctx.take_response().unwrap().status(), StatusCode::OK);
    }

    #[test]
    fn body_size_hint() {
        let body = ResponseBody::from("hello");
        assert_eq!(body.size_hint().exact(), Some(5));
        assert!(!body.is_end_stream());

        let body = ResponseBody::once(Bytes::new());
        assert!(body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(0));
    }
}
