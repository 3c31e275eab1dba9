//! Per-request state handed to every handler in the chain.
//!
//! - [`RequestContext`]: the request header, the parameters of the latest match and the body
//! - [`PathParams`]: named captures produced by a [`PathPattern`](crate::PathPattern) match
//! - [`ParsedBody`]: the body as decoded by [`BodyParser`](crate::middleware::BodyParser)

use bytes::Bytes;
use http::{HeaderMap, Method, Request, Uri, Version};
use serde::de::DeserializeOwned;
use thiserror::Error;
use trellis_http::protocol::{ReqBody, RequestHeader};

use crate::dispatcher::HandlerFault;

/// The request side of one dispatch.
///
/// Created once per request by the [`Dispatcher`](crate::Dispatcher) and passed mutably to each
/// matched handler in turn, so anything a middleware stores here is visible to later handlers.
#[derive(Debug)]
pub struct RequestContext {
    request_header: RequestHeader,
    path_params: PathParams,
    raw_body: ReqBody,
    body: Option<ParsedBody>,
    fault: Option<HandlerFault>,
}

impl RequestContext {
    pub fn new(request_header: RequestHeader, raw_body: ReqBody) -> Self {
        Self { request_header, path_params: PathParams::empty(), raw_body, body: None, fault: None }
    }

    pub fn request_header(&self) -> &RequestHeader {
        &self.request_header
    }

    pub fn method(&self) -> &Method {
        self.request_header.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request_header.uri()
    }

    pub fn version(&self) -> Version {
        self.request_header.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request_header.headers()
    }

    /// The request target as sent on the request line, query string included.
    pub fn request_target(&self) -> &str {
        self.request_header.request_target()
    }

    /// The path component of the request target.
    pub fn path(&self) -> &str {
        self.uri().path()
    }

    /// The declared `Content-Length`, if any.
    pub fn content_length(&self) -> Option<u64> {
        self.request_header.content_length()
    }

    /// Parameters captured by the most recent matching pattern.
    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// Shortcut for `path_params().get(name)`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name)
    }

    pub(crate) fn set_path_params(&mut self, path_params: PathParams) {
        self.path_params = path_params;
    }

    /// The raw, undecoded body bytes.
    pub fn raw_body(&self) -> &ReqBody {
        &self.raw_body
    }

    /// Takes the raw body out of the context, leaving it empty.
    pub fn take_raw_body(&mut self) -> Bytes {
        self.raw_body.take_bytes()
    }

    /// The decoded body, populated only by body middleware.
    pub fn body(&self) -> Option<&ParsedBody> {
        self.body.as_ref()
    }

    pub fn set_body(&mut self, body: ParsedBody) {
        self.body = Some(body);
    }

    /// The failure being answered; set only while the error handler runs.
    pub fn fault(&self) -> Option<&HandlerFault> {
        self.fault.as_ref()
    }

    pub(crate) fn set_fault(&mut self, fault: HandlerFault) {
        self.fault = Some(fault);
    }

    /// Deserializes the query string, treating a missing one as empty.
    pub fn query<T: DeserializeOwned>(&self) -> Result<T, RequestError> {
        let query = self.uri().query().unwrap_or("");
        serde_urlencoded::from_str(query).map_err(RequestError::InvalidQuery)
    }

    /// Deserializes the parsed JSON body.
    ///
    /// Fails with [`RequestError::MissingBody`] when no body middleware produced a JSON value.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, RequestError> {
        match &self.body {
            Some(ParsedBody::Json(value)) => T::deserialize(value).map_err(RequestError::InvalidJson),
            _ => Err(RequestError::MissingBody),
        }
    }
}

impl From<Request<ReqBody>> for RequestContext {
    fn from(request: Request<ReqBody>) -> Self {
        let (parts, body) = request.into_parts();
        Self::new(RequestHeader::from(parts), body)
    }
}

/// A request body decoded by body middleware.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Text(String),
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

impl ParsedBody {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParsedBody::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ParsedBody::Json(value) => Some(value),
            _ => None,
        }
    }

    /// First value of a form field.
    pub fn form_field(&self, name: &str) -> Option<&str> {
        match self {
            ParsedBody::Form(fields) => fields.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str()),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum RequestError {
    #[error("invalid query string: {0}")]
    InvalidQuery(#[source] serde_urlencoded::de::Error),

    #[error("invalid json body: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("request has no parsed json body")]
    MissingBody,
}

/// Named parameters captured from a request target, in template order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    entries: Vec<(String, String)>,
}

impl PathParams {
    #[inline]
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self { entries: Vec::with_capacity(capacity) }
    }

    pub(crate) fn insert(&mut self, key: &str, value: &str) {
        self.entries.push((key.to_string(), value.to_string()));
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Gets the value of a path parameter by its name
    #[inline]
    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        let key = key.as_ref();
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn context(target: &str) -> RequestContext {
        let request = Request::builder().method(Method::GET).uri(target).body(ReqBody::empty()).unwrap();
        RequestContext::from(request)
    }

    #[derive(Deserialize, Debug, PartialEq)]
    struct Page {
        page: u32,
        tag: Option<String>,
    }

    #[test]
    fn target_and_path() {
        let ctx = context("/users/7?full=1");

        assert_eq!(ctx.method(), Method::GET);
        assert_eq!(ctx.request_target(), "/users/7?full=1");
        assert_eq!(ctx.path(), "/users/7");
        assert!(ctx.path_params().is_empty());
        assert!(ctx.body().is_none());
    }

    #[test]
    fn params_are_replaced() {
        let mut ctx = context("/users/7");

        let mut params = PathParams::empty();
        params.insert("id", "7");
        ctx.set_path_params(params);
        assert_eq!(ctx.param("id"), Some("7"));

        ctx.set_path_params(PathParams::empty());
        assert_eq!(ctx.param("id"), None);
    }

    #[test]
    fn typed_query() {
        let ctx = context("/articles?page=2&tag=rust");
        assert_eq!(ctx.query::<Page>().unwrap(), Page { page: 2, tag: Some("rust".into()) });

        let ctx = context("/articles?page=two");
        assert!(matches!(ctx.query::<Page>(), Err(RequestError::InvalidQuery(_))));

        let ctx = context("/articles");
        assert!(ctx.query::<Page>().is_err());
    }

    #[test]
    fn typed_json_body() {
        let mut ctx = context("/articles");
        assert!(matches!(ctx.json::<Page>(), Err(RequestError::MissingBody)));

        ctx.set_body(ParsedBody::Json(json!({ "page": 3 })));
        assert_eq!(ctx.json::<Page>().unwrap(), Page { page: 3, tag: None });

        ctx.set_body(ParsedBody::Json(json!({ "page": "x" })));
        assert!(matches!(ctx.json::<Page>(), Err(RequestError::InvalidJson(_))));
    }

    #[test]
    fn parsed_body_accessors() {
        let form = ParsedBody::Form(vec![("name".into(), "bob".into()), ("name".into(), "alice".into())]);
        assert_eq!(form.form_field("name"), Some("bob"));
        assert_eq!(form.as_text(), None);

        let text = ParsedBody::Text("hello".into());
        assert_eq!(text.as_text(), Some("hello"));
        assert!(text.as_json().is_none());
    }

    #[test]
    fn raw_body_is_taken_once() {
        let request = Request::builder().method(Method::POST).uri("/").body(ReqBody::from("hello")).unwrap();
        let mut ctx = RequestContext::from(request);

        assert_eq!(ctx.raw_body().len(), 5);
        assert_eq!(ctx.take_raw_body(), Bytes::from_static(b"hello"));
        assert!(ctx.take_raw_body().is_empty());
    }
}
