//! Request body decoding middleware.
//!
//! [`BodyParser`] looks at the declared `Content-Length` and `Content-Type` and stores the decoded
//! body on the [`RequestContext`]:
//!
//! | content type                         | parsed as                      |
//! |--------------------------------------|--------------------------------|
//! | `application/json`, `*/*+json`       | [`ParsedBody::Json`]           |
//! | `application/x-www-form-urlencoded`  | [`ParsedBody::Form`]           |
//! | anything else, or none               | [`ParsedBody::Text`] (UTF-8)   |
//!
//! Requests without a body pass through untouched. Malformed bodies are answered with
//! `400 Bad Request`, bodies over the configured limit with `413 Payload Too Large`.

use async_trait::async_trait;
use http::{StatusCode, header};
use mime::Mime;
use tracing::{debug, warn};
use trellis_http::codec::DEFAULT_MAX_BODY_BYTES;

use crate::handler::{HandlerResult, Next, RequestHandler};
use crate::{ParsedBody, RequestContext, ResponseContext};

#[derive(Debug, Clone, Copy)]
pub struct BodyParser {
    max_body_bytes: u64,
}

impl Default for BodyParser {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Text,
}

impl BodyParser {
    pub fn new() -> Self {
        Self { max_body_bytes: DEFAULT_MAX_BODY_BYTES }
    }

    pub fn max_body_bytes(mut self, max_body_bytes: u64) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    fn body_kind(req: &RequestContext) -> BodyKind {
        let Some(mime) = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<Mime>().ok())
        else {
            return BodyKind::Text;
        };

        if (mime.type_() == mime::APPLICATION && mime.subtype() == mime::JSON) || mime.suffix() == Some(mime::JSON) {
            BodyKind::Json
        } else if mime.type_() == mime::APPLICATION && mime.subtype() == mime::WWW_FORM_URLENCODED {
            BodyKind::Form
        } else {
            BodyKind::Text
        }
    }
}

fn reject(resp: &mut ResponseContext, status: StatusCode) -> HandlerResult {
    resp.set_status(status).send(status.canonical_reason().unwrap_or_default())?;
    Ok(Next::Halt)
}

#[async_trait]
impl RequestHandler for BodyParser {
    async fn invoke(&self, req: &mut RequestContext, resp: &mut ResponseContext) -> HandlerResult {
        if req.body().is_some() {
            return Ok(Next::Continue);
        }

        let length = match req.content_length() {
            None | Some(0) => return Ok(Next::Continue),
            Some(length) => length,
        };

        if length > self.max_body_bytes {
            warn!(length, max_body_bytes = self.max_body_bytes, "request body too large");
            return reject(resp, StatusCode::PAYLOAD_TOO_LARGE);
        }

        let kind = Self::body_kind(req);
        let bytes = req.take_raw_body();

        let parsed = match kind {
            BodyKind::Json => serde_json::from_slice(&bytes).map(ParsedBody::Json).map_err(|e| e.to_string()),
            BodyKind::Form => serde_urlencoded::from_bytes(&bytes).map(ParsedBody::Form).map_err(|e| e.to_string()),
            BodyKind::Text => String::from_utf8(bytes.to_vec()).map(ParsedBody::Text).map_err(|e| e.to_string()),
        };

        match parsed {
            Ok(body) => {
                debug!(kind = ?kind, length, "request body parsed");
                req.set_body(body);
                Ok(Next::Continue)
            }
            Err(cause) => {
                warn!(kind = ?kind, %cause, "malformed request body");
                reject(resp, StatusCode::BAD_REQUEST)
            }
        }
    }
}
