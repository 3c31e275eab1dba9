//! HTTP request decoder module
//!
//! [`RequestDecoder`] yields one complete request at a time: it parses the head with
//! [`HeaderDecoder`] and then buffers the `Content-Length` framed payload before emitting the
//! request, so handlers always see the whole body.
//!
//! # Example
//!
//! ```no_run
//! use trellis_http::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from("GET /ping HTTP/1.1\r\nHost: localhost\r\n\r\n");
//! let request = decoder.decode(&mut buffer);
//! ```

use crate::codec::header::HeaderDecoder;
use crate::ensure;
use crate::protocol::{ParseError, PayloadSize, ReqBody, RequestHeader};
use bytes::BytesMut;
use http::Request;
use tokio_util::codec::Decoder;
use tracing::trace;

/// Default upper bound for a buffered request body
pub const DEFAULT_MAX_BODY_BYTES: u64 = 1024 * 1024;

/// A decoder for HTTP requests that handles both headers and payload
///
/// The decoder keeps the parsed header in `pending` while it waits for the rest of the body:
/// - `None`: currently parsing headers
/// - `Some(..)`: header parsed, buffering `length` payload bytes
#[derive(Debug)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    pending: Option<(RequestHeader, u64)>,
    max_body_bytes: u64,
}

impl RequestDecoder {
    /// Creates a new `RequestDecoder` with the default body limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder that rejects bodies declaring more than `max_body_bytes`
    pub fn with_max_body_bytes(max_body_bytes: u64) -> Self {
        Self { max_body_bytes, ..Self::default() }
    }

    pub fn max_body_bytes(&self) -> u64 {
        self.max_body_bytes
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { header_decoder: HeaderDecoder, pending: None, max_body_bytes: DEFAULT_MAX_BODY_BYTES }
    }
}

impl Decoder for RequestDecoder {
    type Item = Request<ReqBody>;
    type Error = ParseError;

    /// - `Ok(Some(request))`: a request with its whole body was decoded
    /// - `Ok(None)`: need more data to proceed
    /// - `Err(_)`: the request is malformed or exceeds a limit
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.pending.is_none() {
            let Some((header, payload_size)) = self.header_decoder.decode(src)? else {
                return Ok(None);
            };

            match payload_size {
                PayloadSize::Empty => return Ok(Some(header.body(ReqBody::empty()))),
                PayloadSize::Length(length) => {
                    ensure!(length <= self.max_body_bytes, ParseError::too_large_body(length, self.max_body_bytes));
                    self.pending = Some((header, length));
                }
            }
        }

        let Some((_, length)) = &self.pending else {
            return Ok(None);
        };
        let length = *length;

        if (src.len() as u64) < length {
            trace!(buffered = src.len(), expected = length, "waiting for more body bytes");
            src.reserve((length as usize).saturating_sub(src.len()));
            return Ok(None);
        }

        let Some((header, _)) = self.pending.take() else {
            return Ok(None);
        };
        let body = src.split_to(length as usize).freeze();
        Ok(Some(header.body(ReqBody::once(body))))
    }
}
