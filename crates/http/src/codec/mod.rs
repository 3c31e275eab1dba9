//! HTTP codec module for encoding and decoding HTTP messages
//!
//! - [`RequestDecoder`]: decodes complete incoming requests (head plus buffered body)
//! - [`ResponseEncoder`]: encodes outgoing responses with a `Content-Length` framed body
//!
//! Both plug into `tokio_util::codec::{FramedRead, FramedWrite}`.
//!
//! # Example
//!
//! ```no_run
//! use trellis_http::codec::{RequestDecoder, ResponseEncoder};
//! use tokio_util::codec::{Decoder, Encoder};
//! use bytes::{Bytes, BytesMut};
//!
//! let mut decoder = RequestDecoder::new();
//! let mut request_buffer = BytesMut::new();
//! let request = decoder.decode(&mut request_buffer);
//!
//! let mut encoder = ResponseEncoder::new();
//! let mut response_buffer = BytesMut::new();
//! let response = http::Response::new(Bytes::from_static(b"pong"));
//! encoder.encode(response, &mut response_buffer).unwrap();
//! ```

mod header;
mod request_decoder;
mod response_encoder;

pub use request_decoder::DEFAULT_MAX_BODY_BYTES;
pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
