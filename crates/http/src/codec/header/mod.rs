//! HTTP header processing for requests and responses
//!
//! - [`HeaderDecoder`]: decodes request heads from raw bytes, enforcing size and count limits
//!   and deciding how the body is framed
//! - [`HeaderEncoder`]: writes response status lines and header fields

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
