//! HTTP response header handling.
//!
//! A response head is the standard `http::Response` with an empty body placeholder; the
//! encoder attaches the payload and its length when it writes the message.

use http::Response;

/// Type alias for HTTP response headers.
pub type ResponseHead = Response<()>;
