//! Core HTTP protocol types shared by the codec, the connection and handlers.
//!
//! - [`RequestHeader`]: request line and headers of a decoded request
//! - [`ReqBody`]: the buffered request payload, implementing `http_body::Body`
//! - [`PayloadSize`]: how many body bytes follow a decoded header
//! - [`ResponseHead`]: a response before its body is attached
//! - [`HttpError`], [`ParseError`], [`SendError`]: transport errors
//!
//! The protocol module is typically used through the connection layer rather than directly.

mod message;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;
pub(crate) use request::keep_alive;

mod response;
pub use response::ResponseHead;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;

mod body;
pub use body::ReqBody;
