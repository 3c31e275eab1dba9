//! Failures of the transport: requests that can't be framed and responses that can't be written.

use std::fmt::Display;
use std::io;

use http::StatusCode;
use thiserror::Error;

/// Why a connection stopped serving requests.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("can't read request: {0}")]
    Request(#[from] ParseError),

    #[error("can't write response: {0}")]
    Response(#[from] SendError),
}

/// A request that could not be framed.
///
/// The connection answers with [`ParseError::status_code`] and closes.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("request head is {size} bytes, the limit is {max}")]
    TooLargeHeader { size: usize, max: usize },

    #[error("request has more than {max} headers")]
    TooManyHeaders { max: usize },

    #[error("malformed request head: {reason}")]
    InvalidHeader { reason: String },

    #[error("unsupported http version {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("missing or malformed request method")]
    InvalidMethod,

    #[error("missing or malformed request target")]
    InvalidUri,

    #[error("malformed content-length: {reason}")]
    InvalidContentLength { reason: String },

    #[error("transfer-encoding '{encoding}' is not supported")]
    UnsupportedTransferEncoding { encoding: String },

    #[error("declared body of {declared} bytes exceeds the limit of {max}")]
    TooLargeBody { declared: u64, max: u64 },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ParseError {
    pub fn too_large_header(size: usize, max: usize) -> Self {
        Self::TooLargeHeader { size, max }
    }

    pub fn too_many_headers(max: usize) -> Self {
        Self::TooManyHeaders { max }
    }

    pub fn invalid_header<R: Display>(reason: R) -> Self {
        Self::InvalidHeader { reason: reason.to_string() }
    }

    pub fn invalid_content_length<R: Display>(reason: R) -> Self {
        Self::InvalidContentLength { reason: reason.to_string() }
    }

    pub fn unsupported_transfer_encoding<E: Display>(encoding: E) -> Self {
        Self::UnsupportedTransferEncoding { encoding: encoding.to_string() }
    }

    pub fn too_large_body(declared: u64, max: u64) -> Self {
        Self::TooLargeBody { declared, max }
    }

    /// The status code the connection answers with before closing on this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ParseError::TooLargeHeader { .. } | ParseError::TooManyHeaders { .. } => {
                StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE
            }
            ParseError::TooLargeBody { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ParseError::UnsupportedTransferEncoding { .. } => StatusCode::NOT_IMPLEMENTED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// A response that could not be written.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("can't collect response body: {reason}")]
    InvalidBody { reason: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SendError {
    pub fn invalid_body<R: Display>(reason: R) -> Self {
        Self::InvalidBody { reason: reason.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_for_parse_errors() {
        assert_eq!(ParseError::too_large_header(9000, 8192).status_code(), StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE);
        assert_eq!(ParseError::too_many_headers(64).status_code(), StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE);
        assert_eq!(ParseError::too_large_body(10, 5).status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ParseError::unsupported_transfer_encoding("chunked").status_code(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(ParseError::InvalidMethod.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ParseError::invalid_content_length("not a number").status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn connection_error_names_its_side() {
        let error = HttpError::from(ParseError::too_large_body(10, 5));
        assert_eq!(error.to_string(), "can't read request: declared body of 10 bytes exceeds the limit of 5");

        let error = HttpError::from(SendError::from(io::Error::from(io::ErrorKind::BrokenPipe)));
        assert!(error.to_string().starts_with("can't write response: "));
    }
}
