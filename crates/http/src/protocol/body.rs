//! Buffered HTTP request body.
//!
//! The transport reads the whole `Content-Length` framed payload before handing the request
//! to a handler, so [`ReqBody`] is a single optional chunk with an exact size.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};

use crate::protocol::ParseError;

#[derive(Debug, Clone, Default)]
pub struct ReqBody {
    inner: Option<Bytes>,
}

impl ReqBody {
    pub fn empty() -> Self {
        Self { inner: None }
    }

    pub fn once(bytes: Bytes) -> Self {
        if bytes.is_empty() { Self::empty() } else { Self { inner: Some(bytes) } }
    }

    /// Number of bytes not yet polled out of the body
    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, Bytes::len)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// Takes the buffered bytes, leaving the body empty.
    pub fn take_bytes(&mut self) -> Bytes {
        self.inner.take().unwrap_or_default()
    }
}

impl From<Bytes> for ReqBody {
    fn from(bytes: Bytes) -> Self {
        ReqBody::once(bytes)
    }
}

impl From<&'static str> for ReqBody {
    fn from(value: &'static str) -> Self {
        ReqBody::once(Bytes::from_static(value.as_bytes()))
    }
}

impl Body for ReqBody {
    type Data = Bytes;
    type Error = ParseError;

    fn poll_frame(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Poll::Ready(self.get_mut().inner.take().map(|bytes| Ok(Frame::data(bytes))))
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.len() as u64)
    }
}
