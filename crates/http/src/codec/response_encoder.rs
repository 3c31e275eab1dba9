use crate::codec::header::HeaderEncoder;
use crate::protocol::{ResponseHead, SendError};
use bytes::{Bytes, BytesMut};
use http::Response;
use tokio_util::codec::Encoder;

/// Encodes a fully buffered response: head, `Content-Length`, then the body bytes.
#[derive(Debug, Default)]
pub struct ResponseEncoder {
    header_encoder: HeaderEncoder,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Encoder<Response<Bytes>> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Response<Bytes>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (parts, body) = item.into_parts();
        let head = ResponseHead::from_parts(parts, ());

        self.header_encoder.encode((head, body.len() as u64), dst)?;
        dst.extend_from_slice(&body);
        Ok(())
    }
}
