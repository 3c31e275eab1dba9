use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::{HeaderValue, Request, Response, StatusCode, header};
use http_body::Body;
use http_body_util::BodyExt;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::handler::Handler;
use crate::protocol::{HttpError, ReqBody, SendError, keep_alive};

use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info};

/// An HTTP connection that reads requests, hands them to a [`Handler`] and writes the responses
///
/// Requests on one connection are served strictly one after another. The connection stays open
/// until the peer closes it, a request opts out of keep-alive, or a request fails to decode.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_decoder(reader, writer, RequestDecoder::new())
    }

    pub fn with_decoder(reader: R, writer: W, decoder: RequestDecoder) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, decoder, 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
        }
    }

    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
        <H::RespBody as Body>::Error: Display,
    {
        loop {
            match self.framed_read.next().await {
                Some(Ok(request)) => {
                    let keep_alive = keep_alive(request.version(), request.headers());
                    self.do_process(request, &handler, keep_alive).await?;
                    if !keep_alive {
                        debug!("request opted out of keep-alive, close connection");
                        return Ok(());
                    }
                }

                Some(Err(e)) => {
                    error!(cause = %e, "can't receive next request");
                    let error_response = build_error_response(e.status_code());
                    self.framed_write.send(error_response).await?;
                    return Err(e.into());
                }

                None => {
                    info!("cant read more request, break this connection down");
                    return Ok(());
                }
            }
        }
    }

    async fn do_process<H>(&mut self, request: Request<ReqBody>, handler: &Arc<H>, keep_alive: bool) -> Result<(), HttpError>
    where
        H: Handler,
        <H::RespBody as Body>::Error: Display,
    {
        let response_result = handler.call(request).await;

        let mut response = match response_result {
            Ok(response) => collect_response(response).await?,
            Err(e) => {
                let e: Box<dyn Error + Send + Sync> = e.into();
                error!(cause = %e, "handle response error");
                build_error_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        };

        if !keep_alive {
            response.headers_mut().insert(header::CONNECTION, HeaderValue::from_static("close"));
        }

        self.framed_write.send(response).await?;
        Ok(())
    }
}

async fn collect_response<B>(response: Response<B>) -> Result<Response<Bytes>, SendError>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    let (parts, body) = response.into_parts();
    let bytes = body
        .collect()
        .await
        .map_err(|e| SendError::invalid_body(e))?
        .to_bytes();
    Ok(Response::from_parts(parts, bytes))
}

fn build_error_response(status_code: StatusCode) -> Response<Bytes> {
    let mut response = Response::new(Bytes::new());
    *response.status_mut() = status_code;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::make_handler;
    use http_body_util::Full;
    use std::convert::Infallible;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn echo_path(request: Request<ReqBody>) -> Result<Response<Full<Bytes>>, Infallible> {
        let path = request.uri().path().to_string();
        let body = request.into_body().take_bytes();
        let text = format!("{path}:{}", String::from_utf8_lossy(&body));
        Ok(Response::new(Full::new(Bytes::from(text))))
    }

    async fn roundtrip(input: &'static [u8]) -> String {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server);

        let connection = HttpConnection::new(server_read, server_write);
        let task = tokio::spawn(connection.process(Arc::new(make_handler(echo_path))));

        let (mut client_read, mut client_write) = tokio::io::split(client);
        client_write.write_all(input).await.unwrap();
        client_write.shutdown().await.unwrap();

        let mut output = Vec::new();
        client_read.read_to_end(&mut output).await.unwrap();
        let _ = task.await.unwrap();
        String::from_utf8(output).unwrap()
    }

    #[tokio::test]
    async fn serves_keep_alive_requests() {
        let output = roundtrip(b"GET /a HTTP/1.1\r\n\r\nPOST /b HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi").await;

        assert_eq!(output.matches("HTTP/1.1 200 OK").count(), 2);
        assert!(output.contains("/a:"));
        assert!(output.contains("/b:hi"));
    }

    #[tokio::test]
    async fn closes_after_connection_close() {
        let output = roundtrip(b"GET /a HTTP/1.1\r\nConnection: close\r\n\r\nGET /b HTTP/1.1\r\n\r\n").await;

        assert_eq!(output.matches("HTTP/1.1 200 OK").count(), 1);
        assert!(output.contains("connection: close\r\n"));
        assert!(!output.contains("/b:"));
    }

    #[tokio::test]
    async fn answers_bad_request_on_decode_error() {
        let output = roundtrip(b"POST /a HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n").await;

        assert!(output.starts_with("HTTP/1.1 501 Not Implemented\r\n"));
    }
}
