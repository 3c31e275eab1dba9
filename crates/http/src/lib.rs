//! A small buffered HTTP/1.1 transport built on tokio
//!
//! This crate accepts raw bytes from a connection, decodes them into complete
//! `http::Request` values, hands each request to a [`handler::Handler`] and writes the
//! returned response back. It is the plumbing underneath `trellis-web`, which implements
//! routing and middleware dispatch on top of the [`handler::Handler`] boundary.
//!
//! # Features
//!
//! - HTTP/1.0 and HTTP/1.1 request decoding via `httparse`
//! - `Content-Length` framed request bodies, buffered before the handler runs
//! - Keep-alive connections and pipelined requests
//! - Error responses for malformed requests (400, 413, 431, 501)
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::{Request, Response, StatusCode};
//! use http_body_util::Full;
//! use std::convert::Infallible;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn};
//! use trellis_http::connection::HttpConnection;
//! use trellis_http::handler::make_handler;
//! use trellis_http::protocol::ReqBody;
//!
//! #[tokio::main]
//! async fn main() {
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(make_handler(hello_world));
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = handler.clone();
//!
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             let connection = HttpConnection::new(reader, writer);
//!             if let Err(e) = connection.process(handler).await {
//!                 error!(cause = %e, "connection shutdown with error");
//!             }
//!         });
//!     }
//! }
//!
//! async fn hello_world(request: Request<ReqBody>) -> Result<Response<Full<Bytes>>, Infallible> {
//!     info!(path = request.uri().path(), "receive request");
//!     let mut response = Response::new(Full::new(Bytes::from_static(b"Hello World!\r\n")));
//!     *response.status_mut() = StatusCode::OK;
//!     Ok(response)
//! }
//! ```
//!
//! # Architecture
//!
//! - [`connection`]: connection lifecycle and keep-alive handling
//! - [`protocol`]: request header, body, and error types
//! - [`codec`]: request decoding and response encoding
//! - [`handler`]: the handler trait the connection calls into
//!
//! # Limitations
//!
//! - HTTP/1.1 only (HTTP/2 and HTTP/3 are not supported)
//! - No TLS support (use a reverse proxy for HTTPS)
//! - No chunked transfer encoding, in either direction
//! - Maximum header size: 8KB, maximum number of headers: 64

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
