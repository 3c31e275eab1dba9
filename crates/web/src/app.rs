//! Application facade: registration API and the TCP listener.
//!
//! An [`App`] is configured with `&mut self` calls and then consumed by [`App::listen`], so the
//! route table is frozen before the first request is served.
//!
//! ```no_run
//! use trellis_web::{App, HandlerResult, ListenOptions, Next, RequestContext, ResponseContext, handler_fn};
//! use trellis_web::middleware::RequestLogger;
//!
//! async fn ping(_req: &mut RequestContext, resp: &mut ResponseContext) -> HandlerResult {
//!     resp.json(&serde_json::json!({ "ok": true }))?;
//!     Ok(Next::Halt)
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut app = App::new();
//!     app.use_middleware(RequestLogger::new())?.get("/ping", handler_fn(ping))?;
//!     app.listen(ListenOptions::new("127.0.0.1:8080")?).await?;
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

use http::Method;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use trellis_http::connection::HttpConnection;

use crate::dispatcher::Dispatcher;
use crate::handler::RequestHandler;
use crate::router::{MatchTarget, RouteError, Router};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("can't resolve listen address: {0}")]
    Resolve(#[source] io::Error),

    #[error("listen address resolved to nothing")]
    NoAddress,

    #[error("bind server error: {0}")]
    Bind(#[source] io::Error),
}

/// Where and how [`App::listen`] serves.
#[derive(Debug, Clone)]
pub struct ListenOptions {
    addresses: Vec<SocketAddr>,
    level: Level,
    install_subscriber: bool,
}

impl ListenOptions {
    pub fn new<A: ToSocketAddrs>(address: A) -> Result<Self, ServerError> {
        let addresses = address.to_socket_addrs().map_err(ServerError::Resolve)?.collect::<Vec<_>>();
        if addresses.is_empty() {
            return Err(ServerError::NoAddress);
        }
        Ok(Self { addresses, level: Level::INFO, install_subscriber: true })
    }

    /// Maximum level of the installed `tracing` subscriber, `INFO` by default.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Leaves subscriber setup to the caller.
    pub fn without_subscriber(mut self) -> Self {
        self.install_subscriber = false;
        self
    }

    pub fn addresses(&self) -> &[SocketAddr] {
        &self.addresses
    }
}

macro_rules! method_route {
    ($name:ident, $method:expr) => {
        #[doc = concat!("Registers `handler` for `", stringify!($method), "` requests matching `path`.")]
        pub fn $name<H>(&mut self, path: &str, handler: H) -> Result<&mut Self, RouteError>
        where
            H: RequestHandler + 'static,
        {
            self.route($method, path, handler)
        }
    };
}

/// A routing application: middleware, routes, fallbacks.
#[derive(Default)]
pub struct App {
    router: Router,
    not_found: Option<Box<dyn RequestHandler>>,
    on_error: Option<Box<dyn RequestHandler>>,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App").field("router", &self.router).finish_non_exhaustive()
    }
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chooses what patterns are matched against, see [`MatchTarget`].
    pub fn match_target(&mut self, match_target: MatchTarget) -> &mut Self {
        self.router.set_match_target(match_target);
        self
    }

    /// Registers middleware for every request.
    pub fn use_middleware<H>(&mut self, handler: H) -> Result<&mut Self, RouteError>
    where
        H: RequestHandler + 'static,
    {
        self.use_at("/", handler)
    }

    /// Registers middleware for requests under `prefix`.
    pub fn use_at<H>(&mut self, prefix: &str, handler: H) -> Result<&mut Self, RouteError>
    where
        H: RequestHandler + 'static,
    {
        self.router.register_middleware(prefix, handler)?;
        Ok(self)
    }

    pub fn route<H>(&mut self, method: Method, path: &str, handler: H) -> Result<&mut Self, RouteError>
    where
        H: RequestHandler + 'static,
    {
        self.router.register_route(method, path, handler)?;
        Ok(self)
    }

    method_route!(get, Method::GET);
    method_route!(post, Method::POST);
    method_route!(put, Method::PUT);
    method_route!(patch, Method::PATCH);
    method_route!(delete, Method::DELETE);

    /// Answers requests no handler finalized; the fixed `404 Not Found` is used otherwise.
    pub fn not_found<H: RequestHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.not_found = Some(Box::new(handler));
        self
    }

    /// Answers requests whose handler faulted; the fixed `500 Server Error` is used otherwise.
    pub fn on_error<H: RequestHandler + 'static>(&mut self, handler: H) -> &mut Self {
        self.on_error = Some(Box::new(handler));
        self
    }

    pub fn into_dispatcher(self) -> Dispatcher {
        let mut dispatcher = Dispatcher::new(self.router);
        if let Some(handler) = self.not_found {
            dispatcher.set_not_found(handler);
        }
        if let Some(handler) = self.on_error {
            dispatcher.set_error_handler(handler);
        }
        dispatcher
    }

    /// Binds the configured addresses and serves until the process stops.
    pub async fn listen(self, options: ListenOptions) -> Result<(), ServerError> {
        if options.install_subscriber {
            let subscriber = FmtSubscriber::builder().with_max_level(options.level).finish();
            if tracing::subscriber::set_global_default(subscriber).is_err() {
                debug!("global subscriber already installed, keep it");
            }
        }

        info!("start listening at {:?}", options.addresses);
        let tcp_listener = TcpListener::bind(options.addresses.as_slice()).await.map_err(|e| {
            error!(cause = %e, "bind server error");
            ServerError::Bind(e)
        })?;

        self.serve(tcp_listener).await
    }

    /// Serves connections accepted from an already bound listener.
    pub async fn serve(self, tcp_listener: TcpListener) -> Result<(), ServerError> {
        let dispatcher = Arc::new(self.into_dispatcher());

        loop {
            let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let dispatcher = dispatcher.clone();

            tokio::spawn(async move {
                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::new(reader, writer);
                match connection.process(dispatcher).await {
                    Ok(()) => debug!(%remote_addr, "finished process, connection shutdown"),
                    Err(e) => error!(%remote_addr, cause = %e, "connection shutdown with error"),
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Next, sync_handler_fn};

    fn noop() -> impl RequestHandler + 'static {
        sync_handler_fn(|_req, _resp| Ok(Next::Continue))
    }

    #[test]
    fn registration_is_chainable() {
        let mut app = App::new();
        app.use_middleware(noop())
            .unwrap()
            .use_at("/api", noop())
            .unwrap()
            .get("/a", noop())
            .unwrap()
            .post("/a", noop())
            .unwrap()
            .put("/a", noop())
            .unwrap()
            .patch("/a", noop())
            .unwrap()
            .delete("/a", noop())
            .unwrap()
            .route(Method::OPTIONS, "/a", noop())
            .unwrap();

        let dispatcher = app.into_dispatcher();
        let router = dispatcher.router();
        assert_eq!(router.middleware().len(), 2);
        for method in [Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS] {
            assert_eq!(router.routes(&method).len(), 1, "{method}");
        }
    }

    #[test]
    fn invalid_path_is_reported() {
        let mut app = App::new();
        assert!(app.get("no-slash", noop()).is_err());
        assert!(app.use_at("/:", noop()).is_err());
    }

    #[test]
    fn listen_options() {
        let options = ListenOptions::new("127.0.0.1:0").unwrap().level(Level::DEBUG).without_subscriber();

        assert_eq!(options.addresses().len(), 1);
        assert_eq!(options.level, Level::DEBUG);
        assert!(!options.install_subscriber);
    }

    #[test]
    fn match_target_is_forwarded() {
        let mut app = App::new();
        app.match_target(MatchTarget::Path);

        assert_eq!(app.into_dispatcher().router().match_target(), MatchTarget::Path);
    }
}
