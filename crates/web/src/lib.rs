//! Routing and middleware dispatch on top of `trellis-http`.
//!
//! Requests walk an ordered chain: every middleware registered with [`App::use_middleware`] or
//! [`App::use_at`], then the routes registered for the request method, each tried in
//! registration order. A handler either finalizes the response, passes control on with
//! [`Next::Continue`], or fails; when nothing finalizes the response the request is answered
//! with `404 Not Found`, and failures become `500 Server Error`.
//!
//! # Example
//!
//! ```no_run
//! use trellis_web::middleware::{BodyParser, RequestLogger};
//! use trellis_web::{App, HandlerResult, ListenOptions, Next, RequestContext, ResponseContext, handler_fn};
//!
//! async fn show_user(req: &mut RequestContext, resp: &mut ResponseContext) -> HandlerResult {
//!     let id = req.param("id").unwrap_or_default().to_string();
//!     resp.json(&serde_json::json!({ "id": id }))?;
//!     Ok(Next::Halt)
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut app = App::new();
//!     app.use_middleware(RequestLogger::new())?
//!         .use_middleware(BodyParser::new())?
//!         .get("/users/:id", handler_fn(show_user))?;
//!
//!     app.listen(ListenOptions::new("127.0.0.1:3000")?).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`pattern`]: path templates (`/users/:id`, `/files/*path`) and their matchers
//! - [`router`]: the route table and per-request dispatch queues
//! - [`dispatcher`]: the walk over the queue and the fallback responses
//! - [`middleware`]: body parsing and request logging

mod app;
mod handler;
mod request;
mod response;

pub mod dispatcher;
pub mod middleware;
pub mod pattern;
pub mod router;

pub use app::{App, ListenOptions, ServerError};
pub use dispatcher::{DispatchOutcome, DispatchState, Dispatcher, HandlerFault};
pub use handler::{
    AsyncHandlerFn, BoxedFnHandler, FnHandler, HandlerError, HandlerResult, Next, RequestHandler, SyncFnHandler,
    boxed_handler_fn, handler_fn, sync_handler_fn,
};
pub use pattern::{PathPattern, PatternError};
pub use request::{ParsedBody, PathParams, RequestContext, RequestError};
pub use response::{ResponseBody, ResponseContext, ResponseError};
pub use router::{MatchTarget, Route, RouteError, RouteScope, Router};
