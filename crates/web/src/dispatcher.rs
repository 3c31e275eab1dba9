//! The dispatch pipeline.
//!
//! For every request the [`Dispatcher`] snapshots the route table, walks the entries front to
//! back and invokes each one whose pattern matches, until a handler finalizes the response, a
//! handler faults, or the queue runs out. Whatever happens, exactly one response leaves
//! [`Dispatcher::handle`].
//!
//! ```text
//!            pop + match               Continue
//!   Running ─────────────▶ MatchedInvoking ───────▶ Running
//!      │                     │        │
//!      │ queue empty         │ fault  │ finalized
//!      ▼                     ▼        ▼
//!   FinalizingNotFound   FinalizingError ──▶ Done
//! ```

use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt;
use http::{Request, Response, StatusCode};
use thiserror::Error;
use tracing::{debug, error, info, trace};
use trellis_http::handler::Handler;
use trellis_http::protocol::ReqBody;

use crate::handler::{HandlerError, Next, RequestHandler};
use crate::request::RequestContext;
use crate::response::{ResponseBody, ResponseContext};
use crate::router::Router;

pub(crate) const NOT_FOUND_BODY: &str = "Not Found";
pub(crate) const SERVER_ERROR_BODY: &str = "Server Error";

/// Walk states; the walk always ends in [`DispatchState::Done`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    Running,
    MatchedInvoking,
    FinalizingError,
    FinalizingNotFound,
    Done,
}

/// How a walk reached [`DispatchState::Done`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A matched handler finalized the response.
    Handled,
    /// No handler finalized the response before the queue ran out.
    NotFound,
    /// A handler faulted and the error handler answered.
    Failed,
}

/// A handler failure routed to the error handler.
#[derive(Error, Debug)]
pub enum HandlerFault {
    #[error("handler returned an error: {0}")]
    Failed(#[source] HandlerError),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("handler halted without finalizing the response")]
    UnfinalizedHalt,
}

/// Drives requests through a [`Router`].
pub struct Dispatcher {
    router: Router,
    not_found: Option<Box<dyn RequestHandler>>,
    on_error: Option<Box<dyn RequestHandler>>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("router", &self.router)
            .field("custom_not_found", &self.not_found.is_some())
            .field("custom_on_error", &self.on_error.is_some())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(router: Router) -> Self {
        Self { router, not_found: None, on_error: None }
    }

    /// Replaces the fixed `404 Not Found` answer.
    pub fn with_not_found<H: RequestHandler + 'static>(mut self, handler: H) -> Self {
        self.not_found = Some(Box::new(handler));
        self
    }

    /// Replaces the fixed `500 Server Error` answer.
    ///
    /// The handler finds the failure in [`RequestContext::fault`].
    pub fn with_error_handler<H: RequestHandler + 'static>(mut self, handler: H) -> Self {
        self.on_error = Some(Box::new(handler));
        self
    }

    pub(crate) fn set_not_found(&mut self, handler: Box<dyn RequestHandler>) {
        self.not_found = Some(handler);
    }

    pub(crate) fn set_error_handler(&mut self, handler: Box<dyn RequestHandler>) {
        self.on_error = Some(handler);
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Serves one request and returns its only response.
    pub async fn handle(&self, request: Request<ReqBody>) -> Response<ResponseBody> {
        let started = Instant::now();
        let mut req = RequestContext::from(request);
        let mut resp = ResponseContext::new();

        let outcome = self.dispatch(&mut req, &mut resp).await;

        let response = resp.take_response().unwrap_or_else(|| {
            error!("dispatch ended without a response, answer server error");
            fixed_response(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_BODY)
        });

        info!(
            method = %req.method(),
            request_target = req.request_target(),
            status = response.status().as_u16(),
            outcome = ?outcome,
            elapsed = ?started.elapsed(),
            "request done"
        );
        response
    }

    /// Walks the route table for one request until the response is finalized.
    pub async fn dispatch(&self, req: &mut RequestContext, resp: &mut ResponseContext) -> DispatchOutcome {
        let mut queue = self.router.snapshot_for(req.method());
        let match_target = self.router.match_target();

        let mut state = DispatchState::Running;
        let mut current = None;
        let mut fault = None;
        let mut outcome = DispatchOutcome::Handled;

        loop {
            trace!(state = ?state, remaining = queue.len(), "dispatch step");
            state = match state {
                DispatchState::Running => match queue.next() {
                    None => DispatchState::FinalizingNotFound,
                    Some(route) => match route.matches(match_target.candidate(req)) {
                        None => DispatchState::Running,
                        Some(params) => {
                            debug!(route = %route, "route matched");
                            req.set_path_params(params);
                            current = Some(route);
                            DispatchState::MatchedInvoking
                        }
                    },
                },

                DispatchState::MatchedInvoking => {
                    let Some(route) = current.take() else {
                        return DispatchOutcome::Failed;
                    };
                    let result = invoke(route.handler(), req, resp).await;

                    match result {
                        Ok(_) if resp.is_finalized() => DispatchState::Done,
                        Ok(Next::Continue) => DispatchState::Running,
                        Ok(Next::Halt) => {
                            fault = Some(HandlerFault::UnfinalizedHalt);
                            DispatchState::FinalizingError
                        }
                        Err(e) if resp.is_finalized() => {
                            error!(route = %route, cause = %e, "handler failed after finalizing, keep the sent response");
                            DispatchState::Done
                        }
                        Err(e) => {
                            fault = Some(e);
                            DispatchState::FinalizingError
                        }
                    }
                }

                DispatchState::FinalizingNotFound => {
                    outcome = DispatchOutcome::NotFound;
                    match &self.not_found {
                        Some(handler) => match invoke(handler.as_ref(), req, resp).await {
                            Err(e) if !resp.is_finalized() => {
                                fault = Some(e);
                                DispatchState::FinalizingError
                            }
                            _ => {
                                resp.send_fallback(StatusCode::NOT_FOUND, NOT_FOUND_BODY);
                                DispatchState::Done
                            }
                        },
                        None => {
                            resp.send_fallback(StatusCode::NOT_FOUND, NOT_FOUND_BODY);
                            DispatchState::Done
                        }
                    }
                }

                DispatchState::FinalizingError => {
                    outcome = DispatchOutcome::Failed;
                    if let Some(fault) = fault.take() {
                        error!(cause = %fault, request_target = req.request_target(), "request failed");
                        req.set_fault(fault);
                    }
                    if let Some(handler) = &self.on_error
                        && let Err(e) = invoke(handler.as_ref(), req, resp).await
                    {
                        error!(cause = %e, "error handler failed");
                    }
                    resp.send_fallback(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_BODY);
                    DispatchState::Done
                }

                DispatchState::Done => return outcome,
            };
        }
    }
}

/// Invokes one handler, turning a panic into a [`HandlerFault`].
async fn invoke(handler: &dyn RequestHandler, req: &mut RequestContext, resp: &mut ResponseContext) -> Result<Next, HandlerFault> {
    match AssertUnwindSafe(handler.invoke(req, resp)).catch_unwind().await {
        Ok(Ok(next)) => Ok(next),
        Ok(Err(e)) => Err(HandlerFault::Failed(e)),
        Err(payload) => Err(HandlerFault::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn fixed_response(status: StatusCode, body: &'static str) -> Response<ResponseBody> {
    let mut resp = ResponseContext::new();
    resp.send_fallback(status, body);
    resp.take_response().unwrap_or_else(|| {
        let mut response = Response::new(ResponseBody::from(body));
        *response.status_mut() = status;
        response
    })
}

#[async_trait]
impl Handler for Dispatcher {
    type RespBody = ResponseBody;
    type Error = Infallible;

    async fn call(&self, req: Request<ReqBody>) -> Result<Response<Self::RespBody>, Self::Error> {
        Ok(self.handle(req).await)
    }
}
