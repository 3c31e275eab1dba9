//! The handler contract shared by middleware, routes and fallbacks.
//!
//! Every entry in the dispatch chain is a [`RequestHandler`]. A handler receives the request and
//! response contexts of the current dispatch and tells the dispatcher how to go on:
//!
//! - `Ok(Next::Continue)`: try the next matching entry
//! - `Ok(Next::Halt)`: stop the walk; the handler must have finalized the response
//! - `Err(e)`: abort to the error handler
//!
//! Plain functions and closures are turned into handlers with [`handler_fn`],
//! [`boxed_handler_fn`] and [`sync_handler_fn`].

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::{RequestContext, ResponseContext};

/// Any error a handler reports; the detail is logged and never sent to the client.
pub type HandlerError = Box<dyn Error + Send + Sync>;

pub type HandlerResult = Result<Next, HandlerError>;

/// What a handler asks the dispatcher to do after it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Continue,
    Halt,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, req: &mut RequestContext, resp: &mut ResponseContext) -> HandlerResult;
}

#[async_trait]
impl<T> RequestHandler for Box<T>
where
    T: RequestHandler + ?Sized,
{
    async fn invoke(&self, req: &mut RequestContext, resp: &mut ResponseContext) -> HandlerResult {
        (**self).invoke(req, resp).await
    }
}

#[async_trait]
impl<T> RequestHandler for Arc<T>
where
    T: RequestHandler + ?Sized,
{
    async fn invoke(&self, req: &mut RequestContext, resp: &mut ResponseContext) -> HandlerResult {
        (**self).invoke(req, resp).await
    }
}

/// An async function usable as a handler, for every lifetime of its arguments.
pub trait AsyncHandlerFn<'a>: Send + Sync {
    type Fut: Future<Output = HandlerResult> + Send + 'a;

    fn call(&self, req: &'a mut RequestContext, resp: &'a mut ResponseContext) -> Self::Fut;
}

impl<'a, F, Fut> AsyncHandlerFn<'a> for F
where
    F: Fn(&'a mut RequestContext, &'a mut ResponseContext) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'a,
{
    type Fut = Fut;

    fn call(&self, req: &'a mut RequestContext, resp: &'a mut ResponseContext) -> Self::Fut {
        (self)(req, resp)
    }
}

/// Handler backed by an `async fn`, created by [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("f", &std::any::type_name::<F>()).finish()
    }
}

#[async_trait]
impl<F> RequestHandler for FnHandler<F>
where
    F: for<'a> AsyncHandlerFn<'a>,
{
    async fn invoke(&self, req: &mut RequestContext, resp: &mut ResponseContext) -> HandlerResult {
        self.f.call(req, resp).await
    }
}

/// Wraps an `async fn(&mut RequestContext, &mut ResponseContext) -> HandlerResult`.
///
/// ```
/// use trellis_web::{HandlerResult, Next, RequestContext, ResponseContext, handler_fn};
///
/// async fn ping(_req: &mut RequestContext, resp: &mut ResponseContext) -> HandlerResult {
///     resp.send("pong")?;
///     Ok(Next::Halt)
/// }
///
/// let _handler = handler_fn(ping);
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: for<'a> AsyncHandlerFn<'a>,
{
    FnHandler { f }
}

/// Handler backed by a closure returning a boxed future, created by [`boxed_handler_fn`].
pub struct BoxedFnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for BoxedFnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoxedFnHandler").field("f", &std::any::type_name::<F>()).finish()
    }
}

#[async_trait]
impl<F> RequestHandler for BoxedFnHandler<F>
where
    F: for<'a> Fn(&'a mut RequestContext, &'a mut ResponseContext) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    async fn invoke(&self, req: &mut RequestContext, resp: &mut ResponseContext) -> HandlerResult {
        (self.f)(req, resp).await
    }
}

/// Wraps a closure whose async body borrows the contexts.
///
/// ```
/// use trellis_web::{Next, boxed_handler_fn};
///
/// let greeting = String::from("hello");
/// let _handler = boxed_handler_fn(move |_req, resp| {
///     let greeting = greeting.clone();
///     Box::pin(async move {
///         resp.send(greeting)?;
///         Ok(Next::Halt)
///     })
/// });
/// ```
pub fn boxed_handler_fn<F>(f: F) -> BoxedFnHandler<F>
where
    F: for<'a> Fn(&'a mut RequestContext, &'a mut ResponseContext) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    BoxedFnHandler { f }
}

/// Handler backed by a synchronous closure, created by [`sync_handler_fn`].
pub struct SyncFnHandler<F> {
    f: F,
}

impl<F> fmt::Debug for SyncFnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncFnHandler").field("f", &std::any::type_name::<F>()).finish()
    }
}

#[async_trait]
impl<F> RequestHandler for SyncFnHandler<F>
where
    F: Fn(&mut RequestContext, &mut ResponseContext) -> HandlerResult + Send + Sync,
{
    async fn invoke(&self, req: &mut RequestContext, resp: &mut ResponseContext) -> HandlerResult {
        (self.f)(req, resp)
    }
}

/// Wraps a closure that never awaits.
pub fn sync_handler_fn<F>(f: F) -> SyncFnHandler<F>
where
    F: Fn(&mut RequestContext, &mut ResponseContext) -> HandlerResult + Send + Sync,
{
    SyncFnHandler { f }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request;
    use trellis_http::protocol::ReqBody;

    fn contexts() -> (RequestContext, ResponseContext) {
        let request = Request::builder().uri("/users/7").body(ReqBody::empty()).unwrap();
        (RequestContext::from(request), ResponseContext::new())
    }

    async fn echo_target(req: &mut RequestContext, resp: &mut ResponseContext) -> HandlerResult {
        resp.send(req.request_target().to_string())?;
        Ok(Next::Halt)
    }

    #[tokio::test]
    async fn async_fn_handler() {
        let handler = handler_fn(echo_target);
        let (mut req, mut resp) = contexts();

        assert_eq!(handler.invoke(&mut req, &mut resp).await.unwrap(), Next::Halt);
        assert!(resp.is_finalized());
    }

    #[tokio::test]
    async fn boxed_closure_handler() {
        let suffix = String::from("!");
        let handler = boxed_handler_fn(move |req, resp| {
            let suffix = suffix.clone();
            Box::pin(async move {
                resp.send(format!("{}{suffix}", req.path()))?;
                Ok(Next::Halt)
            })
        });
        let (mut req, mut resp) = contexts();

        assert_eq!(handler.invoke(&mut req, &mut resp).await.unwrap(), Next::Halt);
        assert!(resp.is_finalized());
    }

    #[tokio::test]
    async fn sync_closure_handler_error() {
        let handler = sync_handler_fn(|_req, _resp| Err("boom".into()));
        let (mut req, mut resp) = contexts();

        let error = handler.invoke(&mut req, &mut resp).await.unwrap_err();
        assert_eq!(error.to_string(), "boom");
        assert!(!resp.is_finalized());
    }

    #[tokio::test]
    async fn boxed_and_shared_handlers_delegate() {
        let boxed: Box<dyn RequestHandler> = Box::new(sync_handler_fn(|_req, _resp| Ok(Next::Continue)));
        let shared = Arc::new(boxed);
        let (mut req, mut resp) = contexts();

        assert_eq!(shared.invoke(&mut req, &mut resp).await.unwrap(), Next::Continue);
    }

    #[tokio::test]
    async fn mocked_handler() {
        let mut handler = MockRequestHandler::new();
        handler.expect_invoke().times(1).returning(|_req, _resp| Ok(Next::Continue));
        let (mut req, mut resp) = contexts();

        assert_eq!(handler.invoke(&mut req, &mut resp).await.unwrap(), Next::Continue);
    }

    #[test]
    fn debug_names_the_function() {
        let handler = handler_fn(echo_target);
        assert!(format!("{handler:?}").contains("echo_target"));
    }
}
