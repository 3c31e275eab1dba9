//! The route table.
//!
//! A [`Router`] keeps two ordered sequences: middleware entries, eligible for every method and
//! scoped by a path prefix, and endpoint entries grouped by method. Registration order is
//! priority order; nothing is sorted or deduplicated. For each request the dispatcher takes a
//! [`DispatchQueue`] snapshot: all middleware followed by the routes of the request method.

mod route;

pub use route::{Route, RouteScope};

use std::collections::{HashMap, VecDeque};

use http::Method;
use thiserror::Error;
use tracing::debug;

use crate::handler::RequestHandler;
use crate::pattern::PatternError;
use crate::request::RequestContext;

#[derive(Error, Debug)]
pub enum RouteError {
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Which part of the request the route patterns are matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchTarget {
    /// The request target as sent, query string included.
    ///
    /// `/search` will not match `GET /search?q=rust` in this mode; use [`MatchTarget::Path`]
    /// for query-insensitive routing.
    #[default]
    RequestTarget,
    /// Only the path component of the request target.
    Path,
}

impl MatchTarget {
    /// Picks the candidate string out of a request.
    pub fn candidate(self, req: &RequestContext) -> &str {
        match self {
            MatchTarget::RequestTarget => req.request_target(),
            MatchTarget::Path => req.path(),
        }
    }
}

/// Ordered registry of middleware and per-method routes.
#[derive(Debug, Default)]
pub struct Router {
    middleware: Vec<Route>,
    routes: HashMap<Method, Vec<Route>>,
    match_target: MatchTarget,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_match_target(mut self, match_target: MatchTarget) -> Self {
        self.match_target = match_target;
        self
    }

    pub fn set_match_target(&mut self, match_target: MatchTarget) {
        self.match_target = match_target;
    }

    pub fn match_target(&self) -> MatchTarget {
        self.match_target
    }

    /// Appends a middleware entry running for every request under `prefix`.
    pub fn register_middleware<H>(&mut self, prefix: &str, handler: H) -> Result<(), RouteError>
    where
        H: RequestHandler + 'static,
    {
        let route = Route::middleware(prefix, handler)?;
        debug!(route = %route, "register middleware");
        self.middleware.push(route);
        Ok(())
    }

    /// Appends an endpoint entry for `method`; earlier registrations keep priority.
    pub fn register_route<H>(&mut self, method: Method, path: &str, handler: H) -> Result<(), RouteError>
    where
        H: RequestHandler + 'static,
    {
        let route = Route::endpoint(method.clone(), path, handler)?;
        debug!(route = %route, "register route");
        self.routes.entry(method).or_default().push(route);
        Ok(())
    }

    pub fn middleware(&self) -> &[Route] {
        &self.middleware
    }

    /// Routes registered for `method`, in registration order.
    pub fn routes(&self, method: &Method) -> &[Route] {
        self.routes.get(method).map_or(&[], Vec::as_slice)
    }

    /// A fresh queue of middleware followed by the routes of `method`.
    pub fn snapshot_for(&self, method: &Method) -> DispatchQueue<'_> {
        let routes = self.routes(method);
        let mut entries = VecDeque::with_capacity(self.middleware.len() + routes.len());
        entries.extend(self.middleware.iter());
        entries.extend(routes.iter());
        DispatchQueue { entries }
    }
}

/// The entries left to try for one request, consumed front to back.
#[derive(Debug)]
pub struct DispatchQueue<'router> {
    entries: VecDeque<&'router Route>,
}

impl DispatchQueue<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'router> Iterator for DispatchQueue<'router> {
    type Item = &'router Route;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.entries.len(), Some(self.entries.len()))
    }
}

impl ExactSizeIterator for DispatchQueue<'_> {}
