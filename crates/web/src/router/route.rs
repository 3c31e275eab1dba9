use std::fmt;

use http::Method;

use crate::handler::RequestHandler;
use crate::pattern::PathPattern;
use crate::{PathParams, RouteError};

/// Where a route entry applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteScope {
    /// Runs for every method on requests under `prefix`.
    Middleware { prefix: String },
    /// Runs only for `method` on requests matching `path`.
    Endpoint { method: Method, path: String },
}

/// One registered entry of the route table: a compiled pattern and its handler.
pub struct Route {
    scope: RouteScope,
    pattern: PathPattern,
    handler: Box<dyn RequestHandler>,
}

impl Route {
    pub fn middleware<H>(prefix: &str, handler: H) -> Result<Self, RouteError>
    where
        H: RequestHandler + 'static,
    {
        let pattern = PathPattern::prefix(prefix)?;
        Ok(Self { scope: RouteScope::Middleware { prefix: prefix.to_string() }, pattern, handler: Box::new(handler) })
    }

    pub fn endpoint<H>(method: Method, path: &str, handler: H) -> Result<Self, RouteError>
    where
        H: RequestHandler + 'static,
    {
        let pattern = PathPattern::compile(path)?;
        Ok(Self { scope: RouteScope::Endpoint { method, path: path.to_string() }, pattern, handler: Box::new(handler) })
    }

    pub fn scope(&self) -> &RouteScope {
        &self.scope
    }

    pub fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    pub fn handler(&self) -> &dyn RequestHandler {
        self.handler.as_ref()
    }

    #[inline]
    pub fn matches(&self, candidate: &str) -> Option<PathParams> {
        self.pattern.matches(candidate)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route").field("scope", &self.scope).field("pattern", &self.pattern.source()).finish_non_exhaustive()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scope {
            RouteScope::Middleware { prefix } => write!(f, "USE {prefix}"),
            RouteScope::Endpoint { method, path } => write!(f, "{method} {path}"),
        }
    }
}
