use async_trait::async_trait;
use tracing::{Level, debug, error, info, trace, warn};

use crate::handler::{HandlerResult, Next, RequestHandler};
use crate::{RequestContext, ResponseContext};

/// Logs method and target of every request it sees, then continues.
#[derive(Debug, Clone, Copy)]
pub struct RequestLogger {
    level: Level,
}

impl Default for RequestLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestLogger {
    pub fn new() -> Self {
        Self { level: Level::INFO }
    }

    /// Logs at `level` instead of `INFO`.
    pub fn with_level(level: Level) -> Self {
        Self { level }
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

#[async_trait]
impl RequestHandler for RequestLogger {
    async fn invoke(&self, req: &mut RequestContext, _resp: &mut ResponseContext) -> HandlerResult {
        let method = req.method();
        let request_target = req.request_target();
        match self.level {
            Level::TRACE => trace!(%method, request_target, "incoming request"),
            Level::DEBUG => debug!(%method, request_target, "incoming request"),
            Level::INFO => info!(%method, request_target, "incoming request"),
            Level::WARN => warn!(%method, request_target, "incoming request"),
            _ => error!(%method, request_target, "incoming request"),
        }
        Ok(Next::Continue)
    }
}
