//! # Middleware System
//!
//! Pre-handler hooks attached to individual routes.
//!
//! Middleware run in declaration order. Any of them may stop the request by
//! returning [`MiddlewareResult::Abort`] after writing the response it wants
//! sent; later middleware and the handler are then skipped.

use crate::error::Result;
use crate::request::Request;
use crate::response::Response;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Middleware trait for request interception
pub trait Middleware: Send + Sync {
    /// Inspect or mutate the request/response pair before the handler runs
    ///
    /// # Errors
    ///
    /// Any error is treated like a handler failure and becomes a 500
    fn handle(&self, req: &mut Request, res: &mut Response) -> Result<MiddlewareResult>;

    /// Middleware name for logging
    fn name(&self) -> &'static str {
        "Unknown"
    }
}

/// Result of middleware execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiddlewareResult {
    /// Continue to next middleware/handler
    Continue,
    /// Stop here; the response is final
    Abort,
}

/// Ordered middleware list of a route
#[derive(Default, Clone)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    /// Create a new empty middleware chain
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware to the chain
    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
    }

    /// Add an already shared middleware to the chain
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    /// Run every middleware in order
    ///
    /// Returns the name of the middleware that aborted, if any.
    ///
    /// # Errors
    ///
    /// Propagates the first middleware error; later middleware do not run
    pub fn run(&self, req: &mut Request, res: &mut Response) -> Result<Option<&'static str>> {
        for mw in &self.middlewares {
            if mw.handle(req, res)? == MiddlewareResult::Abort {
                warn!(
                    middleware = mw.name(),
                    method = %req.method(),
                    path = %req.path(),
                    status = res.status,
                    "Request aborted by middleware"
                );
                return Ok(Some(mw.name()));
            }
        }
        Ok(None)
    }

    /// Names in execution order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|mw| mw.name()).collect()
    }

    /// Get the number of middlewares
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    /// Check if chain is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl FromIterator<Arc<dyn Middleware>> for MiddlewareChain {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Middleware>>>(iter: I) -> Self {
        Self {
            middlewares: iter.into_iter().collect(),
        }
    }
}

/// Logging middleware - logs requests in structured form
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMiddleware;

impl LoggingMiddleware {
    /// Create a new logging middleware
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for LoggingMiddleware {
    fn handle(&self, req: &mut Request, _res: &mut Response) -> Result<MiddlewareResult> {
        let request_id = req.header("x-request-id").unwrap_or("-");
        info!(
            method = %req.method(),
            path = %req.path(),
            request_id = %request_id,
            "Request received"
        );
        Ok(MiddlewareResult::Continue)
    }

    fn name(&self) -> &'static str {
        "LoggingMiddleware"
    }
}

/// Always stops the request with a fixed status and message
#[derive(Debug, Clone)]
pub struct AbortMiddleware {
    status: u16,
    message: String,
}

impl AbortMiddleware {
    /// Abort every request with `status` and `message`
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl Middleware for AbortMiddleware {
    fn handle(&self, _req: &mut Request, res: &mut Response) -> Result<MiddlewareResult> {
        res.abort(self.status, &self.message);
        Ok(MiddlewareResult::Abort)
    }

    fn name(&self) -> &'static str {
        "AbortMiddleware"
    }
}

type RequestPredicate = Arc<dyn Fn(&Request) -> bool + Send + Sync>;

/// Redirects unless the request satisfies a predicate
#[derive(Clone)]
pub struct RedirectMiddleware {
    location: String,
    allow: RequestPredicate,
}

impl RedirectMiddleware {
    /// Redirect to `location` whenever `allow` returns false
    pub fn unless<F>(location: impl Into<String>, allow: F) -> Self
    where
        F: Fn(&Request) -> bool + Send + Sync + 'static,
    {
        Self {
            location: location.into(),
            allow: Arc::new(allow),
        }
    }
}

impl Middleware for RedirectMiddleware {
    fn handle(&self, req: &mut Request, res: &mut Response) -> Result<MiddlewareResult> {
        if (self.allow)(req) {
            return Ok(MiddlewareResult::Continue);
        }
        res.redirect(&self.location);
        Ok(MiddlewareResult::Abort)
    }

    fn name(&self) -> &'static str {
        "RedirectMiddleware"
    }
}
