//! # Application
//!
//! Binds the route table to an application context. Built once at startup
//! and shared read-only by every connection.

use crate::context::AppContext;
use crate::error::Result;
use crate::request::Request;
use crate::response::Response;
use crate::route::RouteTable;
use crate::router::{DispatchOutcome, Router};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// A routable application
#[derive(Debug, Clone)]
pub struct Application {
    context: Arc<AppContext>,
    router: Arc<Router>,
}

impl Application {
    /// Compile `routes` and attach them to `context`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if a route pattern is malformed
    pub fn new(context: AppContext, routes: RouteTable) -> Result<Self> {
        let router = Router::new(routes)?;
        info!(routes = router.len(), app = %context.config().name, "Application ready");
        Ok(Self {
            context: Arc::new(context),
            router: Arc::new(router),
        })
    }

    /// Application context
    #[must_use]
    pub fn context(&self) -> &AppContext {
        &self.context
    }

    /// Compiled router
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Serve one request to completion
    ///
    /// A request id is assigned when the client sent none and is echoed on
    /// the response.
    pub fn handle(&self, mut req: Request) -> Response {
        let request_id = match req.header(REQUEST_ID_HEADER) {
            Some(id) => id.to_string(),
            None => {
                let id = generate_request_id();
                req.set_header(REQUEST_ID_HEADER, id.clone());
                id
            }
        };

        let mut res = Response::new();
        let outcome = self.router.dispatch(&mut req, &mut res, &self.context);
        res.set_header(REQUEST_ID_HEADER, &request_id);

        let outcome = match outcome {
            DispatchOutcome::Handled => "handled",
            DispatchOutcome::Aborted { .. } => "aborted",
            DispatchOutcome::NotFound => "not_found",
            DispatchOutcome::Failed { .. } => "failed",
        };
        info!(
            method = %req.method(),
            path = %req.path(),
            status = res.status,
            request_id = %request_id,
            outcome,
            "Request completed"
        );
        res
    }
}

static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(1);

fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}", now.as_nanos(), counter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Content;
    use crate::route::Handler;

    fn app() -> Application {
        let mut routes = RouteTable::new();
        routes.get(
            "/hello/{name}",
            Handler::function(|req, ctx| {
                Ok(format!(
                    "Hello {} from {}",
                    req.input_str("name").unwrap_or("nobody"),
                    ctx.config().name
                ))
            }),
        );
        Application::new(AppContext::default(), routes).unwrap()
    }

    #[test]
    fn test_handle_dispatches() {
        let res = app().handle(Request::new("GET", "/hello/ada"));
        assert_eq!(res.status, 200);
        assert_eq!(res.content, Content::Text("Hello ada from Octane".to_string()));
    }

    #[test]
    fn test_request_id_generated_and_echoed() {
        let app = app();

        let res = app.handle(Request::new("GET", "/hello/ada"));
        let generated = res.header("x-request-id").unwrap().to_string();
        assert!(!generated.is_empty());

        let res = app.handle(Request::new("GET", "/nope").with_header("X-Request-Id", "abc-123"));
        assert_eq!(res.status, 404);
        assert_eq!(res.header("x-request-id"), Some("abc-123"));
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(generate_request_id(), generate_request_id());
    }
}
