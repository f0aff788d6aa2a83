//! # Route Table
//!
//! Declarative route registration.
//!
//! Routes are collected in registration order while the application is
//! built and never change afterwards. Path patterns use `{name}`
//! placeholders; each compiles to an anchored regular expression in which
//! a placeholder matches one or more non-slash characters.

use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::middleware::{Middleware, MiddlewareChain};
use crate::request::Request;
use crate::response::Reply;
use crate::router::Method;
use regex::Regex;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Type-erased route handler body
pub type HandlerFn = dyn Fn(&mut Request, &AppContext) -> Result<Reply> + Send + Sync;

/// What a route runs once it matches
#[derive(Clone)]
pub enum Handler {
    /// A free function or closure
    Function(Arc<HandlerFn>),
    /// A controller action; the controller is constructed per request
    Action {
        /// Controller type name
        controller: &'static str,
        /// Action name
        action: &'static str,
        /// Constructs the controller and invokes the action
        call: Arc<HandlerFn>,
    },
}

impl Handler {
    /// Wrap a closure taking the request and the application context
    ///
    /// The closure may return plain content, which leaves the status alone,
    /// or a full [`Response`](crate::Response) when it needs a status or
    /// headers.
    pub fn function<F, C>(f: F) -> Self
    where
        F: Fn(&mut Request, &AppContext) -> Result<C> + Send + Sync + 'static,
        C: Into<Reply>,
    {
        Self::Function(Arc::new(move |req, ctx| f(req, ctx).map(Into::into)))
    }

    /// Bind a controller action
    ///
    /// A fresh `T` is built with `T::default()` for every request, then
    /// `method` is invoked on it.
    pub fn action<T, F, C>(action: &'static str, method: F) -> Self
    where
        T: Default + 'static,
        F: Fn(&T, &mut Request, &AppContext) -> Result<C> + Send + Sync + 'static,
        C: Into<Reply>,
    {
        let type_name = std::any::type_name::<T>();
        let controller = type_name.rsplit("::").next().unwrap_or(type_name);
        Self::Action {
            controller,
            action,
            call: Arc::new(move |req, ctx| {
                let instance = T::default();
                method(&instance, req, ctx).map(Into::into)
            }),
        }
    }

    /// Run the handler
    ///
    /// # Errors
    ///
    /// Propagates whatever the handler returns
    pub fn call(&self, req: &mut Request, ctx: &AppContext) -> Result<Reply> {
        match self {
            Self::Function(f) | Self::Action { call: f, .. } => f(req, ctx),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => f.write_str("Function"),
            Self::Action {
                controller, action, ..
            } => write!(f, "{controller}@{action}"),
        }
    }
}

/// A registered route
#[derive(Debug, Clone)]
pub struct Route {
    method: Method,
    path: String,
    handler: Handler,
    middleware: MiddlewareChain,
    name: Option<String>,
}

impl Route {
    /// Create a route with no middleware and no name
    pub fn new(method: Method, path: impl Into<String>, handler: Handler) -> Self {
        Self {
            method,
            path: path.into(),
            handler,
            middleware: MiddlewareChain::new(),
            name: None,
        }
    }

    /// HTTP method
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Path pattern as registered
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Handler
    #[must_use]
    pub const fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Middleware in execution order
    #[must_use]
    pub const fn middleware(&self) -> &MiddlewareChain {
        &self.middleware
    }

    /// Route name
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

/// Chainable configuration of a freshly registered route
#[derive(Debug)]
pub struct RouteBuilder<'a> {
    route: &'a mut Route,
}

impl RouteBuilder<'_> {
    /// Set the route's middleware, replacing any previous list
    pub fn middleware<I>(&mut self, middleware: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn Middleware>>,
    {
        self.route.middleware = middleware.into_iter().collect();
        self
    }

    /// Name the route
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.route.name = Some(name.into());
        self
    }
}

/// Routes in registration order
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route
    ///
    /// Duplicate paths and names are accepted; dispatch takes the first match.
    pub fn register(
        &mut self,
        method: Method,
        path: impl Into<String>,
        handler: Handler,
    ) -> RouteBuilder<'_> {
        self.routes.push(Route::new(method, path, handler));
        let index = self.routes.len() - 1;
        RouteBuilder {
            route: &mut self.routes[index],
        }
    }

    /// Register a GET route
    pub fn get(&mut self, path: impl Into<String>, handler: Handler) -> RouteBuilder<'_> {
        self.register(Method::Get, path, handler)
    }

    /// Register a POST route
    pub fn post(&mut self, path: impl Into<String>, handler: Handler) -> RouteBuilder<'_> {
        self.register(Method::Post, path, handler)
    }

    /// All routes in registration order
    #[must_use]
    pub fn all_routes(&self) -> &[Route] {
        &self.routes
    }

    /// Number of routes
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no route is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub(crate) fn into_routes(self) -> Vec<Route> {
        self.routes
    }
}

pub(crate) fn placeholder_pattern() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{([a-zA-Z_][a-zA-Z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

/// Compile a path pattern into an anchored matcher plus its placeholder names
///
/// # Errors
///
/// Returns `Error::InvalidRoutePattern` for stray braces, malformed or
/// repeated placeholder names
pub fn compile_pattern(path: &str) -> Result<(Regex, Vec<String>)> {
    let invalid = |reason: String| Error::InvalidRoutePattern {
        pattern: path.to_string(),
        reason,
    };
    let push_literal = |pattern: &mut String, literal: &str| {
        if literal.contains(['{', '}']) {
            return Err(invalid(format!("malformed placeholder near '{literal}'")));
        }
        pattern.push_str(&regex::escape(literal));
        Ok(())
    };

    let mut pattern = String::with_capacity(path.len() + 16);
    pattern.push('^');
    let mut names: Vec<String> = Vec::new();
    let mut last = 0;

    for caps in placeholder_pattern().captures_iter(path) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push_literal(&mut pattern, &path[last..whole.start()])?;
        let name = name.as_str();
        if names.iter().any(|n| n == name) {
            return Err(invalid(format!("duplicate placeholder '{name}'")));
        }
        pattern.push_str("(?P<");
        pattern.push_str(name);
        pattern.push_str(">[^/]+)");
        names.push(name.to_string());
        last = whole.end();
    }
    push_literal(&mut pattern, &path[last..])?;
    pattern.push('$');

    let regex = Regex::new(&pattern).map_err(|e| invalid(e.to_string()))?;
    Ok((regex, names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{AbortMiddleware, LoggingMiddleware};
    use crate::response::Content;

    #[derive(Default)]
    struct PageController;

    impl PageController {
        fn show(&self, req: &mut Request, _ctx: &AppContext) -> Result<String> {
            Ok(format!("page {}", req.input_str("slug").unwrap_or("?")))
        }
    }

    fn ok_handler() -> Handler {
        Handler::function(|_req, _ctx| Ok("ok"))
    }

    #[test]
    fn test_register_keeps_order_and_allows_duplicates() {
        let mut table = RouteTable::new();
        table.get("/", ok_handler());
        table.post("/users", ok_handler());
        table.get("/", ok_handler()).name("home");

        let paths: Vec<_> = table.all_routes().iter().map(Route::path).collect();
        assert_eq!(paths, vec!["/", "/users", "/"]);
        assert_eq!(table.all_routes()[1].method(), Method::Post);
        assert_eq!(table.all_routes()[2].name(), Some("home"));
    }

    #[test]
    fn test_builder_chaining() {
        let mut table = RouteTable::new();
        table
            .get("/admin", ok_handler())
            .middleware([
                Arc::new(LoggingMiddleware::new()) as Arc<dyn Middleware>,
                Arc::new(AbortMiddleware::new(403, "no")),
            ])
            .name("admin");

        let route = &table.all_routes()[0];
        assert_eq!(route.name(), Some("admin"));
        assert_eq!(
            route.middleware().names(),
            vec!["LoggingMiddleware", "AbortMiddleware"]
        );
    }

    #[test]
    fn test_middleware_replaces_previous_list() {
        let mut table = RouteTable::new();
        table
            .get("/", ok_handler())
            .middleware([Arc::new(LoggingMiddleware::new()) as Arc<dyn Middleware>])
            .middleware(Vec::<Arc<dyn Middleware>>::new());
        assert!(table.all_routes()[0].middleware().is_empty());
    }

    #[test]
    fn test_action_handler_builds_controller() {
        let handler = Handler::action::<PageController, _, _>("show", PageController::show);
        assert_eq!(format!("{handler:?}"), "PageController@show");

        let mut req = Request::new("GET", "/pages/about");
        req.merge_params([("slug", "about")]);
        let reply = handler.call(&mut req, &AppContext::default()).unwrap();
        assert_eq!(reply, Reply::Content(Content::Text("page about".to_string())));
    }

    #[test]
    fn test_compile_static_pattern() {
        let (regex, names) = compile_pattern("/test-validation").unwrap();
        assert!(names.is_empty());
        assert!(regex.is_match("/test-validation"));
        assert!(!regex.is_match("/test-validation/"));
        assert!(!regex.is_match("/prefix/test-validation"));
    }

    #[test]
    fn test_compile_placeholders() {
        let (regex, names) = compile_pattern("/users/{user_id}/posts/{post_id}").unwrap();
        assert_eq!(names, vec!["user_id", "post_id"]);

        let caps = regex.captures("/users/42/posts/hello-world").unwrap();
        assert_eq!(&caps["user_id"], "42");
        assert_eq!(&caps["post_id"], "hello-world");
        assert!(!regex.is_match("/users/42/posts/"));
        assert!(!regex.is_match("/users/a/b/posts/c"));
    }

    #[test]
    fn test_literal_characters_are_escaped() {
        let (regex, _) = compile_pattern("/files/v1.0/{name}").unwrap();
        assert!(regex.is_match("/files/v1.0/readme"));
        assert!(!regex.is_match("/files/v1x0/readme"));

        let (regex, _) = compile_pattern("/a+b").unwrap();
        assert!(regex.is_match("/a+b"));
        assert!(!regex.is_match("/aab"));
    }

    #[test]
    fn test_invalid_patterns() {
        for bad in ["/users/{id", "/users/id}", "/users/{1id}", "/a/{x}/b/{x}", "/{}"] {
            let err = compile_pattern(bad).unwrap_err();
            assert!(
                matches!(err, Error::InvalidRoutePattern { .. }),
                "{bad} should be rejected"
            );
        }
    }
}
