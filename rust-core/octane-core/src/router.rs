//! # Router
//!
//! Linear, first-match dispatcher over compiled route patterns.
//!
//! ## Dispatch
//!
//! 1. Pick the method bucket (only GET and POST are dispatchable)
//! 2. Scan the bucket in registration order; the first full-path match wins
//! 3. Merge captured placeholders into the request input
//! 4. Run the route middleware; an abort ends dispatch
//! 5. Run the handler and store its content on the response
//!
//! Failures never escape [`Router::dispatch`]: a miss becomes a 404 and any
//! error or panic a 500. Failures are logged with the matched route and,
//! when known, the source location of the error or panic.

use crate::context::AppContext;
use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::{Content, Response};
use crate::route::{compile_pattern, placeholder_pattern, Route, RouteTable};
use regex::Regex;
use std::cell::Cell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;
use tracing::{debug, error, warn};

/// HTTP methods supported by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP DELETE
    Delete,
    /// HTTP PATCH
    Patch,
    /// HTTP HEAD
    Head,
    /// HTTP OPTIONS
    Options,
}

impl Method {
    /// Parse a method name, ignoring case
    #[must_use]
    pub fn parse(method: &str) -> Option<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "PATCH" => Some(Self::Patch),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    /// Whether the router has a dispatch bucket for this method
    #[must_use]
    pub const fn is_dispatchable(self) -> bool {
        matches!(self, Self::Get | Self::Post)
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
            Self::Head => write!(f, "HEAD"),
            Self::Options => write!(f, "OPTIONS"),
        }
    }
}

/// A route together with its compiled matcher
#[derive(Debug, Clone)]
pub struct CompiledRoute {
    route: Route,
    matcher: Regex,
    params: Vec<String>,
}

impl CompiledRoute {
    /// Compile a route's path pattern
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the pattern is malformed
    pub fn new(route: Route) -> Result<Self> {
        let (matcher, params) = compile_pattern(route.path())?;
        Ok(Self {
            route,
            matcher,
            params,
        })
    }

    /// The underlying route
    #[must_use]
    pub const fn route(&self) -> &Route {
        &self.route
    }

    /// Placeholder names in pattern order
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.params
    }

    fn captures(&self, path: &str) -> Option<HashMap<String, String>> {
        let caps = self.matcher.captures(path)?;
        Some(
            self.params
                .iter()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}

/// Matched route with extracted path parameters
#[derive(Debug)]
pub struct RouteMatch<'a> {
    /// The winning route
    pub route: &'a Route,
    /// Placeholder name to captured segment
    pub params: HashMap<String, String>,
}

/// How a dispatch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler ran and its content is on the response
    Handled,
    /// A middleware stopped the request
    Aborted {
        /// Name of the aborting middleware
        middleware: &'static str,
    },
    /// No route matched; the response is a 404
    NotFound,
    /// A handler or middleware failed; the response is a 500
    Failed {
        /// Failure description
        message: String,
    },
}

/// Immutable router built once from a [`RouteTable`]
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<CompiledRoute>,
    get: Vec<usize>,
    post: Vec<usize>,
}

impl Router {
    /// Compile every route of `table`
    ///
    /// Routes registered for methods other than GET and POST are kept (they
    /// still resolve through [`Router::url_for`]) but are never dispatched.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` for the first malformed pattern
    pub fn new(table: RouteTable) -> Result<Self> {
        let mut router = Self::default();
        for route in table.into_routes() {
            let index = router.routes.len();
            match route.method() {
                Method::Get => router.get.push(index),
                Method::Post => router.post.push(index),
                other => warn!(
                    method = %other,
                    path = %route.path(),
                    "Route registered for a method that is never dispatched"
                ),
            }
            router.routes.push(CompiledRoute::new(route)?);
        }
        Ok(router)
    }

    /// Number of compiled routes
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the router has no routes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// All compiled routes in registration order
    #[must_use]
    pub fn routes(&self) -> &[CompiledRoute] {
        &self.routes
    }

    /// Find the first route matching `method` and `path`
    ///
    /// # Errors
    ///
    /// Returns `Error::RouteNotFound` when the method has no bucket or no
    /// pattern in it matches
    pub fn match_route(&self, method: &str, path: &str) -> Result<RouteMatch<'_>> {
        let bucket: &[usize] = match Method::parse(method) {
            Some(Method::Get) => &self.get,
            Some(Method::Post) => &self.post,
            _ => &[],
        };

        bucket
            .iter()
            .map(|&index| &self.routes[index])
            .find_map(|compiled| {
                compiled.captures(path).map(|params| RouteMatch {
                    route: compiled.route(),
                    params,
                })
            })
            .ok_or_else(|| Error::RouteNotFound {
                method: method.to_string(),
                path: path.to_string(),
            })
    }

    /// Dispatch one request, writing the outcome into `res`
    pub fn dispatch(
        &self,
        req: &mut Request,
        res: &mut Response,
        ctx: &AppContext,
    ) -> DispatchOutcome {
        install_panic_hook();
        PANIC_LOCATION.with(Cell::take);

        let mut target = None;
        let result =
            panic::catch_unwind(AssertUnwindSafe(|| self.run(req, res, ctx, &mut target)));

        match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(Error::RouteNotFound { method, path })) => {
                debug!(method = %method, path = %path, "No route matched");
                *res = Response::aborted(404, "Page not found");
                DispatchOutcome::NotFound
            }
            Ok(Err(err)) => {
                let location = err.location();
                fail(res, ctx, target, err.to_string(), location)
            }
            Err(payload) => {
                let message = if let Some(s) = payload.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                let location = PANIC_LOCATION.with(Cell::take);
                fail(
                    res,
                    ctx,
                    target,
                    message,
                    location.as_ref().map(|(file, line)| (file.as_str(), *line)),
                )
            }
        }
    }

    fn run<'a>(
        &'a self,
        req: &mut Request,
        res: &mut Response,
        ctx: &AppContext,
        target: &mut Option<&'a Route>,
    ) -> Result<DispatchOutcome> {
        let matched = self.match_route(req.method(), req.path())?;
        *target = Some(matched.route);
        debug!(
            method = %req.method(),
            path = %req.path(),
            route = %matched.route.path(),
            handler = ?matched.route.handler(),
            "Route matched"
        );

        req.merge_params(matched.params);

        if let Some(middleware) = matched.route.middleware().run(req, res)? {
            return Ok(DispatchOutcome::Aborted { middleware });
        }

        matched.route.handler().call(req, ctx)?.apply(res);
        Ok(DispatchOutcome::Handled)
    }

    /// Build the path of the first route named `name`
    ///
    /// Returns `None` when no route has that name or a placeholder is left
    /// without a value.
    #[must_use]
    pub fn url_for(&self, name: &str, params: &[(&str, &str)]) -> Option<String> {
        let route = self
            .routes
            .iter()
            .map(CompiledRoute::route)
            .find(|route| route.name() == Some(name))?;

        let mut missing = false;
        let url = placeholder_pattern().replace_all(route.path(), |caps: &regex::Captures<'_>| {
            let key = &caps[1];
            params
                .iter()
                .find(|(k, _)| *k == key)
                .map_or_else(
                    || {
                        missing = true;
                        String::new()
                    },
                    |(_, v)| (*v).to_string(),
                )
        });

        (!missing).then(|| url.into_owned())
    }
}

thread_local! {
    static PANIC_LOCATION: Cell<Option<(String, u32)>> = const { Cell::new(None) };
}

/// Record where a panic happened so the dispatcher can log it after unwinding
fn install_panic_hook() {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if let Some(location) = info.location() {
                let here = (location.file().to_string(), location.line());
                PANIC_LOCATION.with(|slot| slot.set(Some(here)));
            }
            previous(info);
        }));
    });
}

fn fail(
    res: &mut Response,
    ctx: &AppContext,
    target: Option<&Route>,
    message: String,
    location: Option<(&str, u32)>,
) -> DispatchOutcome {
    let route = target.map_or("-", Route::path);
    let handler = target.map_or_else(String::new, |r| format!("{:?}", r.handler()));
    match location {
        Some((file, line)) => error!(
            error = %message,
            route = %route,
            handler = %handler,
            file = file,
            line = line,
            "Request failed"
        ),
        None => error!(error = %message, route = %route, handler = %handler, "Request failed"),
    }

    *res = Response::new().with_status(500);
    if ctx.config().debug {
        let details = match location {
            Some((file, line)) => format!("{message}\n\nin {file} on line {line}"),
            None => format!("{message}\n\nin {route} ({handler})"),
        };
        res.set_content(Content::Text(details));
    } else {
        res.set_content("Internal Server Error");
    }
    DispatchOutcome::Failed { message }
}
