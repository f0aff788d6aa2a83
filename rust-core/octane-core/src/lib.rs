//! # Octane Core
//!
//! Core library of the Octane web micro-framework: a regex-based router
//! that dispatches requests to handlers through per-route middleware, and
//! a declarative field validator driven by compact rule specs such as
//! `"min:5"`.
//!
//! ## Modules
//!
//! - `route` - Route registration and path pattern compilation
//! - `router` - First-match dispatcher
//! - `middleware` - Pre-handler hooks that may abort a request
//! - `request` / `response` - Request input and response content
//! - `rules` - Built-in validation rules
//! - `registry` - Rule name resolution
//! - `validator` - Rule spec parsing and evaluation
//! - `validation` - Per-field validation errors
//! - `context` / `state` - Application context and service container
//! - `config` - TOML, environment and `.env` configuration
//! - `database` - SQLx pools for SQLite and PostgreSQL
//! - `application` / `server` - Request handling and the HTTP server
//! - `error` - Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod application;
pub mod config;
pub mod context;
pub mod database;
pub mod error;
pub mod middleware;
pub mod registry;
pub mod request;
pub mod response;
pub mod route;
pub mod router;
pub mod rules;
pub mod server;
pub mod state;
pub mod validation;
pub mod validator;

pub use application::Application;
pub use config::{AppConfig, DatabaseConfig};
pub use context::AppContext;
pub use database::{DatabasePool, DbValue};
pub use error::{Error, Result};
pub use middleware::{
    AbortMiddleware, LoggingMiddleware, Middleware, MiddlewareChain, MiddlewareResult,
    RedirectMiddleware,
};
pub use registry::RuleRegistry;
pub use request::Request;
pub use response::{Content, Reply, Response};
pub use route::{Handler, Route, RouteBuilder, RouteTable};
pub use router::{DispatchOutcome, Method, RouteMatch, Router};
pub use rules::Rule;
pub use server::{Server, ServerConfig};
pub use state::Container;
pub use validation::{FieldError, ValidationCode, ValidationErrors};
pub use validator::{ErrorPolicy, RuleSpec, Rules, Validator};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
