//! # Error Handling
//!
//! Centralized error types for Octane core.
//! Uses `thiserror` for ergonomic error definitions.

use std::panic::Location;
use thiserror::Error;

/// Result type alias for Octane operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the Octane runtime
#[derive(Error, Debug)]
pub enum Error {
    /// Server failed to bind to the specified address
    #[error("Failed to bind server to {address}: {source}")]
    BindError {
        /// The address we tried to bind to
        address: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// No registered route matched the request
    #[error("No route found for {method} {path}")]
    RouteNotFound {
        /// Request method as received
        method: String,
        /// The path that wasn't matched
        path: String,
    },

    /// Invalid route pattern provided
    #[error("Invalid route pattern: {pattern}: {reason}")]
    InvalidRoutePattern {
        /// The invalid pattern
        pattern: String,
        /// Reason for invalidity
        reason: String,
    },

    /// A rule spec referenced a rule name absent from the registry
    #[error("Validation rule '{name}' does not exist.")]
    UnknownRule {
        /// The unresolved rule name
        name: String,
    },

    /// A handler or middleware failed while serving a request
    #[error("{message} ({file}:{line})")]
    Handler {
        /// Failure description
        message: String,
        /// Source file where the failure was raised
        file: &'static str,
        /// Source line where the failure was raised
        line: u32,
    },

    /// Service lookup in the application container failed
    #[error("Service not found: {name}")]
    ServiceNotFound {
        /// Requested service name
        name: String,
    },

    /// Configuration could not be loaded
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("Database error: {message}")]
    Database {
        /// Error message from database
        message: String,
    },

    /// Request payload too large
    #[error("Payload too large: limit={limit} bytes, received={actual} bytes")]
    PayloadTooLarge {
        /// Max allowed size
        limit: usize,
        /// Actual size
        actual: usize,
    },
}

impl Error {
    /// Create a handler error tagged with the caller's file and line
    #[track_caller]
    pub fn handler(message: impl Into<String>) -> Self {
        let location = Location::caller();
        Self::Handler {
            message: message.into(),
            file: location.file(),
            line: location.line(),
        }
    }

    /// Source location attached to this error, if any
    #[must_use]
    pub const fn location(&self) -> Option<(&'static str, u32)> {
        match self {
            Self::Handler { file, line, .. } => Some((file, *line)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_not_found_error() {
        let err = Error::RouteNotFound {
            method: "GET".to_string(),
            path: "/unknown".to_string(),
        };
        assert!(err.to_string().contains("/unknown"));
        assert!(err.to_string().contains("GET"));
    }

    #[test]
    fn test_unknown_rule_message() {
        let err = Error::UnknownRule {
            name: "bogus".to_string(),
        };
        assert_eq!(err.to_string(), "Validation rule 'bogus' does not exist.");
    }

    #[test]
    fn test_handler_error_captures_location() {
        let err = Error::handler("boom");
        let (file, line) = err.location().unwrap();
        assert!(file.ends_with("error.rs"));
        assert!(line > 0);
        assert!(err.to_string().starts_with("boom"));
    }

    #[test]
    fn test_bind_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err = Error::BindError {
            address: "127.0.0.1:8000".to_string(),
            source: io_err,
        };
        assert!(err.to_string().contains("127.0.0.1:8000"));
    }
}
