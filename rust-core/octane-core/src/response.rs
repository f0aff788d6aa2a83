//! # HTTP Response
//!
//! Mutable response shared by middleware and the dispatcher.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::StatusCode;
use serde_json::Value;
use std::collections::HashMap;

/// Body content produced by a handler
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Content {
    /// No body
    #[default]
    Empty,
    /// `text/plain` body
    Text(String),
    /// `text/html` body
    Html(String),
    /// `application/json` body
    Json(Value),
}

impl Content {
    /// Wrap markup as an HTML body
    pub fn html(markup: impl Into<String>) -> Self {
        Self::Html(markup.into())
    }

    /// Content type header value, if any
    #[must_use]
    pub const fn content_type(&self) -> Option<&'static str> {
        match self {
            Self::Empty => None,
            Self::Text(_) => Some("text/plain; charset=utf-8"),
            Self::Html(_) => Some("text/html; charset=utf-8"),
            Self::Json(_) => Some("application/json"),
        }
    }

    /// Serialized body
    #[must_use]
    pub fn to_body(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) | Self::Html(s) => s.clone(),
            Self::Json(v) => v.to_string(),
        }
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<Value> for Content {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

impl From<()> for Content {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

/// Outgoing HTTP response
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response body
    pub content: Content,
    /// Extra response headers
    pub headers: HashMap<String, String>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            content: Content::Empty,
            headers: HashMap::new(),
        }
    }
}

impl From<Content> for Response {
    fn from(content: Content) -> Self {
        Self {
            content,
            ..Self::default()
        }
    }
}

impl From<String> for Response {
    fn from(s: String) -> Self {
        Content::from(s).into()
    }
}

impl From<&str> for Response {
    fn from(s: &str) -> Self {
        Content::from(s).into()
    }
}

impl From<Value> for Response {
    fn from(v: Value) -> Self {
        Content::from(v).into()
    }
}

impl From<()> for Response {
    fn from((): ()) -> Self {
        Self::default()
    }
}

/// What a handler hands back to the dispatcher
///
/// Bare content only replaces the body, so a status or header set by
/// middleware survives. A full response also replaces the status.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Body only
    Content(Content),
    /// Status, body and extra headers
    Full(Response),
}

impl Reply {
    /// Write this reply into the shared response
    pub fn apply(self, res: &mut Response) {
        match self {
            Self::Content(content) => res.set_content(content),
            Self::Full(other) => res.merge(other),
        }
    }
}

impl From<Response> for Reply {
    fn from(res: Response) -> Self {
        Self::Full(res)
    }
}

impl From<Content> for Reply {
    fn from(content: Content) -> Self {
        Self::Content(content)
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Self::Content(s.into())
    }
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self {
        Self::Content(s.into())
    }
}

impl From<Value> for Reply {
    fn from(v: Value) -> Self {
        Self::Content(v.into())
    }
}

impl From<()> for Reply {
    fn from((): ()) -> Self {
        Self::Content(Content::Empty)
    }
}

impl Response {
    /// Create an empty 200 response
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a response for an aborted request
    #[must_use]
    pub fn aborted(status: u16, message: &str) -> Self {
        let mut res = Self::new();
        res.abort(status, message);
        res
    }

    /// Replace the body
    pub fn set_content(&mut self, content: impl Into<Content>) {
        self.content = content.into();
    }

    /// Set status code
    pub fn set_status_code(&mut self, status: u16) {
        self.status = status;
    }

    /// Set status and a plain-text message body
    pub fn abort(&mut self, status: u16, message: &str) {
        self.status = status;
        self.content = Content::Text(message.to_string());
    }

    /// Turn into a 302 redirect to `location`
    pub fn redirect(&mut self, location: &str) {
        self.status = 302;
        self.content = Content::Empty;
        self.set_header("Location", location);
    }

    /// Set or override a header
    pub fn set_header(&mut self, key: &str, value: &str) {
        self.headers.insert(key.to_string(), value.to_string());
    }

    /// Get a header value
    #[must_use]
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Set status code
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Replace the body
    #[must_use]
    pub fn with_content(mut self, content: impl Into<Content>) -> Self {
        self.content = content.into();
        self
    }

    /// Take status and content from `other` and add its headers
    pub fn merge(&mut self, other: Self) {
        self.status = other.status;
        self.content = other.content;
        self.headers.extend(other.headers);
    }

    /// Convert to hyper Response
    pub(crate) fn into_hyper(self) -> hyper::Response<Full<Bytes>> {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut builder = hyper::Response::builder().status(status);
        if let Some(content_type) = self.content.content_type() {
            builder = builder.header("Content-Type", content_type);
        }
        for (k, v) in &self.headers {
            builder = builder.header(k.as_str(), v.as_str());
        }

        builder
            .body(Full::new(Bytes::from(self.content.to_body())))
            .unwrap_or_else(|_| {
                let mut fallback =
                    hyper::Response::new(Full::new(Bytes::from("Internal Server Error")));
                *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_response() {
        let res = Response::new();
        assert_eq!(res.status, 200);
        assert_eq!(res.content, Content::Empty);
    }

    #[test]
    fn test_set_content_conversions() {
        let mut res = Response::new();
        res.set_content("hello");
        assert_eq!(res.content, Content::Text("hello".to_string()));

        res.set_content(json!({"ok": true}));
        assert_eq!(res.content.to_body(), r#"{"ok":true}"#);
        assert_eq!(res.content.content_type(), Some("application/json"));
    }

    #[test]
    fn test_abort_and_redirect() {
        let res = Response::aborted(403, "Forbidden");
        assert_eq!(res.status, 403);
        assert_eq!(res.content.to_body(), "Forbidden");

        let mut res = Response::new();
        res.redirect("/login");
        assert_eq!(res.status, 302);
        assert_eq!(res.header("location"), Some("/login"));
    }

    #[test]
    fn test_into_hyper() {
        let mut res = Response::new().with_status(201);
        res.set_content(Content::html("<p>hi</p>"));
        res.set_header("X-Request-Id", "abc");

        let hyper_res = res.into_hyper();
        assert_eq!(hyper_res.status(), StatusCode::CREATED);
        assert_eq!(
            hyper_res.headers().get("content-type").unwrap(),
            "text/html; charset=utf-8"
        );
        assert_eq!(hyper_res.headers().get("x-request-id").unwrap(), "abc");
    }

    #[test]
    fn test_merge_keeps_existing_headers() {
        let mut res = Response::new();
        res.set_header("X-Guard", "passed");

        res.merge(Response::from(json!({"errors": []})).with_status(422));

        assert_eq!(res.status, 422);
        assert_eq!(res.content, Content::Json(json!({"errors": []})));
        assert_eq!(res.header("x-guard"), Some("passed"));
    }

    #[test]
    fn test_content_reply_keeps_status() {
        let mut res = Response::new().with_status(201);
        res.set_header("X-Guard", "passed");

        Reply::from("created").apply(&mut res);
        assert_eq!(res.status, 201);
        assert_eq!(res.content, Content::Text("created".to_string()));

        Reply::from(Response::from("gone").with_status(410)).apply(&mut res);
        assert_eq!(res.status, 410);
        assert_eq!(res.header("x-guard"), Some("passed"));
    }

    #[test]
    fn test_invalid_status_falls_back_to_500() {
        let hyper_res = Response::new().with_status(1000).into_hyper();
        assert_eq!(hyper_res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
