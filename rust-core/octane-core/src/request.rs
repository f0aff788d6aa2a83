//! # HTTP Request
//!
//! Framework-side request model handed to middleware and handlers.
//!
//! Input is kept in two maps: query data (which also receives matched path
//! parameters) and body data. Lookups prefer body values.

use crate::error::{Error, Result};
use crate::validation::ValidationErrors;
use crate::validator::{Rules, Validator};
use http_body_util::BodyExt;
use hyper::body::Bytes;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// An incoming HTTP request
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Request method as sent by the client (upper-cased)
    method: String,
    /// Full request target including query string
    uri: String,
    /// Request path (without query string)
    path: String,
    /// Query parameters plus merged path parameters
    query: Map<String, Value>,
    /// Form or JSON body fields
    body: Map<String, Value>,
    /// Request headers, lower-cased names
    headers: HashMap<String, String>,
}

impl Request {
    /// Create a request for `method` and `uri`
    ///
    /// The query string of `uri` is parsed into query input.
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        let method = method.into().to_ascii_uppercase();
        let uri = uri.into();
        let (path, query_string) = match uri.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q)),
            None => (uri.clone(), None),
        };
        let query = into_values(parse_query_string(query_string));

        Self {
            method,
            path,
            query,
            uri,
            body: Map::new(),
            headers: HashMap::new(),
        }
    }

    /// Set a body field (builder style)
    #[must_use]
    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body.insert(key.into(), value.into());
        self
    }

    /// Replace the body fields (builder style)
    #[must_use]
    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = body;
        self
    }

    /// Set a header (builder style)
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Convert a hyper request, rejecting bodies above `max_body_size`
    ///
    /// # Errors
    ///
    /// Returns `Error::PayloadTooLarge` for oversized bodies, `Error::Http`
    /// if the body cannot be read and `Error::Json` for malformed JSON bodies
    pub async fn from_hyper_with_limit(
        req: hyper::Request<hyper::body::Incoming>,
        max_body_size: usize,
    ) -> Result<Self> {
        let uri = req
            .uri()
            .path_and_query()
            .map_or_else(|| req.uri().path().to_string(), |pq| pq.as_str().to_string());
        let mut request = Self::new(req.method().as_str(), uri);

        for (name, value) in req.headers() {
            if let Ok(val) = value.to_str() {
                request.set_header(name.as_str(), val);
            }
        }

        if let Some(len) = request
            .header("content-length")
            .and_then(|len| len.parse::<usize>().ok())
        {
            if len > max_body_size {
                return Err(Error::PayloadTooLarge {
                    limit: max_body_size,
                    actual: len,
                });
            }
        }

        let bytes = BodyExt::collect(req.into_body()).await?.to_bytes();
        if bytes.len() > max_body_size {
            return Err(Error::PayloadTooLarge {
                limit: max_body_size,
                actual: bytes.len(),
            });
        }
        request.body = parse_body(request.header("content-type"), &bytes)?;

        Ok(request)
    }

    /// Request method as received
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Full request target including query string
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Request path without the query string
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Look up one input value; body fields shadow query fields
    #[must_use]
    pub fn input(&self, key: &str) -> Option<&Value> {
        self.body.get(key).or_else(|| self.query.get(key))
    }

    /// Look up one input value as a string slice
    #[must_use]
    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.input(key).and_then(Value::as_str)
    }

    /// All input merged; body fields win over query fields
    #[must_use]
    pub fn all_input(&self) -> Map<String, Value> {
        let mut merged = self.query.clone();
        merged.extend(self.body.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    /// Query parameters, including merged path parameters
    #[must_use]
    pub const fn query(&self) -> &Map<String, Value> {
        &self.query
    }

    /// Merge parameters into query input, overwriting same-named keys
    pub fn merge_params<I, K, V>(&mut self, params: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in params {
            self.query.insert(key.into(), value.into());
        }
    }

    /// Run `validator` over all input
    ///
    /// # Errors
    ///
    /// Returns `Error::UnknownRule` if `rules` names an unregistered rule
    pub fn validate(&self, validator: &Validator, rules: &Rules) -> Result<ValidationErrors> {
        validator.validate(rules, &self.all_input())
    }

    /// Get a header value by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Set or override a header
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
    }
}

fn into_values(pairs: HashMap<String, String>) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect()
}

/// Decode a request body into input fields
///
/// JSON objects and urlencoded forms are understood; anything else is ignored.
fn parse_body(content_type: Option<&str>, bytes: &Bytes) -> Result<Map<String, Value>> {
    if bytes.is_empty() {
        return Ok(Map::new());
    }
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match mime.as_str() {
        "application/json" => match serde_json::from_slice::<Value>(bytes)? {
            Value::Object(map) => Ok(map),
            _ => Ok(Map::new()),
        },
        "application/x-www-form-urlencoded" => Ok(into_values(parse_query_string(
            std::str::from_utf8(bytes).ok(),
        ))),
        _ => Ok(Map::new()),
    }
}

/// Parse query string into HashMap
///
/// Handles URL decoding and duplicate keys (last value wins).
fn parse_query_string(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|q| {
            q.split('&')
                .filter(|pair| !pair.is_empty())
                .map(|pair| {
                    let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                    (url_decode(key), url_decode(value))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Basic URL decoding
///
/// Percent escapes are decoded as bytes, so multi-byte UTF-8 sequences survive.
fn url_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..=i + 2]).ok();
                match hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                    Some(byte) => {
                        out.push(byte);
                        i += 2;
                    }
                    None => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_query_string_simple() {
        let result = parse_query_string(Some("page=1&limit=10"));
        assert_eq!(result.get("page"), Some(&"1".to_string()));
        assert_eq!(result.get("limit"), Some(&"10".to_string()));
    }

    #[test]
    fn test_parse_query_string_empty() {
        assert!(parse_query_string(None).is_empty());
        assert!(parse_query_string(Some("")).is_empty());
    }

    #[test]
    fn test_parse_query_string_url_encoded() {
        let result = parse_query_string(Some("name=John+Doe&city=New%20York&flag"));
        assert_eq!(result.get("name"), Some(&"John Doe".to_string()));
        assert_eq!(result.get("city"), Some(&"New York".to_string()));
        assert_eq!(result.get("flag"), Some(&String::new()));
    }

    #[test]
    fn test_url_decode() {
        assert_eq!(url_decode("hello+world"), "hello world");
        assert_eq!(url_decode("hello%20world"), "hello world");
        assert_eq!(url_decode("100%25"), "100%");
        assert_eq!(url_decode("caf%C3%A9"), "café");
        assert_eq!(url_decode("bad%zz"), "bad%zz");
        assert_eq!(url_decode("tail%2"), "tail%2");
    }

    #[test]
    fn test_new_splits_path_and_query() {
        let req = Request::new("get", "/search?q=rust");
        assert_eq!(req.method(), "GET");
        assert_eq!(req.uri(), "/search?q=rust");
        assert_eq!(req.path(), "/search");
        assert_eq!(req.input_str("q"), Some("rust"));
    }

    #[test]
    fn test_body_shadows_query() {
        let req = Request::new("POST", "/form?name=query").with_input("name", "body");
        assert_eq!(req.input_str("name"), Some("body"));
        assert_eq!(req.all_input().get("name"), Some(&json!("body")));
    }

    #[test]
    fn test_merge_params_overwrites_query() {
        let mut req = Request::new("GET", "/users/7?id=1");
        req.merge_params([("id", "7")]);
        assert_eq!(req.input_str("id"), Some("7"));
        assert_eq!(req.query().len(), 1);
    }

    #[test]
    fn test_headers_case_insensitive() {
        let req = Request::new("GET", "/").with_header("X-Request-Id", "abc");
        assert_eq!(req.header("x-request-id"), Some("abc"));
        assert_eq!(req.header("X-REQUEST-ID"), Some("abc"));
    }

    #[test]
    fn test_parse_form_body() {
        let body = Bytes::from_static(b"name=Alice&email=a%40b.co");
        let map =
            parse_body(Some("application/x-www-form-urlencoded; charset=utf-8"), &body).unwrap();
        assert_eq!(map.get("email"), Some(&json!("a@b.co")));
    }

    #[test]
    fn test_parse_json_body() {
        let body = Bytes::from_static(br#"{"age": 30, "name": "Bob"}"#);
        let map = parse_body(Some("application/json"), &body).unwrap();
        assert_eq!(map.get("age"), Some(&json!(30)));

        let bad = Bytes::from_static(b"{not json");
        assert!(parse_body(Some("application/json"), &bad).is_err());
    }

    #[test]
    fn test_unknown_body_type_ignored() {
        let body = Bytes::from_static(b"raw");
        assert!(parse_body(Some("text/plain"), &body).unwrap().is_empty());
    }
}
