//! Host request and response types.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde_json::{json, Value};

use crate::error::DiError;
use crate::signature::ValueSource;

/// HTTP method of a route or request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    /// Upper-case method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            other => Err(format!("unsupported method: {}", other)),
        }
    }
}

/// Incoming request as seen by the binding layer.
///
/// Header names are stored lowercase. A `cookie` header is split into the
/// cookie map as it is added.
///
/// ```rust
/// use ferrous_inject::routing::{Method, Request};
///
/// let request = Request::get("/items")
///     .query("page", "2")
///     .header("Cookie", "session=abc; theme=dark");
///
/// assert_eq!(request.method(), Method::Get);
/// assert_eq!(request.query_value("page"), Some("2"));
/// assert_eq!(request.cookie_value("theme"), Some("dark"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Request {
    method: Method,
    path: String,
    query: HashMap<String, String>,
    headers: HashMap<String, String>,
    cookies: HashMap<String, String>,
    path_params: HashMap<String, String>,
}

impl Request {
    /// Request with no query, headers, cookies or path parameters.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Request {
            method,
            path: path.into(),
            ..Default::default()
        }
    }

    /// GET request for `path`.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// POST request for `path`.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Adds a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Adds a header; names are case-insensitive.
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        let name = name.as_ref().to_ascii_lowercase();
        let value = value.into();
        if name == "cookie" {
            self.cookies.extend(parse_cookies(&value));
        }
        self.headers.insert(name, value);
        self
    }

    /// Adds a cookie.
    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Request method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Raw request path, query string excluded.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query value for `name`.
    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Header value for `name`, matched case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Cookie value for `name`.
    pub fn cookie_value(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Decoded path parameter bound by the matched route.
    pub fn path_value(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// Raw value of a parameter from the given source.
    pub fn value(&self, source: ValueSource, name: &str) -> Option<&str> {
        match source {
            ValueSource::Query => self.query_value(name),
            ValueSource::Path => self.path_value(name),
            ValueSource::Header => self
                .header_value(name)
                .or_else(|| self.header_value(&name.replace('_', "-"))),
            ValueSource::Cookie => self.cookie_value(name),
        }
    }

    pub(crate) fn set_path_params(&mut self, params: HashMap<String, String>) {
        self.path_params = params;
    }
}

fn parse_cookies(header: &str) -> impl Iterator<Item = (String, String)> + '_ {
    header.split(';').filter_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some((name.to_string(), value.trim().to_string()))
    })
}

/// Response produced by dispatch: a status code and a JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    /// Response with an explicit status.
    pub fn new(status: u16, body: Value) -> Self {
        Response { status, body }
    }

    /// 200 response.
    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    /// Error response with `{"detail": message}`.
    pub fn from_error(err: &DiError) -> Self {
        Self::new(err.status_code(), json!({ "detail": err.to_string() }))
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// JSON body.
    pub fn json(&self) -> &Value {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = Request::get("/").header("X-Request-Id", "7");
        assert_eq!(request.header_value("x-request-id"), Some("7"));
        assert_eq!(request.value(ValueSource::Header, "x_request_id"), Some("7"));
    }

    #[test]
    fn malformed_cookie_pairs_are_skipped() {
        let request = Request::get("/").header("cookie", "a=1; broken; =2; b = 3");
        assert_eq!(request.cookie_value("a"), Some("1"));
        assert_eq!(request.cookie_value("b"), Some("3"));
        assert_eq!(request.cookie_value("broken"), None);
    }

    #[test]
    fn error_response_carries_detail() {
        let response = Response::from_error(&DiError::RouteNotFound {
            method: "GET".into(),
            path: "/missing".into(),
        });
        assert_eq!(response.status, 404);
        assert_eq!(response.body["detail"], "No route for GET /missing");
    }
}
