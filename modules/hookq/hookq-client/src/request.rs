use std::borrow::Cow;

use http::Method;
use serde::Serialize;

use crate::body::Body;
use crate::error::ClientError;

/// A hookq API call before it is bound to a base URL and credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Body,
}

impl Request {
    /// Create a new request builder
    #[must_use]
    pub fn builder() -> RequestBuilder {
        RequestBuilder::default()
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Path relative to the API base URL, always starting with `/`.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query parameters in insertion order.
    #[must_use]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// First value of the query parameter `name`.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn body(&self) -> &Body {
        &self.body
    }

    #[must_use]
    pub fn into_body(self) -> Body {
        self.body
    }
}

/// Builder for constructing requests with a fluent API
#[derive(Debug, Default)]
pub struct RequestBuilder {
    method: Option<Method>,
    path: Option<String>,
    query: Vec<(String, String)>,
    body: Body,
}

impl RequestBuilder {
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Append a query parameter. Repeated names are kept.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Set the body to a JSON-serialized value.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] if `value` is not JSON-serializable.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, ClientError> {
        self.body = Body::from_json(value)?;
        Ok(self)
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Build the request
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] when the path is missing or relative.
    pub fn build(self) -> Result<Request, ClientError> {
        let path = self
            .path
            .ok_or_else(|| ClientError::validation("request path is required"))?;
        if !path.starts_with('/') {
            return Err(ClientError::validation(format!(
                "request path must start with '/': {path}"
            )));
        }

        Ok(Request {
            method: self.method.unwrap_or(Method::GET),
            path,
            query: self.query,
            body: self.body,
        })
    }
}

/// Escapes that `encodeURIComponent` leaves as literal characters.
const KEPT_LITERAL: [(&str, &str); 5] = [
    ("%21", "!"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%2A", "*"),
];

/// Percent-encodes a value for use as a single path segment.
///
/// Matches `encodeURIComponent`: ASCII alphanumerics and `-_.!~*'()` stay
/// literal, every other byte of the UTF-8 encoding is escaped.
#[must_use]
pub fn path_segment(raw: &str) -> Cow<'_, str> {
    let encoded = urlencoding::encode(raw);
    if !KEPT_LITERAL
        .iter()
        .any(|(escaped, _)| encoded.contains(*escaped))
    {
        return encoded;
    }

    let mut segment = encoded.into_owned();
    for (escaped, literal) in KEPT_LITERAL {
        segment = segment.replace(escaped, literal);
    }
    Cow::Owned(segment)
}
