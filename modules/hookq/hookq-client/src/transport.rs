use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use serde_json::Value;
use url::Url;

use crate::error::{BoxError, ClientError};

/// Error returned by a [`Transport`]. Returning a boxed [`ClientError`]
/// makes dispatch surface it unchanged; anything else becomes
/// [`ClientError::Network`].
pub type TransportError = BoxError;

/// Fully resolved request handed to a transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// Buffered HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Response with a JSON-encoded body.
    #[must_use]
    pub fn json(status: StatusCode, body: &Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        Self {
            status,
            headers,
            body: Bytes::from(body.to_string()),
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Body as text, lossy on invalid UTF-8.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends one HTTP request and buffers the response.
///
/// Implementations must not retry; every call maps to exactly one request.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a default `reqwest` client.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(|e| ClientError::validation(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http_client })
    }

    /// Reuse an existing client, e.g. one with custom TLS or proxy settings.
    #[must_use]
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut req_builder = self
            .http_client
            .request(request.method, request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            req_builder = req_builder.body(body);
        }

        let resp = req_builder.send().await.map_err(|e| {
            tracing::trace!(
                timeout = e.is_timeout(),
                connect = e.is_connect(),
                error = %e,
                "reqwest send failed"
            );
            e
        })?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
