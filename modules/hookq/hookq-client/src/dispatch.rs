use std::sync::Arc;
use std::time::Duration;

use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use http::{HeaderMap, HeaderValue, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use url::Url;

use crate::error::ClientError;
use crate::request::Request;
use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};

/// Binds requests to the API base URL and credentials, sends them through
/// the transport and classifies the outcome.
///
/// Holds only immutable state, so one dispatcher serves concurrent calls.
pub struct Dispatcher {
    base_url: Url,
    token: SecretString,
    timeout: Duration,
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(
        base_url: Url,
        token: SecretString,
        timeout: Duration,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            base_url,
            token,
            timeout,
            transport,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Sends `request` once and returns the parsed JSON body.
    pub async fn execute(&self, request: Request) -> Result<Value, ClientError> {
        let http_request = self.prepare(&request)?;
        let method = http_request.method.clone();
        let path = http_request.url.path().to_owned();

        tracing::debug!(%method, %path, "dispatching hookq request");

        let response = match self.send_with_timeout(http_request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(%method, %path, error = %err, "hookq request failed");
                return Err(err);
            }
        };

        tracing::debug!(
            %method,
            %path,
            status = response.status.as_u16(),
            "hookq response received"
        );

        if let Some(err) = error_for_status(&response) {
            return Err(err);
        }
        parse_json_body(&response)
    }

    /// One transport round trip, bounded by the configured timeout.
    async fn send_with_timeout(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let send = self.transport.send(request);
        match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => Err(classify_transport_error(err)),
            Err(elapsed) => Err(ClientError::Network {
                message: format!("request timed out after {} ms", self.timeout.as_millis()),
                source: Box::new(elapsed),
            }),
        }
    }

    fn prepare(&self, request: &Request) -> Result<HttpRequest, ClientError> {
        let mut url = self.join(request.path())?;
        if !request.query().is_empty() {
            url.query_pairs_mut().extend_pairs(request.query());
        }

        let mut headers = HeaderMap::new();
        let bearer = format!("Bearer {}", self.token.expose_secret());
        let mut auth = HeaderValue::from_str(&bearer)
            .map_err(|_| ClientError::validation("API token has invalid header characters"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let body = request.body().to_bytes()?;
        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        Ok(HttpRequest {
            method: request.method().clone(),
            url,
            headers,
            body,
        })
    }

    /// Appends `path` to the base URL, keeping any base path prefix.
    fn join(&self, path: &str) -> Result<Url, ClientError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}{path}"))
            .map_err(|e| ClientError::validation(format!("invalid request URL for {path}: {e}")))
    }
}

/// A transport that already produced a [`ClientError`] keeps it; everything
/// else is a network failure.
fn classify_transport_error(err: TransportError) -> ClientError {
    match err.downcast::<ClientError>() {
        Ok(client_error) => *client_error,
        Err(other) => ClientError::network(other),
    }
}

/// Maps a non-2xx response onto the error taxonomy.
///
/// Checked in order: 401, 403, 404, 429, any status of 500 or above, then
/// every other non-success status. Returns `None` for 2xx.
#[must_use]
pub fn error_for_status(response: &HttpResponse) -> Option<ClientError> {
    let status = response.status;
    if status.is_success() {
        return None;
    }

    let body = response.text();
    let message = error_message(status, &body);

    let err = match status {
        StatusCode::UNAUTHORIZED => ClientError::Authentication { message },
        StatusCode::FORBIDDEN => ClientError::Authorization { message },
        StatusCode::NOT_FOUND => ClientError::NotFound { message },
        StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimit {
            message,
            retry_after: parse_retry_after(&response.headers),
        },
        s if s.as_u16() >= 500 => ClientError::Server {
            status: s,
            message: if body.is_empty() {
                message
            } else {
                format!("{message}: {body}")
            },
        },
        s => ClientError::Api {
            status: s,
            message,
            body,
        },
    };
    Some(err)
}

/// Prefers a `message` or `error` string from a JSON error body.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error"]
                .iter()
                .find_map(|key| value.get(key).and_then(Value::as_str).map(str::to_owned))
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_owned)
        })
}

/// Integer seconds only; an HTTP-date or garbage yields `None`.
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn parse_json_body(response: &HttpResponse) -> Result<Value, ClientError> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&response.body).map_err(|e| ClientError::Network {
        message: format!("response body is not valid JSON: {e}"),
        source: Box::new(e),
    })
}
