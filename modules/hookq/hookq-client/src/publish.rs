//! Encoding of the `publish` call.
//!
//! The service has no separate channel for scheduling metadata, so it is
//! carried under reserved names: as query parameters when the callback is
//! invoked with `GET`, or as top-level fields of the JSON body otherwise.

use std::collections::BTreeMap;

use http::Method;
use serde_json::{Map, Value};

use crate::body::Body;
use crate::error::ClientError;
use crate::request::{Request, path_segment};

pub const QUEUE_DELAY: &str = "Queue-Delay";
pub const QUEUE_NOT_BEFORE: &str = "Queue-notBefore";
pub const QUEUE_TIMEZONE: &str = "Queue-timezone";
pub const QUEUE_METHOD: &str = "Queue-Method";
/// Prefix of one entry per forwarded header, e.g. `Queue-Forward-X-Tenant`.
pub const QUEUE_FORWARD_PREFIX: &str = "Queue-Forward-";

/// Scheduling and forwarding options for [`crate::HookqClient::publish`].
///
/// `delay` and `not_before` are both passed through when set; the service
/// decides which one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishOptions {
    /// Headers the service attaches when calling the callback. Names keep
    /// their case.
    pub headers: BTreeMap<String, String>,
    /// Relative delay such as `5m` or `30s`.
    pub delay: Option<String>,
    /// Absolute earliest delivery time.
    pub not_before: Option<String>,
    /// IANA zone used to interpret `not_before`.
    pub timezone: Option<String>,
    /// HTTP method used for the callback, `POST` when unset.
    ///
    /// The same verb is used for the publish request itself, and it picks the
    /// encoding: `GET` sends the reserved fields as query parameters with no
    /// body, any other method sends them in the JSON body.
    pub method: Option<String>,
}

impl PublishOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn delay(mut self, delay: impl Into<String>) -> Self {
        self.delay = Some(delay.into());
        self
    }

    #[must_use]
    pub fn not_before(mut self, not_before: impl Into<String>) -> Self {
        self.not_before = Some(not_before.into());
        self
    }

    #[must_use]
    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Reserved name/value pairs in wire order. Empty values are skipped.
    fn reserved_fields(&self, explicit_method: Option<&str>) -> Vec<(String, String)> {
        let scheduling = [
            (QUEUE_DELAY, self.delay.as_deref()),
            (QUEUE_NOT_BEFORE, self.not_before.as_deref()),
            (QUEUE_TIMEZONE, self.timezone.as_deref()),
            (QUEUE_METHOD, explicit_method),
        ];

        let mut fields: Vec<(String, String)> = scheduling
            .into_iter()
            .filter_map(|(name, value)| {
                value
                    .filter(|v| !v.is_empty())
                    .map(|v| (name.to_owned(), v.to_owned()))
            })
            .collect();

        for (name, value) in &self.headers {
            fields.push((format!("{QUEUE_FORWARD_PREFIX}{name}"), value.clone()));
        }
        fields
    }
}

/// Builds the request for publishing `payload` to the callback `url`.
///
/// # Errors
/// Returns [`ClientError::Validation`] if `url` is empty or the method is not
/// a valid HTTP token.
pub fn build_publish_request(
    url: &str,
    payload: &Map<String, Value>,
    options: Option<&PublishOptions>,
) -> Result<Request, ClientError> {
    if url.is_empty() {
        return Err(ClientError::validation("callback URL is required"));
    }

    let defaults = PublishOptions::default();
    let options = options.unwrap_or(&defaults);

    let explicit_method = options
        .method
        .as_deref()
        .filter(|m| !m.is_empty())
        .map(str::to_uppercase);
    let method = match explicit_method.as_deref() {
        Some(name) => Method::from_bytes(name.as_bytes())
            .map_err(|_| ClientError::validation(format!("invalid HTTP method: {name}")))?,
        None => Method::POST,
    };

    let reserved = options.reserved_fields(explicit_method.as_deref());
    let builder = Request::builder()
        .method(method.clone())
        .path(format!("/publish/{}", path_segment(url)));

    if method == Method::GET {
        return reserved
            .into_iter()
            .fold(builder, |builder, (name, value)| builder.query(name, value))
            .build();
    }

    // Payload first so reserved names win on collision.
    let mut body = payload.clone();
    for (name, value) in reserved {
        body.insert(name, Value::String(value));
    }
    builder.body(Body::Json(Value::Object(body))).build()
}
