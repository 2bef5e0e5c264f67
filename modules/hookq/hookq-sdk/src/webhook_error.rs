//! Delivery-side failures.
//!
//! A [`WebhookError`] describes the service failing to reach a *callback*
//! endpoint. It is built by callers from [`CallbackErrorRecord`] data and is
//! never produced by the client when talking to the hookq API itself, so it
//! has no conversion into the client's error type.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::models::{CallbackErrorCode, CallbackErrorRecord, MessageId};
use crate::schema::WireEnum;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{code}: {message}")]
pub struct WebhookError {
    pub code: CallbackErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl WebhookError {
    pub fn new(code: CallbackErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            http_status: None,
            message_id: None,
            attempt_number: None,
            duration_ms: None,
        }
    }

    /// Rebuilds the failure reported in an error record.
    #[must_use]
    pub fn from_record(record: &CallbackErrorRecord) -> Self {
        Self {
            code: record.error_code,
            message: record.message.clone(),
            http_status: record.http_status,
            message_id: Some(record.message_id.clone()),
            attempt_number: record.attempt_number,
            duration_ms: record.duration_ms,
        }
    }

    /// The callback host name did not resolve.
    pub fn dns_not_found(host: impl AsRef<str>) -> Self {
        Self::new(
            CallbackErrorCode::DnsNotFound,
            format!("DNS lookup failed: host `{}` not found", host.as_ref()),
        )
    }

    /// The resolver did not answer in time.
    pub fn dns_timeout(host: impl AsRef<str>) -> Self {
        Self::new(
            CallbackErrorCode::DnsTimeout,
            format!("DNS lookup timed out for host `{}`", host.as_ref()),
        )
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(CallbackErrorCode::NetworkError, message)
    }

    pub fn connection_refused(target: impl AsRef<str>) -> Self {
        Self::new(
            CallbackErrorCode::ConnectionRefused,
            format!("connection refused by `{}`", target.as_ref()),
        )
    }

    /// The callback endpoint answered 404.
    pub fn not_found(url: impl AsRef<str>) -> Self {
        Self {
            http_status: Some(404),
            ..Self::new(
                CallbackErrorCode::Http4xx,
                format!(
                    "callback endpoint `{}` returned 404 Not Found",
                    url.as_ref()
                ),
            )
        }
    }

    #[must_use]
    pub fn with_message_id(mut self, id: MessageId) -> Self {
        self.message_id = Some(id);
        self
    }

    #[must_use]
    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    #[must_use]
    pub fn with_attempt(mut self, attempt_number: u32) -> Self {
        self.attempt_number = Some(attempt_number);
        self
    }

    /// Whether another delivery attempt could plausibly succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self.code {
            CallbackErrorCode::Http5xx
            | CallbackErrorCode::Timeout
            | CallbackErrorCode::ConnectionRefused
            | CallbackErrorCode::ConnectionReset
            | CallbackErrorCode::DnsTimeout
            | CallbackErrorCode::NetworkError => true,
            CallbackErrorCode::Http4xx => matches!(self.http_status, Some(408 | 429)),
            CallbackErrorCode::DnsNotFound | CallbackErrorCode::Unknown => false,
        }
    }

    /// Plain JSON record, with the same field names as the wire format.
    #[must_use]
    pub fn to_record(&self) -> Value {
        let mut record = Map::new();
        record.insert("code".into(), Value::from(self.code.as_str()));
        record.insert("message".into(), Value::from(self.message.as_str()));
        if let Some(status) = self.http_status {
            record.insert("httpStatus".into(), Value::from(status));
        }
        if let Some(id) = &self.message_id {
            record.insert("messageId".into(), Value::from(id.as_str()));
        }
        if let Some(attempt) = self.attempt_number {
            record.insert("attemptNumber".into(), Value::from(attempt));
        }
        if let Some(duration) = self.duration_ms {
            record.insert("durationMs".into(), Value::from(duration));
        }
        Value::Object(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use serde_json::json;

    #[test]
    fn factories_set_codes() {
        assert_eq!(
            WebhookError::dns_not_found("example.invalid").code,
            CallbackErrorCode::DnsNotFound
        );
        assert_eq!(
            WebhookError::dns_timeout("example.com").code,
            CallbackErrorCode::DnsTimeout
        );
        assert_eq!(
            WebhookError::network("reset").code,
            CallbackErrorCode::NetworkError
        );

        let nf = WebhookError::not_found("https://example.com/hook");
        assert_eq!(nf.code, CallbackErrorCode::Http4xx);
        assert_eq!(nf.http_status, Some(404));
        assert!(!nf.is_retryable());
    }

    #[test]
    fn from_record_copies_fields() {
        let record = CallbackErrorRecord::validate(&json!({
            "id": "err_1",
            "messageId": "msg_01HZX3K9Q8M7N6P5R4S3T2V1W0",
            "errorCode": "HTTP_5XX",
            "message": "upstream returned 503",
            "httpStatus": 503,
            "createdAt": "2024-01-15T10:30:00Z",
            "attemptNumber": 2,
            "durationMs": 1200
        }))
        .unwrap();

        let err = WebhookError::from_record(&record);
        assert_eq!(err.code, CallbackErrorCode::Http5xx);
        assert_eq!(err.http_status, Some(503));
        assert_eq!(err.attempt_number, Some(2));
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "HTTP_5XX: upstream returned 503");

        assert_eq!(
            err.to_record(),
            json!({
                "code": "HTTP_5XX",
                "message": "upstream returned 503",
                "httpStatus": 503,
                "messageId": "msg_01HZX3K9Q8M7N6P5R4S3T2V1W0",
                "attemptNumber": 2,
                "durationMs": 1200
            })
        );
        assert_eq!(serde_json::to_value(&err).unwrap(), err.to_record());
    }

    #[test]
    fn rate_limited_callback_is_retryable() {
        let err = WebhookError::new(CallbackErrorCode::Http4xx, "too many")
            .with_http_status(429);
        assert!(err.is_retryable());
        assert!(!WebhookError::dns_not_found("x").is_retryable());
    }
}
