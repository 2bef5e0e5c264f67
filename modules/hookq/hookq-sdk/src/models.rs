use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::{
    self, Fields, Nullable, Schema, SchemaError, SchemaIssue, WireEnum, schema_try_from,
    wire_time,
};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Message identifier: `msg_` followed by a 26-character ULID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Caller has already checked the format.
    pub(crate) fn new_unchecked(raw: String) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FromStr for MessageId {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        schema::message_id(&Value::String(s.to_owned()))
            .map_err(|reason| SchemaError::single("", reason))
    }
}

impl TryFrom<String> for MessageId {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MessageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

macro_rules! wire_display {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }

            impl FromStr for $ty {
                type Err = SchemaError;

                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    schema::enumeration(&Value::String(s.to_owned()))
                        .map_err(|reason| SchemaError::single("", reason))
                }
            }
        )+
    };
}

/// Delivery state of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    DeadLetter,
}

impl WireEnum for MessageStatus {
    const ALL: &'static [Self] = &[
        Self::Pending,
        Self::Processing,
        Self::Completed,
        Self::Failed,
        Self::DeadLetter,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::DeadLetter => "dead_letter",
        }
    }
}

/// Why a callback delivery attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallbackErrorCode {
    #[serde(rename = "HTTP_4XX")]
    Http4xx,
    #[serde(rename = "HTTP_5XX")]
    Http5xx,
    #[serde(rename = "TIMEOUT")]
    Timeout,
    #[serde(rename = "CONNECTION_REFUSED")]
    ConnectionRefused,
    #[serde(rename = "CONNECTION_RESET")]
    ConnectionReset,
    #[serde(rename = "DNS_NOT_FOUND")]
    DnsNotFound,
    #[serde(rename = "DNS_TIMEOUT")]
    DnsTimeout,
    #[serde(rename = "NETWORK_ERROR")]
    NetworkError,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl WireEnum for CallbackErrorCode {
    const ALL: &'static [Self] = &[
        Self::Http4xx,
        Self::Http5xx,
        Self::Timeout,
        Self::ConnectionRefused,
        Self::ConnectionReset,
        Self::DnsNotFound,
        Self::DnsTimeout,
        Self::NetworkError,
        Self::Unknown,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Http4xx => "HTTP_4XX",
            Self::Http5xx => "HTTP_5XX",
            Self::Timeout => "TIMEOUT",
            Self::ConnectionRefused => "CONNECTION_REFUSED",
            Self::ConnectionReset => "CONNECTION_RESET",
            Self::DnsNotFound => "DNS_NOT_FOUND",
            Self::DnsTimeout => "DNS_TIMEOUT",
            Self::NetworkError => "NETWORK_ERROR",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl CallbackErrorCode {
    /// Code for an HTTP status returned by a callback endpoint, if the status
    /// is a failure.
    #[must_use]
    pub fn from_http_status(status: u16) -> Option<Self> {
        match status {
            400..=499 => Some(Self::Http4xx),
            500..=599 => Some(Self::Http5xx),
            _ => None,
        }
    }
}

/// Lifecycle transition recorded in a message timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventType {
    Created,
    Scheduled,
    Processing,
    AttemptFailed,
    RetryScheduled,
    Completed,
    Failed,
    DeadLettered,
    Cancelled,
}

impl WireEnum for TimelineEventType {
    const ALL: &'static [Self] = &[
        Self::Created,
        Self::Scheduled,
        Self::Processing,
        Self::AttemptFailed,
        Self::RetryScheduled,
        Self::Completed,
        Self::Failed,
        Self::DeadLettered,
        Self::Cancelled,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Scheduled => "scheduled",
            Self::Processing => "processing",
            Self::AttemptFailed => "attempt_failed",
            Self::RetryScheduled => "retry_scheduled",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::DeadLettered => "dead_lettered",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Overall or per-component service health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl WireEnum for HealthStatus {
    const ALL: &'static [Self] = &[Self::Healthy, Self::Degraded, Self::Unhealthy];

    fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }
}

wire_display!(
    MessageStatus,
    CallbackErrorCode,
    TimelineEventType,
    HealthStatus,
);

// ---------------------------------------------------------------------------
// CallbackErrorRecord
// ---------------------------------------------------------------------------

/// A failed delivery attempt as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Value")]
pub struct CallbackErrorRecord {
    pub id: String,
    pub message_id: MessageId,
    pub error_code: CallbackErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(serialize_with = "wire_time::serialize")]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl Schema for CallbackErrorRecord {
    fn parse_at(value: &Value, path: &str, issues: &mut Vec<SchemaIssue>) -> Option<Self> {
        let mut f = Fields::open(value, path, issues)?;
        let id = f.required("id", schema::non_empty_string);
        let message_id = f.required("messageId", schema::message_id);
        let error_code = f.required("errorCode", schema::enumeration);
        let message = f.required("message", schema::string);
        let http_status = f.optional("httpStatus", schema::unsigned);
        let created_at = f.required("createdAt", schema::timestamp);
        let attempt_number = f.optional("attemptNumber", schema::unsigned);
        let duration_ms = f.optional("durationMs", schema::unsigned);

        Some(Self {
            id: id?,
            message_id: message_id?,
            error_code: error_code?,
            message: message?,
            http_status,
            created_at: created_at?,
            attempt_number,
            duration_ms,
        })
    }
}

// ---------------------------------------------------------------------------
// MessageRecord
// ---------------------------------------------------------------------------

/// A queued message as the service reports it.
///
/// `retry_count <= max_retries` holds on the service side; the client only
/// checks shape and does not enforce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Value")]
pub struct MessageRecord {
    pub id: MessageId,
    /// Callback URL the service delivers to.
    pub url: String,
    pub payload: Map<String, Value>,
    pub headers: BTreeMap<String, String>,
    pub status: MessageStatus,
    #[serde(serialize_with = "wire_time::serialize")]
    pub created_at: DateTime<Utc>,
    #[serde(serialize_with = "wire_time::serialize")]
    pub updated_at: DateTime<Utc>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "wire_time::serialize_opt"
    )]
    pub scheduled_at: Option<DateTime<Utc>>,
    pub retry_count: u32,
    pub max_retries: u32,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "wire_time::serialize_opt"
    )]
    pub next_retry_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<CallbackErrorRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attempt_number: Option<u32>,
}

impl Schema for MessageRecord {
    fn parse_at(value: &Value, path: &str, issues: &mut Vec<SchemaIssue>) -> Option<Self> {
        let mut f = Fields::open(value, path, issues)?;
        let id = f.required("id", schema::message_id);
        let url = f.required("url", schema::absolute_url);
        let payload = f.required("payload", schema::object);
        let headers = f.required("headers", schema::string_map);
        let status = f.required("status", schema::enumeration);
        let created_at = f.required("createdAt", schema::timestamp);
        let updated_at = f.required("updatedAt", schema::timestamp);
        let scheduled_at = f.optional("scheduledAt", schema::timestamp);
        let retry_count = f.required("retryCount", schema::unsigned);
        let max_retries = f.required("maxRetries", schema::unsigned);
        let next_retry_at = f.optional("nextRetryAt", schema::timestamp);
        let last_error = f.optional_record("lastError");
        let timezone = f.optional("timezone", schema::string);
        let attempt_number = f.optional("attemptNumber", schema::unsigned);

        Some(Self {
            id: id?,
            url: url?,
            payload: payload?,
            headers: headers?,
            status: status?,
            created_at: created_at?,
            updated_at: updated_at?,
            scheduled_at,
            retry_count: retry_count?,
            max_retries: max_retries?,
            next_retry_at,
            last_error,
            timezone,
            attempt_number,
        })
    }
}

// ---------------------------------------------------------------------------
// Timeline
// ---------------------------------------------------------------------------

/// One lifecycle transition of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct TimelineEvent {
    #[serde(rename = "type")]
    pub event_type: TimelineEventType,
    #[serde(serialize_with = "wire_time::serialize")]
    pub timestamp: DateTime<Utc>,
    /// The service may send `null` here; it is kept apart from absence.
    #[serde(skip_serializing_if = "Nullable::is_absent")]
    pub details: Nullable<Map<String, Value>>,
}

impl Schema for TimelineEvent {
    fn parse_at(value: &Value, path: &str, issues: &mut Vec<SchemaIssue>) -> Option<Self> {
        let mut f = Fields::open(value, path, issues)?;
        let event_type = f.required("type", schema::enumeration);
        let timestamp = f.required("timestamp", schema::timestamp);
        let details = f.nullable("details", schema::object);

        Some(Self {
            event_type: event_type?,
            timestamp: timestamp?,
            details: details?,
        })
    }
}

/// Ordered lifecycle of one message. Order is the service's; the client
/// never re-sorts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Value")]
pub struct TimelineRecord {
    pub message_id: MessageId,
    pub event_count: u64,
    pub events: Vec<TimelineEvent>,
}

impl Schema for TimelineRecord {
    fn parse_at(value: &Value, path: &str, issues: &mut Vec<SchemaIssue>) -> Option<Self> {
        let mut f = Fields::open(value, path, issues)?;
        let message_id = f.required("messageId", schema::message_id);
        let event_count = f.required("eventCount", schema::unsigned);
        let events = f.required_list("events");

        Some(Self {
            message_id: message_id?,
            event_count: event_count?,
            events: events?,
        })
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct ComponentHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Schema for ComponentHealth {
    fn parse_at(value: &Value, path: &str, issues: &mut Vec<SchemaIssue>) -> Option<Self> {
        let mut f = Fields::open(value, path, issues)?;
        let status = f.required("status", schema::enumeration);
        let message = f.optional("message", schema::string);

        Some(Self {
            status: status?,
            message,
        })
    }
}

/// Service health report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct HealthRecord {
    pub status: HealthStatus,
    #[serde(serialize_with = "wire_time::serialize")]
    pub timestamp: DateTime<Utc>,
    /// Seconds since the service started.
    pub uptime: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<BTreeMap<String, ComponentHealth>>,
}

impl Schema for HealthRecord {
    fn parse_at(value: &Value, path: &str, issues: &mut Vec<SchemaIssue>) -> Option<Self> {
        let mut f = Fields::open(value, path, issues)?;
        let status = f.required("status", schema::enumeration);
        let timestamp = f.required("timestamp", schema::timestamp);
        let uptime = f.required("uptime", schema::non_negative_number);
        let components = f.optional_record_map("components");

        Some(Self {
            status: status?,
            timestamp: timestamp?,
            uptime: uptime?,
            components,
        })
    }
}

schema_try_from!(
    CallbackErrorRecord,
    MessageRecord,
    TimelineEvent,
    TimelineRecord,
    ComponentHealth,
    HealthRecord,
);

#[cfg(test)]
mod tests {
    use super::*;

    fn serde_spelling<E: WireEnum + Serialize>(value: E) -> String {
        match serde_json::to_value(value).unwrap() {
            Value::String(s) => s,
            other => panic!("enum serialized as {other}"),
        }
    }

    #[test]
    fn serde_spelling_matches_wire_spelling() {
        for v in MessageStatus::ALL {
            assert_eq!(serde_spelling(*v), v.as_str());
        }
        for v in CallbackErrorCode::ALL {
            assert_eq!(serde_spelling(*v), v.as_str());
        }
        for v in TimelineEventType::ALL {
            assert_eq!(serde_spelling(*v), v.as_str());
        }
        for v in HealthStatus::ALL {
            assert_eq!(serde_spelling(*v), v.as_str());
        }
    }

    #[test]
    fn enum_sets_are_closed() {
        assert_eq!(MessageStatus::ALL.len(), 5);
        assert_eq!(CallbackErrorCode::ALL.len(), 9);
        assert_eq!(TimelineEventType::ALL.len(), 9);
        assert_eq!(HealthStatus::ALL.len(), 3);
        assert!("DEAD_LETTER".parse::<MessageStatus>().is_err());
        assert!("ok".parse::<HealthStatus>().is_err());
        assert_eq!(
            "dead_letter".parse::<MessageStatus>().unwrap(),
            MessageStatus::DeadLetter
        );
    }

    #[test]
    fn error_code_from_http_status() {
        assert_eq!(
            CallbackErrorCode::from_http_status(404),
            Some(CallbackErrorCode::Http4xx)
        );
        assert_eq!(
            CallbackErrorCode::from_http_status(503),
            Some(CallbackErrorCode::Http5xx)
        );
        assert_eq!(CallbackErrorCode::from_http_status(200), None);
    }

    #[test]
    fn message_id_parses_and_displays() {
        let id: MessageId = "msg_01HZX3K9Q8M7N6P5R4S3T2V1W0".parse().unwrap();
        assert_eq!(id.to_string(), "msg_01HZX3K9Q8M7N6P5R4S3T2V1W0");
        assert!("msg_".parse::<MessageId>().is_err());
    }
}
