use std::fmt;

use hookq_sdk::SchemaError;
use http::StatusCode;
use serde_json::{Value, json};
use thiserror::Error;

/// Boxed error used for transport failures and network error sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Coarse classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authentication,
    Authorization,
    NotFound,
    RateLimit,
    Server,
    Api,
    Network,
}

impl ErrorKind {
    /// Stable machine-readable code.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::Authentication => "AUTHENTICATION_ERROR",
            ErrorKind::Authorization => "AUTHORIZATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::RateLimit => "RATE_LIMIT_EXCEEDED",
            ErrorKind::Server => "SERVER_ERROR",
            ErrorKind::Api => "API_ERROR",
            ErrorKind::Network => "NETWORK_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Every failure a hookq API call can produce.
///
/// All variants except [`ClientError::Network`] belong to the API error
/// family, see [`ClientError::is_api_error`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// A client-side precondition failed before anything was sent.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    #[error("Authorization failed: {message}")]
    Authorization { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    /// HTTP 429. `retry_after` holds the `Retry-After` header in seconds
    /// when the server sent an integer value.
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<u64>,
    },

    #[error("Server error (HTTP {status}): {message}")]
    Server { status: StatusCode, message: String },

    /// Any other non-2xx status.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        status: StatusCode,
        message: String,
        body: String,
    },

    /// The request never produced an HTTP response.
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: BoxError,
    },
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: Value) -> Self {
        ClientError::Validation {
            message: message.into(),
            details: Some(details),
        }
    }

    /// Wraps an underlying transport failure.
    pub fn network(source: impl Into<BoxError>) -> Self {
        let source = source.into();
        ClientError::Network {
            message: source.to_string(),
            source,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Validation { .. } => ErrorKind::Validation,
            ClientError::Authentication { .. } => ErrorKind::Authentication,
            ClientError::Authorization { .. } => ErrorKind::Authorization,
            ClientError::NotFound { .. } => ErrorKind::NotFound,
            ClientError::RateLimit { .. } => ErrorKind::RateLimit,
            ClientError::Server { .. } => ErrorKind::Server,
            ClientError::Api { .. } => ErrorKind::Api,
            ClientError::Network { .. } => ErrorKind::Network,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// HTTP status associated with the failure, if one was received.
    #[must_use]
    pub fn http_status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Authentication { .. } => Some(StatusCode::UNAUTHORIZED),
            ClientError::Authorization { .. } => Some(StatusCode::FORBIDDEN),
            ClientError::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            ClientError::RateLimit { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            ClientError::Server { status, .. } | ClientError::Api { status, .. } => Some(*status),
            ClientError::Validation { .. } | ClientError::Network { .. } => None,
        }
    }

    /// False only for transport failures, which never reached the API.
    #[must_use]
    pub fn is_api_error(&self) -> bool {
        !matches!(self, ClientError::Network { .. })
    }

    #[must_use]
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ClientError::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        match self {
            ClientError::Validation { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}

impl From<SchemaError> for ClientError {
    fn from(err: SchemaError) -> Self {
        let details = err
            .issues()
            .iter()
            .map(|issue| json!({"path": issue.path, "reason": issue.reason}))
            .collect::<Vec<_>>();
        ClientError::validation_with_details(err.to_string(), Value::Array(details))
    }
}
