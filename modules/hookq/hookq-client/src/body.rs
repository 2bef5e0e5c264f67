use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::error::ClientError;

/// Request body. The hookq API only ever exchanges JSON documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Json(Value),
}

impl Body {
    #[must_use]
    pub fn empty() -> Self {
        Body::Empty
    }

    /// Create a body from a JSON-serializable value.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] if `value` cannot be represented as JSON.
    pub fn from_json<T: Serialize + ?Sized>(value: &T) -> Result<Self, ClientError> {
        serde_json::to_value(value)
            .map(Body::Json)
            .map_err(|e| ClientError::validation(format!("body is not valid JSON: {e}")))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(value) => Some(value),
            Body::Empty => None,
        }
    }

    /// Encoded wire bytes, `None` for an empty body.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Option<Bytes>, ClientError> {
        match self {
            Body::Empty => Ok(None),
            Body::Json(value) => serde_json::to_vec(value)
                .map(|encoded| Some(Bytes::from(encoded)))
                .map_err(|e| ClientError::validation(format!("failed to encode body: {e}"))),
        }
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        Body::Json(value)
    }
}
