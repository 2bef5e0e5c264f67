//! hookq SDK
//!
//! Wire-level types for the hookq message queue and webhook delivery
//! service, together with the schema layer that turns untyped JSON into
//! those types.
//!
//! ```
//! use hookq_sdk::{MessageStatus, MessageRecord, Schema};
//! use serde_json::json;
//!
//! let record = MessageRecord::validate(&json!({
//!     "id": "msg_01HZX3K9Q8M7N6P5R4S3T2V1W0",
//!     "url": "https://example.com/hook",
//!     "payload": {"order": 42},
//!     "headers": {},
//!     "status": "pending",
//!     "createdAt": "2024-01-15T10:30:00Z",
//!     "updatedAt": "2024-01-15T10:30:00.250Z",
//!     "retryCount": 0,
//!     "maxRetries": 5
//! }))
//! .unwrap();
//! assert_eq!(record.status, MessageStatus::Pending);
//! ```

pub mod models;
pub mod schema;
mod webhook_error;

pub use models::{
    CallbackErrorCode, CallbackErrorRecord, ComponentHealth, HealthRecord, HealthStatus,
    MessageId, MessageRecord, MessageStatus, TimelineEvent, TimelineEventType, TimelineRecord,
};
pub use schema::{
    MESSAGE_ID_PREFIX, Nullable, Schema, SchemaError, SchemaIssue, WireEnum, format_timestamp,
    is_valid_message_id, parse_timestamp,
};
pub use webhook_error::WebhookError;
