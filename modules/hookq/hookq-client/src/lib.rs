//! hookq client
//!
//! Async client for the hookq message queue and webhook delivery API.
//!
//! Every call returns a [`Payload`] holding the raw JSON body. Validation
//! against the wire schema is a second, explicit step.
//!
//! # Examples
//!
//! ```no_run
//! use hookq_client::{HookqClient, HookqClientConfig, PublishOptions};
//! use serde_json::{Map, json};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HookqClientConfig::from_env()?;
//! let client = HookqClient::new(config)?;
//!
//! let mut payload = Map::new();
//! payload.insert("order".into(), json!(42));
//! let options = PublishOptions::new().delay("5m").header("X-Tenant", "acme");
//! let published = client
//!     .publish("https://example.com/hooks/orders", &payload, Some(&options))
//!     .await?;
//! println!("queued: {}", published.raw());
//!
//! let message = client
//!     .get_message("msg_01HZX3K9Q8M7N6P5R4S3T2V1W0")
//!     .await?
//!     .validate()?;
//! println!("status: {}", message.status);
//! # Ok(())
//! # }
//! ```
//!
//! Errors are a closed set; branch on the variant rather than the message:
//!
//! ```no_run
//! use hookq_client::{ClientError, HookqClient};
//!
//! # async fn example(client: &HookqClient) {
//! match client.get_health().await {
//!     Ok(health) => println!("{}", health.raw()),
//!     Err(ClientError::RateLimit { retry_after, .. }) => {
//!         println!("retry in {retry_after:?} s");
//!     }
//!     Err(err) if err.is_api_error() => println!("API refused: {err}"),
//!     Err(err) => println!("transport failure: {err}"),
//! }
//! # }
//! ```

mod body;
mod client;
mod config;
mod dispatch;
mod error;
mod publish;
mod request;
mod response;
mod transport;

#[cfg(feature = "test-utils")]
pub mod testing;

// Re-export public API
pub use body::Body;
pub use client::{DEFAULT_LIST_LIMIT, HookqClient, ListMessagesQuery};
pub use config::{
    DEFAULT_TIMEOUT_MS, ENV_API_TOKEN, ENV_API_URL, ENV_TIMEOUT_MS, HookqClientConfig,
};
pub use dispatch::error_for_status;
pub use error::{BoxError, ClientError, ErrorKind};
pub use publish::{
    PublishOptions, QUEUE_DELAY, QUEUE_FORWARD_PREFIX, QUEUE_METHOD, QUEUE_NOT_BEFORE,
    QUEUE_TIMEZONE, build_publish_request,
};
pub use request::{Request, RequestBuilder, path_segment};
pub use response::Payload;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};

// Re-export commonly used types from dependencies
pub use hookq_sdk;
pub use http::{Method, StatusCode};
