use std::sync::Arc;
use std::time::Duration;

use hookq_sdk::{HealthRecord, MessageRecord, MessageStatus, TimelineRecord, WireEnum};
use http::Method;
use serde_json::{Map, Value};
use url::Url;

use crate::config::HookqClientConfig;
use crate::dispatch::Dispatcher;
use crate::error::ClientError;
use crate::publish::{PublishOptions, build_publish_request};
use crate::request::{Request, path_segment};
use crate::response::Payload;
use crate::transport::{ReqwestTransport, Transport};

pub const DEFAULT_LIST_LIMIT: u32 = 50;

/// Paging and filtering for [`HookqClient::list_messages`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMessagesQuery {
    pub limit: u32,
    pub offset: u32,
    pub status: Option<MessageStatus>,
}

impl Default for ListMessagesQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
            status: None,
        }
    }
}

impl ListMessagesQuery {
    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    #[must_use]
    pub fn status(mut self, status: MessageStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Typed client for the hookq API.
///
/// Every method issues exactly one HTTP request and never retries. The
/// client holds only immutable configuration and can be shared across tasks
/// behind an `Arc` or by reference.
pub struct HookqClient {
    dispatcher: Dispatcher,
}

impl HookqClient {
    /// Create a client that talks HTTP through `reqwest`.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] if the base URL or token is empty
    /// or the base URL does not parse.
    pub fn new(config: HookqClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let transport = ReqwestTransport::new()?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client with an injected transport.
    ///
    /// # Errors
    /// Same as [`HookqClient::new`].
    pub fn with_transport(
        config: HookqClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        let base_url = Url::parse(config.base_url.trim()).map_err(|e| {
            ClientError::validation(format!("invalid API base URL `{}`: {e}", config.base_url))
        })?;

        Ok(Self {
            dispatcher: Dispatcher::new(base_url, config.token, config.timeout, transport),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        self.dispatcher.base_url()
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.dispatcher.timeout()
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Queue `payload` for delivery to the callback `url`.
    ///
    /// # Errors
    /// [`ClientError::Validation`] for an empty URL or invalid method, otherwise
    /// whatever the call produces.
    pub async fn publish(
        &self,
        url: &str,
        payload: &Map<String, Value>,
        options: Option<&PublishOptions>,
    ) -> Result<Payload, ClientError> {
        let request = build_publish_request(url, payload, options)?;
        self.call(request).await
    }

    /// # Errors
    /// [`ClientError::Validation`] for an empty id, [`ClientError::NotFound`]
    /// for an unknown one.
    pub async fn get_message(&self, id: &str) -> Result<Payload<MessageRecord>, ClientError> {
        let id = require("message id", id)?;
        self.get(format!("/messages/{}", path_segment(id))).await
    }

    /// # Errors
    /// Any failure of the underlying call.
    pub async fn list_messages(&self, query: &ListMessagesQuery) -> Result<Payload, ClientError> {
        let mut builder = Request::builder()
            .method(Method::GET)
            .path("/messages")
            .query("limit", query.limit.to_string())
            .query("offset", query.offset.to_string());
        if let Some(status) = query.status {
            builder = builder.query("status", status.as_str());
        }
        self.call(builder.build()?).await
    }

    /// Delivery history of one message, in the order the server reports it.
    ///
    /// # Errors
    /// [`ClientError::Validation`] for an empty id, otherwise any failure of
    /// the underlying call.
    pub async fn get_message_timeline(
        &self,
        id: &str,
    ) -> Result<Payload<TimelineRecord>, ClientError> {
        let id = require("message id", id)?;
        self.get(format!("/messages/{}/timeline", path_segment(id)))
            .await
    }

    /// # Errors
    /// [`ClientError::Validation`] for an empty id, otherwise any failure of
    /// the underlying call.
    pub async fn retry_message(&self, id: &str) -> Result<Payload, ClientError> {
        let id = require("message id", id)?;
        let path = format!("/messages/{}/retry", path_segment(id));
        self.send(Method::POST, path).await
    }

    /// # Errors
    /// [`ClientError::Validation`] for an empty id, otherwise any failure of
    /// the underlying call.
    pub async fn cancel_message(&self, id: &str) -> Result<Payload, ClientError> {
        let id = require("message id", id)?;
        self.send(Method::DELETE, format!("/messages/{}", path_segment(id)))
            .await
    }

    // ------------------------------------------------------------------
    // Health
    // ------------------------------------------------------------------

    /// # Errors
    /// Any failure of the underlying call.
    pub async fn get_health(&self) -> Result<Payload<HealthRecord>, ClientError> {
        self.get("/health".to_owned()).await
    }

    /// # Errors
    /// Any failure of the underlying call.
    pub async fn get_health_ready(&self) -> Result<Payload, ClientError> {
        self.get("/health/ready".to_owned()).await
    }

    // ------------------------------------------------------------------
    // Debug
    // ------------------------------------------------------------------

    /// # Errors
    /// Any failure of the underlying call.
    pub async fn get_debug_messages(&self) -> Result<Payload, ClientError> {
        self.get("/debug/messages".to_owned()).await
    }

    /// # Errors
    /// Any failure of the underlying call.
    pub async fn get_debug_stats(&self) -> Result<Payload, ClientError> {
        self.get("/debug/stats".to_owned()).await
    }

    // ------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------

    /// # Errors
    /// Any failure of the underlying call.
    pub async fn get_error_stats(&self) -> Result<Payload, ClientError> {
        self.get("/errors/stats".to_owned()).await
    }

    /// # Errors
    /// Any failure of the underlying call.
    pub async fn get_dead_letter_errors(&self) -> Result<Payload, ClientError> {
        self.get("/errors/deadletter".to_owned()).await
    }

    /// Error records for one callback error code, e.g. `TIMEOUT`.
    ///
    /// # Errors
    /// [`ClientError::Validation`] for an empty code, otherwise any failure of
    /// the underlying call.
    pub async fn get_errors_by_code(&self, code: &str) -> Result<Payload, ClientError> {
        let code = require("error code", code)?;
        self.get(format!("/errors/by-code/{}", path_segment(code)))
            .await
    }

    /// # Errors
    /// [`ClientError::Validation`] for an empty id, otherwise any failure of
    /// the underlying call.
    pub async fn get_message_errors(&self, id: &str) -> Result<Payload, ClientError> {
        let id = require("message id", id)?;
        self.get(format!("/errors/message/{}", path_segment(id)))
            .await
    }

    // ------------------------------------------------------------------

    async fn get<T>(&self, path: String) -> Result<Payload<T>, ClientError> {
        self.send(Method::GET, path).await
    }

    async fn send<T>(&self, method: Method, path: String) -> Result<Payload<T>, ClientError> {
        let request = Request::builder().method(method).path(path).build()?;
        self.call(request).await
    }

    async fn call<T>(&self, request: Request) -> Result<Payload<T>, ClientError> {
        self.dispatcher.execute(request).await.map(Payload::new)
    }
}

fn require<'a>(name: &str, value: &'a str) -> Result<&'a str, ClientError> {
    if value.is_empty() {
        Err(ClientError::validation(format!("{name} is required")))
    } else {
        Ok(value)
    }
}
