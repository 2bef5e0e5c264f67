//! In-memory [`Transport`] for tests.
//!
//! ```
//! use std::sync::Arc;
//! use hookq_client::{HookqClient, HookqClientConfig, StatusCode};
//! use hookq_client::testing::MockTransport;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let mock = Arc::new(MockTransport::new());
//! mock.push_json(StatusCode::OK, &json!({"status": "queued"}));
//!
//! let config = HookqClientConfig::new("https://hookq.test", "token");
//! let client = HookqClient::with_transport(config, mock.clone()).unwrap();
//! let payload = client.retry_message("msg_01HZX3K9Q8M7N6P5R4S3T2V1W0").await.unwrap();
//!
//! assert_eq!(payload.raw()["status"], "queued");
//! assert_eq!(mock.call_count(), 1);
//! # });
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;
use parking_lot::Mutex;
use serde_json::Value;

use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};

enum Reply {
    Response(HttpResponse),
    Delayed(Duration, HttpResponse),
    Error(TransportError),
}

/// Replays scripted replies in FIFO order and records every request.
///
/// When the script runs out, `send` fails with a plain transport error.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: HttpResponse) {
        self.replies.lock().push_back(Reply::Response(response));
    }

    pub fn push_json(&self, status: StatusCode, body: &Value) {
        self.push_response(HttpResponse::json(status, body));
    }

    /// Replies only after `delay`, for exercising timeouts.
    pub fn push_delayed(&self, delay: Duration, response: HttpResponse) {
        self.replies.lock().push_back(Reply::Delayed(delay, response));
    }

    pub fn push_error(&self, error: impl Into<TransportError>) {
        self.replies.lock().push_back(Reply::Error(error.into()));
    }

    /// Number of requests that reached the transport.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    #[must_use]
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().push(request);
        let reply = self.replies.lock().pop_front();

        match reply {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Delayed(delay, response)) => {
                tokio::time::sleep(delay).await;
                Ok(response)
            }
            Some(Reply::Error(error)) => Err(error),
            None => Err("no scripted reply left in MockTransport".into()),
        }
    }
}
