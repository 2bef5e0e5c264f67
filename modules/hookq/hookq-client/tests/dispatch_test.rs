use std::sync::Arc;
use std::time::Duration;

use hookq_client::hookq_sdk::{MessageStatus, TimelineEventType};
use hookq_client::testing::MockTransport;
use hookq_client::{
    ClientError, ErrorKind, HookqClient, HookqClientConfig, HttpResponse, ListMessagesQuery,
    Method, PublishOptions, StatusCode,
};
use http::HeaderValue;
use http::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use serde_json::{Map, Value, json};

const MSG_ID: &str = "msg_01HZX3K9Q8M7N6P5R4S3T2V1W0";
const BASE_URL: &str = "https://hookq.test/v1";

fn client_with(mock: &Arc<MockTransport>) -> HookqClient {
    let config = HookqClientConfig::new(BASE_URL, "test-token");
    HookqClient::with_transport(config, mock.clone()).unwrap()
}

fn message_json() -> Value {
    json!({
        "id": MSG_ID,
        "url": "https://example.com/hook",
        "payload": {"order": 42},
        "headers": {},
        "status": "completed",
        "createdAt": "2024-01-15T10:30:00Z",
        "updatedAt": "2024-01-15T10:30:02.500Z",
        "retryCount": 0,
        "maxRetries": 3
    })
}

#[tokio::test]
async fn test_status_precedence() {
    let cases = [
        (401, ErrorKind::Authentication),
        (403, ErrorKind::Authorization),
        (404, ErrorKind::NotFound),
        (429, ErrorKind::RateLimit),
        (500, ErrorKind::Server),
        (600, ErrorKind::Server),
        (799, ErrorKind::Server),
        (400, ErrorKind::Api),
    ];

    for (status, kind) in cases {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(
            StatusCode::from_u16(status).unwrap(),
            &json!({"message": "nope"}),
        );

        let err = client_with(&mock).get_message(MSG_ID).await.unwrap_err();
        assert_eq!(err.kind(), kind, "status {status}");
        assert_eq!(err.http_status().map(|s| s.as_u16()), Some(status));
        assert!(err.is_api_error());
        assert_eq!(mock.call_count(), 1);
    }
}

#[tokio::test]
async fn test_rate_limit_retry_after() {
    let mock = Arc::new(MockTransport::new());
    mock.push_response(
        HttpResponse::new(StatusCode::TOO_MANY_REQUESTS)
            .with_header(RETRY_AFTER, HeaderValue::from_static("60")),
    );
    mock.push_response(HttpResponse::new(StatusCode::TOO_MANY_REQUESTS));
    let client = client_with(&mock);

    let err = client.get_health().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::RateLimit {
            retry_after: Some(60),
            ..
        }
    ));

    let err = client.get_health().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::RateLimit {
            retry_after: None,
            ..
        }
    ));
}

#[tokio::test]
async fn test_server_error_keeps_status_and_body() {
    let mock = Arc::new(MockTransport::new());
    let unavailable = HttpResponse::new(StatusCode::SERVICE_UNAVAILABLE);
    mock.push_response(unavailable.with_body("queue paused"));

    let err = client_with(&mock).get_debug_stats().await.unwrap_err();
    match err {
        ClientError::Server { status, message } => {
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert!(message.contains("queue paused"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_transport_failure_is_network_error() {
    let mock = Arc::new(MockTransport::new());
    mock.push_error(std::io::Error::new(
        std::io::ErrorKind::ConnectionReset,
        "connection reset by peer",
    ));

    let err = client_with(&mock).get_health_ready().await.unwrap_err();
    let ClientError::Network { source, .. } = &err else {
        panic!("expected network error, got {err:?}");
    };
    let io = source.downcast_ref::<std::io::Error>().unwrap();
    assert_eq!(io.kind(), std::io::ErrorKind::ConnectionReset);
    assert!(!err.is_api_error());
}

#[tokio::test]
async fn test_classified_transport_error_passes_through() {
    let mock = Arc::new(MockTransport::new());
    mock.push_error(ClientError::Authorization {
        message: "blocked by proxy".into(),
    });

    let err = client_with(&mock).get_error_stats().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let mock = Arc::new(MockTransport::new());
    mock.push_delayed(Duration::from_secs(5), HttpResponse::new(StatusCode::OK));

    let config = HookqClientConfig::new(BASE_URL, "test-token");
    let config = config.with_timeout_ms(50);
    let client = HookqClient::with_transport(config, mock.clone()).unwrap();

    let err = client.get_debug_messages().await.unwrap_err();
    let ClientError::Network { source, .. } = &err else {
        panic!("expected network error, got {err:?}");
    };
    assert!(source.is::<tokio::time::error::Elapsed>());
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_empty_path_params_make_no_calls() {
    let mock = Arc::new(MockTransport::new());
    let client = client_with(&mock);

    let results = [
        client.get_message("").await.map(|_| ()),
        client.retry_message("").await.map(|_| ()),
        client.get_errors_by_code("").await.map(|_| ()),
        client.cancel_message("").await.map(|_| ()),
        client.get_message_timeline("").await.map(|_| ()),
        client.get_message_errors("").await.map(|_| ()),
        client.publish("", &Map::new(), None).await.map(|_| ()),
    ];

    for result in results {
        assert!(matches!(result, Err(ClientError::Validation { .. })));
    }
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_every_call_is_authenticated() {
    let mock = Arc::new(MockTransport::new());
    mock.push_json(StatusCode::OK, &json!({}));
    mock.push_json(StatusCode::CREATED, &json!({"messageId": MSG_ID}));
    let client = client_with(&mock);

    client.get_health_ready().await.unwrap();
    let mut payload = Map::new();
    payload.insert("a".into(), json!(1));
    client
        .publish("https://example.com/hook", &payload, None)
        .await
        .unwrap();

    let requests = mock.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(
            request.headers.get(AUTHORIZATION).unwrap(),
            "Bearer test-token"
        );
    }

    let get = &requests[0];
    assert_eq!(get.method, Method::GET);
    assert!(get.body.is_none());
    assert!(get.headers.get(CONTENT_TYPE).is_none());

    let post = &requests[1];
    assert_eq!(post.method, Method::POST);
    assert_eq!(post.headers.get(CONTENT_TYPE).unwrap(), "application/json");
    let body = post.body.as_ref().unwrap();
    let sent: Value = serde_json::from_slice(body).unwrap();
    assert_eq!(sent, json!({"a": 1}));
}

#[tokio::test]
async fn test_urls_keep_base_path_and_encode_ids() {
    let mock = Arc::new(MockTransport::new());
    for _ in 0..4 {
        mock.push_json(StatusCode::OK, &json!({}));
    }
    let client = client_with(&mock);

    client.retry_message("msg/../x").await.unwrap();
    client.get_errors_by_code("HTTP_5XX").await.unwrap();
    client.cancel_message(MSG_ID).await.unwrap();
    client
        .publish(
            "https://example.com/a b",
            &Map::new(),
            Some(&PublishOptions::new().method("GET").delay("5m")),
        )
        .await
        .unwrap();

    let requests = mock.requests();
    assert_eq!(requests[0].method, Method::POST);
    assert_eq!(requests[0].url.path(), "/v1/messages/msg%2F..%2Fx/retry");
    assert_eq!(requests[1].url.path(), "/v1/errors/by-code/HTTP_5XX");
    assert_eq!(requests[2].method, Method::DELETE);
    assert_eq!(requests[2].url.path(), format!("/v1/messages/{MSG_ID}"));
    assert_eq!(
        requests[3].url.path(),
        "/v1/publish/https%3A%2F%2Fexample.com%2Fa%20b"
    );
    let query: Vec<(String, String)> = requests[3].url.query_pairs().into_owned().collect();
    assert!(query.contains(&("Queue-Delay".to_owned(), "5m".to_owned())));
    assert!(requests[3].body.is_none());
}

#[tokio::test]
async fn test_list_messages_query() {
    let mock = Arc::new(MockTransport::new());
    mock.push_json(StatusCode::OK, &json!({"messages": [], "total": 0}));
    mock.push_json(StatusCode::OK, &json!({"messages": [], "total": 0}));
    let client = client_with(&mock);

    client
        .list_messages(&ListMessagesQuery::default())
        .await
        .unwrap();
    let filtered = ListMessagesQuery::default()
        .limit(10)
        .offset(20)
        .status(MessageStatus::DeadLetter);
    client.list_messages(&filtered).await.unwrap();

    let requests = mock.requests();
    assert_eq!(requests[0].url.query(), Some("limit=50&offset=0"));
    assert_eq!(
        requests[1].url.query(),
        Some("limit=10&offset=20&status=dead_letter")
    );
}

#[tokio::test]
async fn test_payload_is_raw_until_validated() {
    let mock = Arc::new(MockTransport::new());
    let mut broken = message_json();
    broken["status"] = json!("archived");
    mock.push_json(StatusCode::OK, &message_json());
    mock.push_json(StatusCode::OK, &broken);
    let client = client_with(&mock);

    let message = client
        .get_message(MSG_ID)
        .await
        .unwrap()
        .validate()
        .unwrap();
    assert_eq!(message.status, MessageStatus::Completed);

    let payload = client.get_message(MSG_ID).await.unwrap();
    assert_eq!(payload.raw()["status"], "archived");
    assert!(payload.validate().unwrap_err().has_issue_at("status"));
}

#[tokio::test]
async fn test_timeline_validation() {
    let mock = Arc::new(MockTransport::new());
    mock.push_json(
        StatusCode::OK,
        &json!({
            "messageId": MSG_ID,
            "eventCount": 2,
            "events": [
                {"type": "created", "timestamp": "2024-01-15T10:30:00Z"},
                {"type": "completed", "timestamp": "2024-01-15T10:30:02Z", "details": {"httpStatus": 200}}
            ]
        }),
    );

    let timeline = client_with(&mock)
        .get_message_timeline(MSG_ID)
        .await
        .unwrap()
        .into_validated()
        .unwrap();
    assert_eq!(timeline.events[1].event_type, TimelineEventType::Completed);
}

#[tokio::test]
async fn test_empty_success_body_is_null() {
    let mock = Arc::new(MockTransport::new());
    mock.push_response(HttpResponse::new(StatusCode::NO_CONTENT));

    let payload = client_with(&mock).cancel_message(MSG_ID).await.unwrap();
    assert_eq!(payload.raw(), &Value::Null);
}

#[tokio::test]
async fn test_non_json_success_body_is_network_error() {
    let mock = Arc::new(MockTransport::new());
    let html = HttpResponse::new(StatusCode::OK).with_body("<html>");
    mock.push_response(html);

    let err = client_with(&mock).get_health().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}

#[tokio::test]
async fn test_concurrent_calls_are_independent() {
    let mock = Arc::new(MockTransport::new());
    for _ in 0..8 {
        mock.push_json(StatusCode::OK, &json!({"ok": true}));
    }
    let client = Arc::new(client_with(&mock));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.get_debug_stats().await })
        })
        .collect();

    for handle in handles {
        let payload = handle.await.unwrap().unwrap();
        assert_eq!(payload.raw()["ok"], true);
    }
    assert_eq!(mock.call_count(), 8);
}

#[test]
fn test_construction_rejects_missing_credentials() {
    let mock = Arc::new(MockTransport::new());
    for config in [
        HookqClientConfig::new("", "token"),
        HookqClientConfig::new(BASE_URL, ""),
    ] {
        let result = HookqClient::with_transport(config, mock.clone());
        assert!(matches!(result, Err(ClientError::Validation { .. })));
    }
}
