//! Functional tests for credential rotation against a mock upstream

use gen_gallery_gateway::config::{Settings, UpstreamConfig};
use gen_gallery_gateway::upstream::types::GenerateContentRequest;
use gen_gallery_gateway::upstream::Dispatcher;
use gen_gallery_gateway::AppError;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash-image-preview:generateContent";

fn upstream_config(server: &MockServer, keys: &[&str]) -> UpstreamConfig {
    let mut config = Settings::default().upstream;
    config.base_url = format!("{}/v1beta", server.uri());
    config.api_keys = keys.iter().map(|k| k.to_string()).collect();
    config.timeout_secs = 5;
    config
}

fn payload() -> GenerateContentRequest {
    GenerateContentRequest::image_generation("a lighthouse at dusk", &[])
}

fn success_body() -> Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [
                    { "inlineData": { "mimeType": "image/png", "data": "iVBORw0KGgo=" } },
                    { "text": "Here is your lighthouse" }
                ]
            }
        }]
    })
}

fn invalid_key_body() -> Value {
    json!({
        "error": {
            "code": 400,
            "message": "API key not valid. Please pass a valid API key.",
            "status": "INVALID_ARGUMENT",
            "details": [{
                "@type": "type.googleapis.com/google.rpc.ErrorInfo",
                "reason": "API_KEY_INVALID",
                "domain": "googleapis.com"
            }]
        }
    })
}

async fn mount_key(server: &MockServer, key: &str, response: ResponseTemplate, expected: u64) {
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(query_param("key", key))
        .respond_with(response)
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_invalid_key_removed_and_next_key_succeeds() {
    let server = MockServer::start().await;
    mount_key(&server, "k1", ResponseTemplate::new(400).set_body_json(invalid_key_body()), 1).await;
    mount_key(&server, "k2", ResponseTemplate::new(200).set_body_json(success_body()), 2).await;

    let dispatcher = Dispatcher::new(&upstream_config(&server, &["k1", "k2"])).unwrap();

    let response = dispatcher.send(&payload()).await.unwrap();
    let output = response.into_output().unwrap();
    assert_eq!(output.images.len(), 1);
    assert_eq!(output.text, "Here is your lighthouse");
    assert_eq!(dispatcher.pool().keys(), vec!["k2"]);

    // k1 is never attempted again
    dispatcher.send(&payload()).await.unwrap();
    assert_eq!(dispatcher.pool().keys(), vec!["k2"]);
}

#[tokio::test]
async fn test_leading_invalid_keys_are_all_removed() {
    let server = MockServer::start().await;
    mount_key(&server, "a", ResponseTemplate::new(400).set_body_json(invalid_key_body()), 1).await;
    mount_key(&server, "b", ResponseTemplate::new(403).set_body_json(invalid_key_body()), 1).await;
    mount_key(&server, "c", ResponseTemplate::new(200).set_body_json(success_body()), 1).await;
    mount_key(&server, "d", ResponseTemplate::new(200).set_body_json(success_body()), 0).await;

    let dispatcher = Dispatcher::new(&upstream_config(&server, &["a", "b", "c", "d"])).unwrap();

    assert!(dispatcher.send(&payload()).await.is_ok());
    assert_eq!(dispatcher.pool().keys(), vec!["c", "d"]);
}

#[tokio::test]
async fn test_non_invalidating_failures_exhaust_without_shrinking_pool() {
    let server = MockServer::start().await;
    mount_key(&server, "a", ResponseTemplate::new(500).set_body_string("internal"), 1).await;
    mount_key(&server, "b", ResponseTemplate::new(429).set_body_json(json!({
        "error": { "code": 429, "details": [{ "reason": "RATE_LIMIT_EXCEEDED" }] }
    })), 1).await;
    mount_key(&server, "c", ResponseTemplate::new(200).set_body_string("not json"), 1).await;

    let dispatcher = Dispatcher::new(&upstream_config(&server, &["a", "b", "c"])).unwrap();

    match dispatcher.send(&payload()).await {
        Err(AppError::AllCredentialsExhausted { attempts, last_error }) => {
            assert_eq!(attempts, 3);
            assert!(last_error.contains("malformed"));
        }
        other => panic!("expected AllCredentialsExhausted, got {:?}", other.map(|_| ())),
    }
    assert_eq!(dispatcher.pool().len(), 3);
}

#[tokio::test]
async fn test_blocked_success_body_returns_without_rotating() {
    let server = MockServer::start().await;
    let blocked = json!({ "candidates": [{ "finishReason": "PROHIBITED_CONTENT" }] });
    mount_key(&server, "a", ResponseTemplate::new(200).set_body_json(blocked.clone()), 1).await;
    mount_key(&server, "b", ResponseTemplate::new(200).set_body_json(blocked.clone()), 0).await;
    mount_key(&server, "c", ResponseTemplate::new(200).set_body_json(blocked), 0).await;

    let dispatcher = Dispatcher::new(&upstream_config(&server, &["a", "b", "c"])).unwrap();

    let response = dispatcher.send(&payload()).await.unwrap();
    let output = response.into_output().unwrap();
    assert!(output.images.is_empty());
    assert_eq!(output.finish_reason.as_deref(), Some("PROHIBITED_CONTENT"));
    assert_eq!(dispatcher.pool().len(), 3);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cursor_advances_across_calls() {
    let server = MockServer::start().await;
    mount_key(&server, "A", ResponseTemplate::new(200).set_body_json(success_body()), 1).await;
    mount_key(&server, "B", ResponseTemplate::new(200).set_body_json(success_body()), 1).await;
    mount_key(&server, "C", ResponseTemplate::new(200).set_body_json(success_body()), 0).await;

    let dispatcher = Dispatcher::new(&upstream_config(&server, &["A", "B", "C"])).unwrap();

    dispatcher.send(&payload()).await.unwrap();
    dispatcher.send(&payload()).await.unwrap();
}

#[tokio::test]
async fn test_failed_call_still_advances_cursor() {
    let server = MockServer::start().await;
    mount_key(&server, "A", ResponseTemplate::new(500), 1).await;
    mount_key(&server, "B", ResponseTemplate::new(200).set_body_json(success_body()), 1).await;
    mount_key(&server, "C", ResponseTemplate::new(200).set_body_json(success_body()), 1).await;

    let dispatcher = Dispatcher::new(&upstream_config(&server, &["A", "B", "C"])).unwrap();

    // A fails, B succeeds; the next call starts at C
    dispatcher.send(&payload()).await.unwrap();
    dispatcher.send(&payload()).await.unwrap();
}

#[tokio::test]
async fn test_timeout_rotates_to_next_key() {
    let server = MockServer::start().await;
    mount_key(
        &server,
        "slow",
        ResponseTemplate::new(200)
            .set_body_json(success_body())
            .set_delay(Duration::from_secs(3)),
        1,
    )
    .await;
    mount_key(&server, "fast", ResponseTemplate::new(200).set_body_json(success_body()), 1).await;

    let mut config = upstream_config(&server, &["slow", "fast"]);
    config.timeout_secs = 1;
    let dispatcher = Dispatcher::new(&config).unwrap();

    assert!(dispatcher.send(&payload()).await.is_ok());
    assert_eq!(dispatcher.pool().len(), 2);
}

#[tokio::test]
async fn test_every_key_invalid_empties_pool() {
    let server = MockServer::start().await;
    mount_key(&server, "x", ResponseTemplate::new(400).set_body_json(invalid_key_body()), 1).await;
    mount_key(&server, "y", ResponseTemplate::new(400).set_body_json(invalid_key_body()), 1).await;

    let dispatcher = Dispatcher::new(&upstream_config(&server, &["x", "y"])).unwrap();

    assert!(matches!(
        dispatcher.send(&payload()).await,
        Err(AppError::AllCredentialsExhausted { attempts: 2, .. })
    ));
    assert!(dispatcher.pool().is_empty());

    // no capacity left, and no further network attempts
    assert!(matches!(
        dispatcher.send(&payload()).await,
        Err(AppError::AllCredentialsExhausted { attempts: 0, .. })
    ));
}

#[tokio::test]
async fn test_bearer_token_sent_with_keyed_calls() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .and(query_param("key", "k"))
        .and(header("authorization", "Bearer secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = upstream_config(&server, &["k"]);
    config.bearer_token = Some("secret-token".to_string());
    let dispatcher = Dispatcher::new(&config).unwrap();

    assert!(dispatcher.send(&payload()).await.is_ok());
}

#[tokio::test]
async fn test_fallback_url_used_without_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/proxy/generate"))
        .and(header("authorization", "Bearer proxy-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success_body()))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = upstream_config(&server, &[]);
    config.api_url = Some(format!("{}/proxy/generate", server.uri()));
    config.bearer_token = Some("proxy-token".to_string());
    let dispatcher = Dispatcher::new(&config).unwrap();

    assert!(dispatcher.send(&payload()).await.is_ok());
}

#[tokio::test]
async fn test_fallback_failure_is_upstream_call_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/proxy/generate"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = upstream_config(&server, &[]);
    config.api_url = Some(format!("{}/proxy/generate", server.uri()));
    let dispatcher = Dispatcher::new(&config).unwrap();

    match dispatcher.send(&payload()).await {
        Err(AppError::UpstreamCallFailed(reason)) => assert!(reason.contains("502")),
        other => panic!("expected UpstreamCallFailed, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_no_credentials_and_no_fallback() {
    let server = MockServer::start().await;
    let dispatcher = Dispatcher::new(&upstream_config(&server, &[])).unwrap();

    assert!(matches!(
        dispatcher.send(&payload()).await,
        Err(AppError::NoCredentialsConfigured)
    ));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_concurrent_calls_share_invalidation() {
    let server = MockServer::start().await;
    for key in ["bad1", "bad2"] {
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(query_param("key", key))
            .respond_with(ResponseTemplate::new(400).set_body_json(invalid_key_body()))
            .mount(&server)
            .await;
    }
    mount_key(&server, "good", ResponseTemplate::new(200).set_body_json(success_body()), 8).await;

    let dispatcher = Arc::new(
        Dispatcher::new(&upstream_config(&server, &["bad1", "bad2", "good"])).unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.send(&payload()).await.is_ok() })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap());
    }
    assert_eq!(dispatcher.pool().keys(), vec!["good"]);
}
