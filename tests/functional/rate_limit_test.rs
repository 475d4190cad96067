//! Functional tests for rate limiting

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use gen_gallery_gateway::config::RateLimitConfig;
use gen_gallery_gateway::middleware::RateLimitLayer;
use tower::ServiceExt;

fn create_test_app(rps: u32, burst: u32) -> Router {
    Router::new()
        .route("/health", axum::routing::get(|| async { "healthy" }))
        .route("/generate", axum::routing::post(|| async { "OK" }))
        .layer(RateLimitLayer::from_config(&RateLimitConfig {
            enabled: true,
            requests_per_second: rps,
            burst_size: burst,
        }))
}

fn post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_rate_limit_allows_within_limit() {
    let app = create_test_app(100, 100);

    let response = app.oneshot(post("/generate")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_rejects_over_burst() {
    let app = create_test_app(1, 1);

    let first = app.clone().oneshot(post("/generate")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.oneshot(post("/generate")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);

    let body = axum::body::to_bytes(second.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["code"], "rate_limit_exceeded");
}

#[tokio::test]
async fn test_rate_limit_health_bypass() {
    let app = create_test_app(1, 1);

    let _ = app.clone().oneshot(post("/generate")).await.unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
