//! REST endpoint tests: health, sanitized config, metrics and CORS.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use common::TestFixture;
use omega_core::ApiKeys;

#[tokio::test]
async fn test_health() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/v1/health").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_is_sanitized() {
    let fixture =
        TestFixture::with_fallback_keys(ApiKeys::new(Some("tb-secret".to_string()), None)).await;

    let response = fixture.get("/api/v1/config").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["torbox"]["api_key_configured"], true);
    assert_eq!(response.body["realdebrid"]["api_key_configured"], false);
    assert_eq!(response.body["realdebrid"]["links"]["attempts"], 10);
    assert!(!response.body.to_string().contains("tb-secret"));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v1/health").await;

    let request = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .unwrap();
    let response = fixture.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("omega_http_requests_total"));
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let fixture = TestFixture::new().await;

    let request = Request::builder()
        .uri("/api/v1/health")
        .header("origin", "https://client.example")
        .body(Body::empty())
        .unwrap();
    let response = fixture.router.clone().oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"]
            .to_str()
            .unwrap(),
        "*"
    );
}
