//! Health, readiness and metrics endpoints.

mod common;

use common::{json_body, TestApp};
use reqwest::StatusCode;

#[tokio::test]
async fn health_reports_service_and_version() {
    let app = TestApp::spawn().await;

    let res = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .expect("Failed to call /health");

    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "invoicing-service");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn ready_returns_ok() {
    let app = TestApp::spawn().await;

    let res = app
        .client
        .get(app.url("/ready"))
        .send()
        .await
        .expect("Failed to call /ready");

    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn metrics_exposes_http_counters() {
    let app = TestApp::spawn().await;

    // Produce at least one recorded request
    app.client.get(app.url("/health")).send().await.unwrap();

    let res = app
        .client
        .get(app.url("/metrics"))
        .send()
        .await
        .expect("Failed to call /metrics");

    assert_eq!(res.status(), StatusCode::OK);
    let text = res.text().await.unwrap();
    assert!(text.contains("http_requests_total"));
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = TestApp::spawn().await;

    let res = app
        .client
        .get(app.url("/health"))
        .header("x-request-id", "req-123")
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()["x-request-id"], "req-123");
    assert_eq!(res.headers()["x-content-type-options"], "nosniff");
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = TestApp::spawn().await;

    let res = app
        .client
        .get(app.url("/api/nowhere"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
