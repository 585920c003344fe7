//! Cross-origin permission tests.

mod common;

use common::{test_config, TestApp, TEST_ORIGIN};
use reqwest::Method;

#[tokio::test]
async fn preflight_from_allowed_origin_gets_204_and_echo() {
    let app = TestApp::spawn(test_config()).await;

    let response = app
        .client()
        .request(Method::OPTIONS, format!("{}/api/generate", app.address))
        .header("Origin", TEST_ORIGIN)
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 204);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|h| h.to_str().ok()),
        Some(TEST_ORIGIN)
    );
    assert!(response
        .headers()
        .get("access-control-allow-methods")
        .is_some());

    let body = response.text().await.expect("Failed to read body");
    assert!(body.is_empty());
}

#[tokio::test]
async fn preflight_from_unknown_origin_is_denied_explicitly() {
    let app = TestApp::spawn(test_config()).await;

    let response = app
        .client()
        .request(Method::OPTIONS, format!("{}/api/generate", app.address))
        .header("Origin", "https://evil.example.com")
        .header("Access-Control-Request-Method", "POST")
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 204);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|h| h.to_str().ok()),
        Some("null")
    );
}

#[tokio::test]
async fn actual_request_carries_permission_headers() {
    let app = TestApp::spawn(test_config()).await;

    let response = app
        .client()
        .post(format!("{}/api/generate", app.address))
        .header("Origin", TEST_ORIGIN)
        .header("Content-Type", "application/json")
        .body(r#"{"inputText":"Hello"}"#)
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 200);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|h| h.to_str().ok()),
        Some(TEST_ORIGIN)
    );
}
