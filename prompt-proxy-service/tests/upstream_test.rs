//! Upstream behavior tests: a local stub stands in for the Gemini API so
//! status propagation, timeouts and the no-retry contract are observable.

mod common;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use common::{gemini_config, spawn_upstream, TestApp};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn candidates_body(text: &str) -> serde_json::Value {
    serde_json::json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }],
        "usageMetadata": { "promptTokenCount": 3, "candidatesTokenCount": 4 }
    })
}

async fn post_prompt(app: &TestApp) -> reqwest::Response {
    app.client()
        .post(format!("{}/api/generate", app.address))
        .header("Content-Type", "application/json")
        .body(r#"{"inputText":"Hello"}"#)
        .send()
        .await
        .expect("Failed to send request")
}

#[tokio::test]
async fn candidate_text_is_proxied_verbatim() {
    let upstream = Router::new().route(
        "/models/:model",
        post(|| async { Json(candidates_body("Hi there!")) }),
    );
    let upstream_port = spawn_upstream(upstream).await;

    let app = TestApp::spawn(gemini_config(upstream_port, Some("test-key"), 2)).await;
    let response = post_prompt(&app).await;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["output"], "Hi there!");
}

#[tokio::test]
async fn control_characters_are_stripped_from_output() {
    let upstream = Router::new().route(
        "/models/:model",
        post(|| async { Json(candidates_body("Hi\u{7} there!\u{0}")) }),
    );
    let upstream_port = spawn_upstream(upstream).await;

    let app = TestApp::spawn(gemini_config(upstream_port, Some("test-key"), 2)).await;
    let response = post_prompt(&app).await;

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["output"], "Hi there!");
}

#[tokio::test]
async fn missing_candidates_yield_fallback_message() {
    let upstream = Router::new().route(
        "/models/:model",
        post(|| async { Json(serde_json::json!({ "candidates": [] })) }),
    );
    let upstream_port = spawn_upstream(upstream).await;

    let app = TestApp::spawn(gemini_config(upstream_port, Some("test-key"), 2)).await;
    let response = post_prompt(&app).await;

    // Provider succeeded with nothing usable: still a success response.
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["output"], "No content generated.");
}

#[tokio::test]
async fn provider_status_is_propagated_verbatim() {
    let upstream = Router::new().route(
        "/models/:model",
        post(|| async {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "error": { "message": "model overloaded" } })),
            )
        }),
    );
    let upstream_port = spawn_upstream(upstream).await;

    let app = TestApp::spawn(gemini_config(upstream_port, Some("test-key"), 2)).await;
    let response = post_prompt(&app).await;

    assert_eq!(response.status(), 503);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert!(body["error"]
        .as_str()
        .expect("error field missing")
        .contains("Gemini API error"));
    assert!(body["details"]
        .as_str()
        .expect("details field missing")
        .contains("model overloaded"));
}

#[tokio::test]
async fn provider_rate_limit_maps_to_429() {
    let upstream = Router::new().route(
        "/models/:model",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
    );
    let upstream_port = spawn_upstream(upstream).await;

    let app = TestApp::spawn(gemini_config(upstream_port, Some("test-key"), 2)).await;
    let response = post_prompt(&app).await;

    assert_eq!(response.status(), 429);
}

#[tokio::test]
async fn upstream_timeout_yields_502_without_hanging() {
    let upstream = Router::new().route(
        "/models/:model",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(candidates_body("too late"))
        }),
    );
    let upstream_port = spawn_upstream(upstream).await;

    // 1 second call bound against a 5 second upstream
    let app = TestApp::spawn(gemini_config(upstream_port, Some("test-key"), 1)).await;

    let started = Instant::now();
    let response = post_prompt(&app).await;
    let elapsed = started.elapsed();

    assert_eq!(response.status(), 502);
    assert!(
        elapsed < Duration::from_secs(4),
        "timed-out call should terminate within the bound, took {elapsed:?}"
    );
}

#[tokio::test]
async fn connection_failure_yields_502() {
    // Reserve a port, then close it so nothing is listening.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let dead_port = listener.local_addr().expect("No local addr").port();
    drop(listener);

    let app = TestApp::spawn(gemini_config(dead_port, Some("test-key"), 1)).await;
    let response = post_prompt(&app).await;

    assert_eq!(response.status(), 502);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert!(body["error"]
        .as_str()
        .expect("error field missing")
        .starts_with("Bad Gateway"));
}

#[tokio::test]
async fn missing_api_key_short_circuits_before_any_outbound_call() {
    let hits = Arc::new(AtomicUsize::new(0));
    let hits_in_handler = hits.clone();

    let upstream = Router::new().route(
        "/models/:model",
        post(move || {
            let hits = hits_in_handler.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Json(candidates_body("should never be reached"))
            }
        }),
    );
    let upstream_port = spawn_upstream(upstream).await;

    let app = TestApp::spawn(gemini_config(upstream_port, None, 2)).await;
    let response = post_prompt(&app).await;

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "Configuration error");
    assert_eq!(hits.load(Ordering::SeqCst), 0, "no outbound call expected");
}
