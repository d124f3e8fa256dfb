//! Rate limiting over real connections.

mod common;

use std::sync::Arc;

use common::{fake_state, file_form, FakeHost, TestServer};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn test_ai_analysis_limit() {
    let server = TestServer::start(fake_state(Arc::new(FakeHost::default()))).await;

    // failures still count against the analysis limit
    for _ in 0..10 {
        let response = server
            .client()
            .post(server.url("/api/analyze-guideline"))
            .multipart(reqwest::multipart::Form::new().text("note", "x"))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = server
        .client()
        .post(server.url("/api/analyze-guideline"))
        .multipart(reqwest::multipart::Form::new().text("note", "x"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["error"], "AI analysis limit exceeded");
    assert!(body["retryAfter"].as_u64().is_some_and(|s| s > 0));

    server.shutdown().await;
}

#[tokio::test]
async fn test_failed_uploads_are_not_counted() {
    let server = TestServer::start(fake_state(Arc::new(FakeHost::default()))).await;

    for _ in 0..25 {
        let response = server
            .client()
            .post(server.url("/api/upload"))
            .multipart(file_form("image", "a.txt", "text/plain", b"hello".to_vec()))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    server.shutdown().await;
}

#[tokio::test]
async fn test_upload_limit_shared_with_background_removal() {
    let server = TestServer::start(fake_state(Arc::new(FakeHost::default()))).await;
    let png = common::png_bytes();

    for i in 0..20 {
        let path = if i % 2 == 0 {
            "/api/upload"
        } else {
            "/api/remove-background"
        };
        let response = server
            .client()
            .post(server.url(path))
            .multipart(file_form("image", "a.png", "image/png", png.clone()))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::OK, "request {i}");
    }

    let response = server
        .client()
        .post(server.url("/api/upload"))
        .multipart(file_form("image", "a.png", "image/png", png))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["error"], "Upload limit exceeded");

    server.shutdown().await;
}

#[tokio::test]
async fn test_global_limit() {
    let server = TestServer::start(fake_state(Arc::new(FakeHost::default()))).await;

    for _ in 0..100 {
        let response = server
            .client()
            .get(server.url("/api/health"))
            .send()
            .await
            .expect("request");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = server
        .client()
        .get(server.url("/api/health"))
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["error"], "Too many requests");

    server.shutdown().await;
}
