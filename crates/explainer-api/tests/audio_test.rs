//! Audio API integration tests.
//!
//! Run with: `cargo test -p explainer-api --test audio_test`

mod helpers;

use explainer_api::setup::Providers;
use explainer_ingest::DefaultAcquirer;
use helpers::{api_path, setup_test_app, setup_test_app_with};
use serde_json::{json, Value};
use std::sync::Arc;

#[tokio::test]
async fn test_synthesize_fetch_delete() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client
        .post(&api_path("/audio"))
        .json(&json!({ "text": "Hello from the explainer", "format": "ogg" }))
        .await;
    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(body["format"], "ogg");
    assert_eq!(body["duration_seconds"], 1.0);
    let url = body["url"].as_str().unwrap().to_string();
    assert_eq!(url, format!("/api/audio/{}", body["audio_id"].as_str().unwrap()));

    let audio = client.get(&url).await;
    assert_eq!(audio.status_code(), 200);
    assert_eq!(audio.header("content-type"), "audio/ogg");
    assert_eq!(audio.as_bytes().as_ref(), b"TONE:ogg:Hello from the explainer");

    let deleted = client.delete(&url).await;
    assert_eq!(deleted.status_code(), 200);
    assert_eq!(deleted.json::<Value>()["deleted"], true);

    assert_eq!(client.get(&url).await.status_code(), 404);
    assert_eq!(client.delete(&url).await.status_code(), 404);
}

#[tokio::test]
async fn test_default_format_is_mp3() {
    let app = setup_test_app().await;
    let body: Value = app
        .client()
        .post(&api_path("/audio"))
        .json(&json!({ "text": "short" }))
        .await
        .json();
    assert_eq!(body["format"], "mp3");
}

#[tokio::test]
async fn test_synthesis_validation_and_configuration() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client
        .post(&api_path("/audio"))
        .json(&json!({ "text": "" }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = client
        .post(&api_path("/audio"))
        .json(&json!({ "text": "hi", "format": "flac" }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = client
        .get(&api_path(&format!("/audio/{}", uuid::Uuid::new_v4())))
        .await;
    assert_eq!(response.status_code(), 404);

    let disabled = Providers {
        acquirer: Arc::new(DefaultAcquirer::new("git", None)),
        answers: None,
        speech: None,
    };
    let app = setup_test_app_with(|_| {}, disabled).await;
    let response = app
        .client()
        .post(&api_path("/audio"))
        .json(&json!({ "text": "hi" }))
        .await;
    assert_eq!(response.status_code(), 503);
}
