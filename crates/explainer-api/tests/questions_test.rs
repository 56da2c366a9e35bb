//! Question API integration tests.
//!
//! Run with: `cargo test -p explainer-api --test questions_test`

mod helpers;

use axum_test::TestServer;
use explainer_api::setup::Providers;
use explainer_ingest::DefaultAcquirer;
use helpers::fakes::{FailingAnswers, GatedAcquirer, ToneSynthesizer};
use helpers::fixtures::{sample_zip, upload_form};
use helpers::{api_path, setup_test_app, setup_test_app_with};
use serde_json::{json, Value};
use std::sync::Arc;

async fn ingest_sample(client: &TestServer, id: &str) {
    let response = client
        .post(&api_path("/repositories/upload"))
        .add_query_param("wait", "true")
        .multipart(upload_form(sample_zip(), "sample.zip", &[("id", id)]))
        .await;
    assert_eq!(response.status_code(), 201);
}

#[tokio::test]
async fn test_ask_question_stores_record() {
    let app = setup_test_app().await;
    let client = app.client();
    ingest_sample(client, "sample").await;

    let response = client
        .post(&api_path("/questions"))
        .json(&json!({
            "repository_id": "sample",
            "question": "What does greet do?"
        }))
        .await;
    assert_eq!(response.status_code(), 201);
    let record: Value = response.json();
    assert_eq!(record["repository_id"], "sample");
    assert_eq!(
        record["answer"]["answer_text"],
        "greet() in src/greet.rs prints a greeting."
    );
    assert_eq!(record["answer"]["referenced_paths"], json!(["src/greet.rs"]));
    assert_eq!(record["answer"]["code_snippets"][0]["language"], "rust");
    assert!(record["answer"].get("audio_id").is_none());

    let id = record["id"].as_str().unwrap();
    let fetched: Value = client
        .get(&api_path(&format!("/questions/{}", id)))
        .await
        .json();
    assert_eq!(fetched["question"], "What does greet do?");

    let listed: Value = client
        .get(&api_path("/repositories/sample/questions"))
        .await
        .json();
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_ask_with_context_paths_and_speech() {
    let app = setup_test_app().await;
    let client = app.client();
    ingest_sample(client, "sample").await;

    let response = client
        .post(&api_path("/questions"))
        .json(&json!({
            "repository_id": "sample",
            "question": "Explain greet",
            "context_paths": ["src/greet.rs"],
            "speak": true,
            "audio_format": "wav"
        }))
        .await;
    assert_eq!(response.status_code(), 201);
    let record: Value = response.json();
    assert_eq!(record["context_paths"], json!(["src/greet.rs"]));

    let audio_id = record["answer"]["audio_id"].as_str().unwrap();
    let audio = client.get(&api_path(&format!("/audio/{}", audio_id))).await;
    assert_eq!(audio.status_code(), 200);
    assert_eq!(audio.header("content-type"), "audio/wav");
    assert!(audio.as_bytes().starts_with(b"TONE:wav:"));
}

#[tokio::test]
async fn test_context_path_outside_repository_is_rejected() {
    let app = setup_test_app().await;
    let client = app.client();
    ingest_sample(client, "sample").await;

    let response = client
        .post(&api_path("/questions"))
        .json(&json!({
            "repository_id": "sample",
            "question": "What is here?",
            "context_paths": ["../secrets.txt"]
        }))
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["code"], "PATH_REJECTED");
}

#[tokio::test]
async fn test_question_errors() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client
        .post(&api_path("/questions"))
        .json(&json!({ "repository_id": "nope", "question": "Anything?" }))
        .await;
    assert_eq!(response.status_code(), 404);

    ingest_sample(client, "sample").await;
    let response = client
        .post(&api_path("/questions"))
        .json(&json!({ "repository_id": "sample", "question": "   " }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = client
        .get(&api_path(&format!("/questions/{}", uuid::Uuid::new_v4())))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_pending_repository_is_not_ready() {
    let (acquirer, gate) = GatedAcquirer::new();
    let providers = Providers {
        acquirer: Arc::new(acquirer),
        answers: Some(Arc::new(helpers::fakes::CannedAnswers::default())),
        speech: None,
    };
    let app = setup_test_app_with(|_| {}, providers).await;
    let client = app.client();

    client
        .post(&api_path("/repositories/upload"))
        .multipart(upload_form(sample_zip(), "sample.zip", &[("id", "busy")]))
        .await;

    let response = client
        .post(&api_path("/questions"))
        .json(&json!({ "repository_id": "busy", "question": "Ready yet?" }))
        .await;
    assert_eq!(response.status_code(), 409);

    gate.notify_one();
    helpers::wait_until_settled(client, "busy").await;
}

#[tokio::test]
async fn test_provider_missing_or_failing() {
    let unconfigured = Providers {
        acquirer: Arc::new(DefaultAcquirer::new("git", None)),
        answers: None,
        speech: Some(Arc::new(ToneSynthesizer)),
    };
    let app = setup_test_app_with(|_| {}, unconfigured).await;
    ingest_sample(app.client(), "sample").await;
    let response = app
        .client()
        .post(&api_path("/questions"))
        .json(&json!({ "repository_id": "sample", "question": "Hello?" }))
        .await;
    assert_eq!(response.status_code(), 503);

    let failing = Providers {
        acquirer: Arc::new(DefaultAcquirer::new("git", None)),
        answers: Some(Arc::new(FailingAnswers)),
        speech: None,
    };
    let app = setup_test_app_with(|_| {}, failing).await;
    ingest_sample(app.client(), "sample").await;
    let response = app
        .client()
        .post(&api_path("/questions"))
        .json(&json!({ "repository_id": "sample", "question": "Hello?" }))
        .await;
    assert_eq!(response.status_code(), 502);
    assert_eq!(response.json::<Value>()["recoverable"], true);
}

#[tokio::test]
async fn test_deleting_repository_removes_questions() {
    let app = setup_test_app().await;
    let client = app.client();
    ingest_sample(client, "sample").await;

    let record: Value = client
        .post(&api_path("/questions"))
        .json(&json!({ "repository_id": "sample", "question": "What is this?" }))
        .await
        .json();

    let deleted: Value = client
        .delete(&api_path("/repositories/sample"))
        .await
        .json();
    assert_eq!(deleted["questions_removed"], 1);

    let response = client
        .get(&api_path(&format!(
            "/questions/{}",
            record["id"].as_str().unwrap()
        )))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_explain_snippet() {
    let app = setup_test_app().await;
    let client = app.client();

    let response = client
        .post(&api_path("/explain"))
        .json(&json!({ "code": "pub fn greet() { println!(\"hi\"); }" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    let explanation = &body["explanation"];
    assert_eq!(explanation["overview"], "Prints a greeting.");
    assert_eq!(explanation["key_components"][0]["name"], "greet");
    assert_eq!(explanation["key_components"][0]["type"], "function");
    assert_eq!(
        explanation["suggested_improvements"][0],
        "take the name as a parameter"
    );

    let response = client
        .post(&api_path("/explain"))
        .json(&json!({ "code": "   \n" }))
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["code"], "INVALID_INPUT");

    let response = client.post(&api_path("/explain")).json(&json!({})).await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_explain_without_working_provider() {
    let unconfigured = Providers {
        acquirer: Arc::new(DefaultAcquirer::new("git", None)),
        answers: None,
        speech: None,
    };
    let app = setup_test_app_with(|_| {}, unconfigured).await;
    let response = app
        .client()
        .post(&api_path("/explain"))
        .json(&json!({ "code": "fn main() {}" }))
        .await;
    assert_eq!(response.status_code(), 503);

    let failing = Providers {
        acquirer: Arc::new(DefaultAcquirer::new("git", None)),
        answers: Some(Arc::new(FailingAnswers)),
        speech: None,
    };
    let app = setup_test_app_with(|_| {}, failing).await;
    let response = app
        .client()
        .post(&api_path("/explain"))
        .json(&json!({ "code": "fn main() {}" }))
        .await;
    assert_eq!(response.status_code(), 502);
}
