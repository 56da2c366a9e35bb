//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p explainer-api`. Every test app gets
//! its own temporary data directory; providers are in-process fakes.

#![allow(dead_code)]

pub mod fakes;
pub mod fixtures;

use axum_test::TestServer;
use explainer_api::constants;
use explainer_api::setup::{initialize_services, routes, Providers};
use explainer_api::state::AppState;
use explainer_core::{Config, ExplainerConfig};
use explainer_ingest::DefaultAcquirer;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// API path with the `/api` prefix (e.g. `/repositories` -> `/api/repositories`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", constants::API_PREFIX, path)
}

/// Test application: server, state, and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub _data_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

/// Providers backed by fakes: archive ingestion through the real acquirer,
/// canned answers and a synthetic tone for speech.
pub fn fake_providers() -> Providers {
    Providers {
        acquirer: Arc::new(DefaultAcquirer::new("git", None)),
        answers: Some(Arc::new(fakes::CannedAnswers::default())),
        speech: Some(Arc::new(fakes::ToneSynthesizer)),
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}, fake_providers()).await
}

/// Build a test app after letting the caller adjust config and providers.
pub async fn setup_test_app_with(
    configure: impl FnOnce(&mut ExplainerConfig),
    providers: Providers,
) -> TestApp {
    let data_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let mut inner = ExplainerConfig::for_data_dir(data_dir.path());
    configure(&mut inner);
    let config = Config(Box::new(inner));

    let state = initialize_services(&config, providers)
        .await
        .expect("Failed to initialize services");
    let app = routes::setup_routes(&config, state.clone()).expect("Failed to set up routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        state,
        _data_dir: data_dir,
    }
}

/// Poll a repository until it leaves `pending`, returning its final JSON.
pub async fn wait_until_settled(client: &TestServer, id: &str) -> Value {
    for _ in 0..200 {
        let response = client.get(&api_path(&format!("/repositories/{}", id))).await;
        let body: Value = response.json();
        if body["status"] != "pending" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("repository {} did not settle", id);
}
