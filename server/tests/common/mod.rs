#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use csvmark::{ArtifactStore, FileArtifactStore, JobRegistry, Settings};
use csvmark_server::{build_router, AppState};

const BOUNDARY: &str = "csvmark-test-boundary";

/// A router over a temporary artifact directory, plus handles to its state.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub temp_dir: TempDir,
}

impl TestApp {
    pub async fn upload(&self, filename: &str, contents: &[u8]) -> Response {
        send(&self.router, upload_request("file", filename, contents)).await
    }

    pub async fn get(&self, uri: &str) -> Response {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        send(&self.router, request).await
    }

    /// Waits until every dispatched job has finished.
    pub async fn wait_idle(&self) {
        tokio::time::timeout(
            std::time::Duration::from_secs(10),
            self.state.dispatcher.wait_idle(),
        )
        .await
        .expect("jobs did not finish in time");
    }

    pub fn download_dir(&self) -> std::path::PathBuf {
        self.temp_dir.path().join("downloads")
    }
}

pub fn test_settings() -> Settings {
    Settings {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..Settings::default()
    }
}

/// Builds the app over a [`FileArtifactStore`] rooted in a fresh temp dir.
pub fn build_test_app(settings: Settings) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let store = FileArtifactStore::new(
        temp_dir.path().join("uploads"),
        temp_dir.path().join("downloads"),
    )
    .unwrap();
    build_test_app_with_store(settings, Arc::new(store), temp_dir)
}

pub fn build_test_app_with_store(
    settings: Settings,
    store: Arc<dyn ArtifactStore>,
    temp_dir: TempDir,
) -> TestApp {
    let state = AppState::new(Arc::new(JobRegistry::new()), store, settings);
    TestApp {
        router: build_router(state.clone()),
        state,
        temp_dir,
    }
}

pub fn upload_request(field: &str, filename: &str, contents: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: text/csv\r\n\r\n");
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri("/api/upload")
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
