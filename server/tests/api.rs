//! End-to-end tests for the upload/download API.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, ORIGIN};
use axum::http::{Method, Request, StatusCode};
use tempfile::TempDir;

use common::{body_bytes, body_json, build_test_app, build_test_app_with_store, test_settings};
use csvmark::{JobStatus, MemoryArtifactStore, Settings};

const PEOPLE_CSV: &str = "name,email\nAlice,alice@example.com\nBob,not-an-email\n";

async fn upload_id(app: &common::TestApp, filename: &str, contents: &str) -> String {
    let response = app.upload(filename, contents.as_bytes()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["id"].as_str().expect("id in upload response").to_string()
}

// ---------------------------------------------------------------------------
// Upload then download
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_then_download_returns_processed_csv() {
    let app = build_test_app(test_settings());
    let id = upload_id(&app, "people.csv", PEOPLE_CSV).await;
    app.wait_idle().await;

    let response = app.get(&format!("/api/download/{id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "text/csv");
    assert_eq!(
        response.headers()[CONTENT_DISPOSITION],
        "attachment; filename=\"processed_people.csv\""
    );

    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert_eq!(
        body,
        "name,email,has_email\nAlice,alice@example.com,true\nBob,not-an-email,false\n"
    );
}

#[tokio::test]
async fn download_filename_with_spaces_is_quoted() {
    let app = build_test_app(test_settings());
    let id = upload_id(&app, "my data 2024.csv", PEOPLE_CSV).await;
    app.wait_idle().await;

    let response = app.get(&format!("/api/download/{id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[CONTENT_DISPOSITION],
        "attachment; filename=\"processed_my data 2024.csv\""
    );
}

#[tokio::test]
async fn unterminated_quote_fails_the_job() {
    let app = build_test_app(test_settings());
    let id = upload_id(&app, "broken.csv", "name,email\n\"A,a@x.com\nB,b@y.com\n").await;
    app.wait_idle().await;

    let response = app.get(&format!("/api/download/{id}")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("Processing failed: malformed input"));
}

#[tokio::test]
async fn upload_returns_job_id_immediately() {
    let app = build_test_app(test_settings());
    let id = upload_id(&app, "people.csv", PEOPLE_CSV).await;

    let job_id = id.parse().unwrap();
    let job = app.state.registry.get(&job_id).expect("job registered");
    assert_eq!(job.label, "people.csv");
    assert!(job.input_location.is_some());

    app.wait_idle().await;
    assert_eq!(
        app.state.registry.get(&job_id).unwrap().status,
        JobStatus::Completed
    );
}

// ---------------------------------------------------------------------------
// Upload validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn upload_rejects_non_csv_extension() {
    let app = build_test_app(test_settings());
    let response = app.upload("notes.txt", b"a,b\n").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invalid file type. Only CSV files are allowed");
    assert!(app.state.registry.is_empty());
}

#[tokio::test]
async fn upload_rejects_empty_file() {
    let app = build_test_app(test_settings());
    let response = app.upload("empty.csv", b"").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "File is empty");
}

#[tokio::test]
async fn upload_rejects_binary_content() {
    let app = build_test_app(test_settings());
    let response = app.upload("data.csv", &[0u8, 1, 2, 3, 255, 0, 7]).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "File does not appear to be a valid text/CSV file"
    );
}

#[tokio::test]
async fn upload_over_size_cap_is_rejected() {
    let app = build_test_app(Settings {
        max_file_size: 16,
        ..test_settings()
    });
    let response = app.upload("big.csv", PEOPLE_CSV.as_bytes()).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(app.state.registry.is_empty());
}

#[tokio::test]
async fn upload_far_over_body_limit_is_client_error() {
    let app = build_test_app(Settings {
        max_file_size: 16,
        ..test_settings()
    });
    let contents = "a,b\n".repeat(64 * 1024);
    let response = app.upload("huge.csv", contents.as_bytes()).await;

    assert!(response.status().is_client_error());
    assert!(app.state.registry.is_empty());
}

#[tokio::test]
async fn upload_without_file_field_is_bad_request() {
    let app = build_test_app(test_settings());
    let request = common::upload_request("attachment", "people.csv", PEOPLE_CSV.as_bytes());
    let response = common::send(&app.router, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "No file provided or invalid form data");
}

#[tokio::test]
async fn storage_failure_marks_job_failed() {
    let store = Arc::new(MemoryArtifactStore::new());
    store.fail_writes(true);
    let app = build_test_app_with_store(test_settings(), store, TempDir::new().unwrap());

    let response = app.upload("people.csv", PEOPLE_CSV.as_bytes()).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Failed to save uploaded file");

    let jobs = app.state.registry.list();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Failed);
}

// ---------------------------------------------------------------------------
// Download states
// ---------------------------------------------------------------------------

#[tokio::test]
async fn download_malformed_id_is_bad_request() {
    let app = build_test_app(test_settings());
    let response = app.get("/api/download/not-a-uuid").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Invalid job ID format");
}

#[tokio::test]
async fn download_unknown_job_is_bad_request() {
    let app = build_test_app(test_settings());
    let response = app
        .get("/api/download/6f1c2d1e-3f4a-4b5c-8d9e-0a1b2c3d4e5f")
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Job not found");
}

#[tokio::test]
async fn download_pending_job_is_locked() {
    let app = build_test_app(test_settings());
    let job = app.state.registry.create("waiting.csv");

    let response = app.get(&format!("/api/download/{}", job.id)).await;
    assert_eq!(response.status(), StatusCode::LOCKED);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Still processing");
}

#[tokio::test]
async fn download_processing_job_is_locked() {
    let app = build_test_app(test_settings());
    let job = app.state.registry.create("running.csv");
    app.state
        .registry
        .set_status(&job.id, JobStatus::Processing)
        .unwrap();

    let response = app.get(&format!("/api/download/{}", job.id)).await;
    assert_eq!(response.status(), StatusCode::LOCKED);
}

#[tokio::test]
async fn download_failed_job_reports_detail() {
    let app = build_test_app(test_settings());
    let id = upload_id(&app, "blank.csv", "\n\n").await;
    app.wait_idle().await;

    let response = app.get(&format!("/api/download/{id}")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(
        json["error"],
        "Processing failed: empty input: file contains no records"
    );
}

#[tokio::test]
async fn download_with_missing_output_is_not_found() {
    let app = build_test_app(test_settings());
    let id = upload_id(&app, "people.csv", PEOPLE_CSV).await;
    app.wait_idle().await;

    for entry in std::fs::read_dir(app.download_dir()).unwrap() {
        std::fs::remove_file(entry.unwrap().path()).unwrap();
    }

    let response = app.get(&format!("/api/download/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Processed file not found");
}

// ---------------------------------------------------------------------------
// Job inspection and health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn job_endpoint_reports_status() {
    let app = build_test_app(test_settings());
    let id = upload_id(&app, "people.csv", PEOPLE_CSV).await;
    app.wait_idle().await;

    let response = app.get(&format!("/api/jobs/{id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], id);
    assert_eq!(json["status"], "completed");
    assert_eq!(json["label"], "people.csv");
    assert!(json.get("error_detail").is_none());
}

#[tokio::test]
async fn job_endpoint_unknown_is_not_found() {
    let app = build_test_app(test_settings());

    let response = app
        .get("/api/jobs/6f1c2d1e-3f4a-4b5c-8d9e-0a1b2c3d4e5f")
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get("/api/jobs/nope").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn jobs_list_includes_every_upload() {
    let app = build_test_app(test_settings());
    upload_id(&app, "one.csv", PEOPLE_CSV).await;
    upload_id(&app, "two.csv", PEOPLE_CSV).await;
    app.wait_idle().await;

    let response = app.get("/api/jobs").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let jobs = json.as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    assert!(jobs.iter().all(|j| j["status"] == "completed"));
}

#[tokio::test]
async fn health_check_returns_ok() {
    let app = build_test_app(test_settings());
    let response = app.get("/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = build_test_app(test_settings());
    let response = app.get("/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// CORS
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cors_allows_configured_origin() {
    let app = build_test_app(Settings {
        allowed_origins: vec![
            "http://localhost:5173".to_string(),
            "bad\norigin".to_string(),
        ],
        ..test_settings()
    });

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header(ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = common::send(&app.router, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn cors_wildcard_allows_any_origin() {
    let app = build_test_app(test_settings());

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header(ORIGIN, "http://elsewhere.test")
        .body(Body::empty())
        .unwrap();
    let response = common::send(&app.router, request).await;

    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}
