pub mod download;
pub mod health;
pub mod jobs;
pub mod upload;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Routes mounted under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(upload::upload_file))
        .route("/download/{id}", get(download::download_file))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{id}", get(jobs::get_job))
}
