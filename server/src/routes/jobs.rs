use axum::extract::{Path, State};
use axum::Json;

use csvmark::{Job, JobId};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /api/jobs
pub async fn list_jobs(State(state): State<AppState>) -> Json<Vec<Job>> {
    Json(state.registry.list())
}

/// GET /api/jobs/{id}
pub async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<Json<Job>> {
    let job_id: JobId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid job ID format".to_string()))?;

    state
        .registry
        .get(&job_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))
}
