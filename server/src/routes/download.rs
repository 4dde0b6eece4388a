use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use csvmark::sanitize::sanitize_filename;
use csvmark::storage::PROCESSED_PREFIX;
use csvmark::{JobId, JobStatus, StorageError};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

fn content_disposition(label: &str) -> HeaderValue {
    let value = format!(
        "attachment; filename=\"{}{}\"",
        PROCESSED_PREFIX,
        sanitize_filename(label)
    );
    HeaderValue::from_str(&value)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment; filename=\"processed_file.csv\""))
}

/// GET /api/download/{id}
///
/// Serves the processed CSV of a completed job. Pending or running jobs are
/// `423 Locked`; failed jobs report their error detail.
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let job_id: JobId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid job ID format".to_string()))?;
    let job = state
        .registry
        .get(&job_id)
        .ok_or_else(|| AppError::BadRequest("Job not found".to_string()))?;

    let location = match job.status {
        JobStatus::Pending | JobStatus::Processing => {
            return Err(AppError::Locked("Still processing".to_string()));
        }
        JobStatus::Failed => {
            return Err(AppError::JobFailed(job.error_detail.unwrap_or_default()));
        }
        JobStatus::Completed => job
            .output_location
            .ok_or_else(|| AppError::NotFound("Processed file not found".to_string()))?,
    };

    let store = state.store.clone();
    let bytes = tokio::task::spawn_blocking(move || store.read(&location))
        .await
        .map_err(|e| AppError::Internal(format!("Failed to read processed file: {}", e)))?
        .map_err(|e| match e {
            StorageError::OutsideRoot(_) => {
                AppError::NotFound("Processed file not found".to_string())
            }
            e if e.is_not_found() => AppError::NotFound("Processed file not found".to_string()),
            e => AppError::Internal(format!("Failed to read processed file: {}", e)),
        })?;

    tracing::info!(job_id = %job_id, size = bytes.len(), "Serving processed file");

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, HeaderValue::from_static("text/csv")),
            (CONTENT_DISPOSITION, content_disposition(&job.label)),
        ],
        Body::from(bytes),
    )
        .into_response())
}
