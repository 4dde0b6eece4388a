use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use csvmark::upload::validate_upload;
use csvmark::JobId;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub id: JobId,
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(format!("No file provided or invalid form data: {}", err.body_text()))
    }
}

/// POST /api/upload
///
/// Accepts a multipart `file` field, stores it, creates a job and starts
/// processing in the background. Responds with the job id right away.
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await.map_err(multipart_error)?;
        upload = Some((filename, data));
        break;
    }

    let (filename, data) = upload
        .ok_or_else(|| AppError::BadRequest("No file provided or invalid form data".to_string()))?;

    tracing::info!(filename = %filename, size = data.len(), "Received upload");
    validate_upload(&filename, &data, state.settings.max_file_size)?;

    let job = state.registry.create(filename.clone());

    let store = state.store.clone();
    let job_id = job.id;
    let saved = match tokio::task::spawn_blocking(move || store.save(&data, &job_id, &filename)).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    let location = match saved {
        Ok(location) => location,
        Err(reason) => {
            tracing::error!(job_id = %job.id, error = %reason, "Failed to save upload");
            if let Err(e) = state.registry.mark_failed(&job.id, reason) {
                tracing::warn!(job_id = %job.id, error = %e, "Could not mark job failed");
            }
            return Err(AppError::Internal("Failed to save uploaded file".to_string()));
        }
    };

    state
        .registry
        .set_input(&job.id, location)
        .map_err(|e| AppError::Internal(format!("Failed to update job information: {}", e)))?;

    drop(state.dispatcher.dispatch(job.id));
    tracing::info!(job_id = %job.id, "Processing started");

    Ok(Json(UploadResponse { id: job.id }))
}
