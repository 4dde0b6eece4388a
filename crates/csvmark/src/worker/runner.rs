use std::sync::Arc;

use tracing::{debug, error, info, info_span, warn};

use crate::error::{RegistryError, WorkerError};
use crate::registry::{JobId, JobRegistry, JobStatus};
use crate::sanitize;
use crate::storage::{ArtifactStore, PROCESSED_PREFIX};
use crate::transform::RecordTransform;

/// Performs one job's transformation end to end and reports the outcome to
/// the registry. Errors never leave [`TransformWorker::run`]; they become a
/// failed job.
pub struct TransformWorker {
    registry: Arc<JobRegistry>,
    store: Arc<dyn ArtifactStore>,
    transform: RecordTransform,
}

impl TransformWorker {
    pub fn new(registry: Arc<JobRegistry>, store: Arc<dyn ArtifactStore>) -> Self {
        Self::with_transform(registry, store, RecordTransform::default())
    }

    pub fn with_transform(
        registry: Arc<JobRegistry>,
        store: Arc<dyn ArtifactStore>,
        transform: RecordTransform,
    ) -> Self {
        Self {
            registry,
            store,
            transform,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn run(&self, job_id: &JobId) {
        let _worker_span = info_span!("transform_job", job_id = %job_id).entered();

        match self.registry.set_status(job_id, JobStatus::Processing) {
            Ok(()) => {}
            Err(RegistryError::NotFound(_)) => {
                debug!("Job {} no longer exists, nothing to do", job_id);
                return;
            }
            Err(e) => {
                warn!("Not starting job {}: {}", job_id, e);
                return;
            }
        }

        match self.execute(job_id) {
            Ok(location) => self.finish(job_id, location),
            Err(e) => {
                error!("Job {} failed: {}", job_id, e);
                if let Err(mark_err) = self.registry.mark_failed(job_id, e.to_string()) {
                    debug!("Could not record failure for job {}: {}", job_id, mark_err);
                }
            }
        }
    }

    /// Steps between "processing" and "completed": returns the location of
    /// the processed artifact.
    fn execute(&self, job_id: &JobId) -> Result<String, WorkerError> {
        let job = self.registry.get(job_id).ok_or(WorkerError::JobNotFound)?;
        let input_location = job.input_location.ok_or(WorkerError::MissingInput)?;
        let filename = sanitize::redact_path(&input_location);

        let input = {
            let _step = info_span!("read_input", filename = %filename).entered();
            self.store
                .read(&input_location)
                .map_err(WorkerError::ReadInput)?
        };

        let output = {
            let _step = info_span!("transform", bytes = input.len()).entered();
            self.transform.process(&input)?
        };

        let _step = info_span!("write_output").entered();
        let output_name = format!("{}{}", PROCESSED_PREFIX, filename);
        self.store
            .save_output(&output, &output_name)
            .map_err(WorkerError::WriteOutput)
    }

    fn finish(&self, job_id: &JobId, location: String) {
        match self.registry.complete(job_id, location.as_str()) {
            Ok(()) => info!("Successfully processed job {}", job_id),
            Err(e) => {
                // The job vanished or was failed meanwhile; the output is orphaned.
                warn!("Could not complete job {}: {}", job_id, e);
                if let Err(delete_err) = self.store.delete(&location) {
                    warn!("Failed to remove orphaned output for job {}: {}", job_id, delete_err);
                }
            }
        }
    }
}
