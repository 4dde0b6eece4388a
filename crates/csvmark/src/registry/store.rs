//! In-memory job registry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Duration;

use crate::error::RegistryError;
use crate::registry::clock::{Clock, SystemClock};
use crate::registry::job::{Job, JobId, JobStatus};

/// Concurrency-safe map from job id to job record.
///
/// The registry owns every record. Reads hand out clones, and every mutation
/// happens under the write lock, so readers never see a half-updated job.
/// Share it between the transport and the workers with an `Arc`.
pub struct JobRegistry {
    jobs: RwLock<HashMap<JobId, Job>>,
    clock: Arc<dyn Clock>,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            clock,
        }
    }

    fn read_jobs(&self) -> RwLockReadGuard<'_, HashMap<JobId, Job>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_jobs(&self) -> RwLockWriteGuard<'_, HashMap<JobId, Job>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Registers a new pending job and returns a copy of it.
    pub fn create(&self, label: impl Into<String>) -> Job {
        let mut jobs = self.write_jobs();
        let mut job = Job::new(label, self.clock.now());
        // v4 collisions are practically impossible, but ids must never repeat.
        while jobs.contains_key(&job.id) {
            job.id = JobId::new();
        }
        jobs.insert(job.id, job.clone());
        log::debug!("Created job {} ({})", job.id, job.label);
        job
    }

    pub fn get(&self, id: &JobId) -> Option<Job> {
        self.read_jobs().get(id).cloned()
    }

    /// Records where the raw upload for `id` was stored.
    pub fn set_input(&self, id: &JobId, location: impl Into<String>) -> Result<(), RegistryError> {
        let mut jobs = self.write_jobs();
        let job = jobs.get_mut(id).ok_or(RegistryError::NotFound(*id))?;
        job.input_location = Some(location.into());
        Ok(())
    }

    /// Moves `id` to `status`, stamping `completed_at` on terminal states.
    ///
    /// Only forward transitions are accepted (see
    /// [`JobStatus::can_transition_to`]); anything else is
    /// [`RegistryError::InvalidTransition`] and leaves the record untouched.
    pub fn set_status(&self, id: &JobId, status: JobStatus) -> Result<(), RegistryError> {
        let now = self.clock.now();
        let mut jobs = self.write_jobs();
        let job = jobs.get_mut(id).ok_or(RegistryError::NotFound(*id))?;

        if !job.status.can_transition_to(status) {
            return Err(RegistryError::InvalidTransition {
                id: *id,
                from: job.status,
                to: status,
            });
        }

        job.status = status;
        if status.is_terminal() {
            job.completed_at = Some(now);
        }
        Ok(())
    }

    /// Records the processed artifact location without touching the status.
    /// Terminal jobs are left alone.
    ///
    /// Prefer [`JobRegistry::complete`], which sets the output and finishes
    /// the job in one step.
    pub fn set_output(&self, id: &JobId, location: impl Into<String>) -> Result<(), RegistryError> {
        let mut jobs = self.write_jobs();
        let job = jobs.get_mut(id).ok_or(RegistryError::NotFound(*id))?;
        if job.status.is_terminal() {
            return Err(RegistryError::AlreadyFinished {
                id: *id,
                status: job.status,
            });
        }
        job.output_location = Some(location.into());
        Ok(())
    }

    /// Atomically records the output location and marks the job completed.
    pub fn complete(&self, id: &JobId, location: impl Into<String>) -> Result<(), RegistryError> {
        let now = self.clock.now();
        let mut jobs = self.write_jobs();
        let job = jobs.get_mut(id).ok_or(RegistryError::NotFound(*id))?;

        if !job.status.can_transition_to(JobStatus::Completed) {
            return Err(RegistryError::InvalidTransition {
                id: *id,
                from: job.status,
                to: JobStatus::Completed,
            });
        }

        job.status = JobStatus::Completed;
        job.output_location = Some(location.into());
        job.completed_at = Some(now);
        Ok(())
    }

    /// Fails the job from whatever non-terminal state it is in.
    ///
    /// Succeeds for every known id. A job that already reached a terminal
    /// state keeps its outcome; the call is then a no-op.
    pub fn mark_failed(&self, id: &JobId, detail: impl Into<String>) -> Result<(), RegistryError> {
        let now = self.clock.now();
        let mut jobs = self.write_jobs();
        let job = jobs.get_mut(id).ok_or(RegistryError::NotFound(*id))?;

        if job.status.is_terminal() {
            log::debug!(
                "Ignoring failure for job {} already in terminal state {}",
                id,
                job.status
            );
            return Ok(());
        }

        job.status = JobStatus::Failed;
        job.error_detail = Some(detail.into());
        job.output_location = None;
        job.completed_at = Some(now);
        Ok(())
    }

    /// All jobs, oldest first.
    pub fn list(&self) -> Vec<Job> {
        let jobs = self.read_jobs();
        let mut result: Vec<Job> = jobs.values().cloned().collect();
        result.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        result
    }

    /// Removes every job created more than `max_age` ago, whatever its status.
    /// Returns how many were removed.
    pub fn sweep(&self, max_age: Duration) -> usize {
        // Ages reaching past the representable range keep everything.
        let Some(cutoff) = self.clock.now().checked_sub_signed(max_age) else {
            return 0;
        };
        let mut jobs = self.write_jobs();
        let before = jobs.len();
        jobs.retain(|_, job| job.created_at >= cutoff);
        before - jobs.len()
    }

    pub fn len(&self) -> usize {
        self.read_jobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_jobs().is_empty()
    }
}
