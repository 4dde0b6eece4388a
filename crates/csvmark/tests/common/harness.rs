//! Test harness for isolated end-to-end job runs.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use csvmark::storage::ArtifactStore;
use csvmark::transform::parse_records;
use csvmark::{
    Dispatcher, FileArtifactStore, Job, JobId, JobRegistry, JobStatus, RecordTransform,
    TransformWorker,
};

/// Isolated registry + file store + dispatcher rooted in a temp directory.
pub struct TestHarness {
    temp_dir: TempDir,
    pub upload_dir: PathBuf,
    pub download_dir: PathBuf,
    pub registry: Arc<JobRegistry>,
    pub store: Arc<FileArtifactStore>,
    pub dispatcher: Dispatcher,
}

impl TestHarness {
    /// Must be called from inside a tokio runtime.
    pub fn new() -> Self {
        Self::with_transform(RecordTransform::default(), 0)
    }

    pub fn with_transform(transform: RecordTransform, max_concurrent: usize) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let upload_dir = temp_dir.path().join("uploads");
        let download_dir = temp_dir.path().join("downloads");

        let registry = Arc::new(JobRegistry::new());
        let store = Arc::new(
            FileArtifactStore::new(&upload_dir, &download_dir).expect("Failed to create store"),
        );
        let worker = Arc::new(TransformWorker::with_transform(
            Arc::clone(&registry),
            store.clone(),
            transform,
        ));
        let dispatcher = Dispatcher::new(worker).with_max_concurrent(max_concurrent);

        Self {
            temp_dir,
            upload_dir,
            download_dir,
            registry,
            store,
            dispatcher,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// The transport's half of an upload: create, store, record input.
    pub fn submit(&self, filename: &str, contents: &[u8]) -> Job {
        let job = self.registry.create(filename);
        let location = self
            .store
            .save(contents, &job.id, filename)
            .expect("Failed to save upload");
        self.registry
            .set_input(&job.id, location)
            .expect("Job vanished before input was recorded");
        self.registry.get(&job.id).expect("Job vanished")
    }

    /// Submit and dispatch without waiting.
    pub fn upload(&self, filename: &str, contents: &[u8]) -> JobId {
        let job = self.submit(filename, contents);
        drop(self.dispatcher.dispatch(job.id));
        job.id
    }

    pub async fn wait_idle(&self) {
        tokio::time::timeout(Duration::from_secs(10), self.dispatcher.wait_idle())
            .await
            .expect("Jobs did not finish in time");
    }

    /// Upload, wait for the run, return the final job.
    pub async fn process(&self, filename: &str, contents: &[u8]) -> Job {
        let id = self.upload(filename, contents);
        self.wait_idle().await;
        self.registry.get(&id).expect("Job vanished")
    }

    /// Processed output of a completed job, parsed back into records.
    pub fn output_records(&self, job: &Job) -> Vec<Vec<String>> {
        assert_eq!(job.status, JobStatus::Completed, "job not completed: {:?}", job);
        let location = job.output_location.as_deref().expect("no output location");
        let bytes = self.store.read(location).expect("Failed to read output");
        parse_records(&bytes)
            .expect("Output is not valid CSV")
            .into_iter()
            .map(|row| {
                row.iter()
                    .map(|field| String::from_utf8_lossy(field).into_owned())
                    .collect()
            })
            .collect()
    }

    pub fn output_text(&self, job: &Job) -> String {
        let location = job.output_location.as_deref().expect("no output location");
        String::from_utf8(self.store.read(location).expect("Failed to read output"))
            .expect("Output is not UTF-8")
    }

    pub fn files_in(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .expect("Failed to list directory")
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}
