pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod sanitize;
pub mod storage;
pub mod transform;
pub mod upload;
pub mod worker;

pub use config::{LogFormat, Settings};
pub use error::{
    ConfigError, CsvmarkError, LoggingError, RegistryError, Result, StorageError, TransformError,
    UploadError, WorkerError,
};
pub use registry::{Job, JobId, JobRegistry, JobStatus, SweepScheduler};
pub use storage::{ArtifactStore, FileArtifactStore, MemoryArtifactStore};
pub use transform::{EmailRule, FieldRule, RecordTransform};
pub use worker::{Dispatcher, TransformWorker};
