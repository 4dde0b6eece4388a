use std::path::PathBuf;
use thiserror::Error;

use crate::registry::{JobId, JobStatus};

#[derive(Error, Debug)]
pub enum CsvmarkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Upload rejected: {0}")]
    Upload(#[from] UploadError),

    #[error("Logging setup failed: {0}")]
    Logging(#[from] LoggingError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("job {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: JobId,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("job {id} is already {status}")]
    AlreadyFinished { id: JobId, status: JobStatus },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete file '{path}': {source}")]
    DeleteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Artifact not found: {0}")]
    NotFound(String),

    #[error("Location is outside the artifact store: {0}")]
    OutsideRoot(String),

    #[error("No free file name for '{0}'")]
    FileExists(PathBuf),
}

impl StorageError {
    /// True when the error means "there is nothing at that location".
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::NotFound(_) => true,
            StorageError::ReadFile { source, .. } | StorageError::DeleteFile { source, .. } => {
                source.kind() == std::io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("empty input: file contains no records")]
    EmptyInput,

    #[error("malformed input: {0}")]
    Malformed(#[source] csv::Error),

    #[error("malformed input: {reason} on line {line}")]
    Quoting { line: u64, reason: &'static str },

    #[error("failed to serialize records: {0}")]
    Serialize(String),
}

/// Everything a single worker run can fail with.
///
/// The `Display` text is what ends up in the job's `error_detail`.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("job not found")]
    JobNotFound,

    #[error("job has no input artifact")]
    MissingInput,

    #[error("failed to read input artifact: {0}")]
    ReadInput(#[source] StorageError),

    #[error("{0}")]
    Transform(#[from] TransformError),

    #[error("failed to write processed artifact: {0}")]
    WriteOutput(#[source] StorageError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Invalid file type. Only CSV files are allowed")]
    InvalidExtension,

    #[error("File is empty")]
    Empty,

    #[error("File size ({size} bytes) exceeds maximum allowed size ({max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("File does not appear to be a valid text/CSV file")]
    NotText,
}

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("Failed to install log bridge: {0}")]
    LogBridge(#[from] log::SetLoggerError),
}

pub type Result<T> = std::result::Result<T, CsvmarkError>;
