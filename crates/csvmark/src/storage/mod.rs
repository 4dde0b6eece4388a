//! Byte-level persistence for raw uploads and processed outputs.
//!
//! Artifacts are addressed by opaque location strings handed back from
//! `save`/`save_output`; nothing above this module interprets them.

mod filesystem;
mod memory;

pub use filesystem::FileArtifactStore;
pub use memory::MemoryArtifactStore;

use chrono::Utc;

use crate::error::StorageError;
use crate::registry::JobId;
use crate::sanitize::sanitize_filename;

/// Prefix of every processed artifact name.
pub const PROCESSED_PREFIX: &str = "processed_";

pub trait ArtifactStore: Send + Sync {
    /// Stores a raw upload for `job_id`. The stored name embeds the job id,
    /// a timestamp and the sanitized original `filename`.
    fn save(&self, bytes: &[u8], job_id: &JobId, filename: &str) -> Result<String, StorageError>;

    /// Stores a processed artifact under `name` (or a suffixed variant when
    /// the name is taken).
    fn save_output(&self, bytes: &[u8], name: &str) -> Result<String, StorageError>;

    fn read(&self, location: &str) -> Result<Vec<u8>, StorageError>;

    /// Never fails; unreadable or foreign locations simply don't exist.
    fn exists(&self, location: &str) -> bool;

    fn delete(&self, location: &str) -> Result<(), StorageError>;
}

pub(crate) fn upload_name(job_id: &JobId, filename: &str) -> String {
    format!(
        "{}_{}_{}",
        job_id,
        Utc::now().timestamp(),
        sanitize_filename(filename)
    )
}

/// `name` for the first attempt, then `base_2.ext`, `base_3.ext`, ...
pub(crate) fn candidate_name(name: &str, attempt: u32) -> String {
    if attempt <= 1 {
        return name.to_string();
    }
    match name.rfind('.') {
        Some(dot_pos) if dot_pos > 0 => {
            format!("{}_{}{}", &name[..dot_pos], attempt, &name[dot_pos..])
        }
        _ => format!("{}_{}", name, attempt),
    }
}

pub(crate) const MAX_NAME_ATTEMPTS: u32 = 1000;
