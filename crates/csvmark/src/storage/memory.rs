use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::StorageError;
use crate::registry::JobId;
use crate::storage::{candidate_name, upload_name, ArtifactStore, MAX_NAME_ATTEMPTS};

const UPLOAD_AREA: &str = "memory/uploads";
const DOWNLOAD_AREA: &str = "memory/downloads";

/// Map-backed artifact store.
///
/// Reads and writes can be forced to fail, which lets the worker's error
/// paths be exercised without touching a disk.
#[derive(Default)]
pub struct MemoryArtifactStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Puts bytes at an arbitrary location, bypassing naming rules.
    pub fn insert(&self, location: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.write_blobs().insert(location.into(), bytes.into());
    }

    pub fn len(&self) -> usize {
        self.read_blobs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_blobs().is_empty()
    }

    fn read_blobs(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<u8>>> {
        match self.blobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_blobs(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<u8>>> {
        match self.blobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn store_exclusive(&self, area: &str, name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::WriteFile {
                path: PathBuf::from(area).join(name),
                source: io::Error::other("write failure injected"),
            });
        }

        let mut blobs = self.write_blobs();
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let location = format!("{}/{}", area, candidate_name(name, attempt));
            if !blobs.contains_key(&location) {
                blobs.insert(location.clone(), bytes.to_vec());
                return Ok(location);
            }
        }
        Err(StorageError::FileExists(PathBuf::from(area).join(name)))
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn save(&self, bytes: &[u8], job_id: &JobId, filename: &str) -> Result<String, StorageError> {
        self.store_exclusive(UPLOAD_AREA, &upload_name(job_id, filename), bytes)
    }

    fn save_output(&self, bytes: &[u8], name: &str) -> Result<String, StorageError> {
        self.store_exclusive(DOWNLOAD_AREA, name, bytes)
    }

    fn read(&self, location: &str) -> Result<Vec<u8>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::ReadFile {
                path: PathBuf::from(location),
                source: io::Error::other("read failure injected"),
            });
        }
        self.read_blobs()
            .get(location)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(location.to_string()))
    }

    fn exists(&self, location: &str) -> bool {
        self.read_blobs().contains_key(location)
    }

    fn delete(&self, location: &str) -> Result<(), StorageError> {
        self.write_blobs()
            .remove(location)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(location.to_string()))
    }
}
