use std::io::Write;
use std::path::{Component, Path, PathBuf};

use crate::error::StorageError;
use crate::registry::JobId;
use crate::storage::{candidate_name, upload_name, ArtifactStore, MAX_NAME_ATTEMPTS};

/// Artifact store backed by two directories: one for raw uploads, one for
/// processed outputs. Locations are file paths inside those directories.
pub struct FileArtifactStore {
    upload_directory: PathBuf,
    download_directory: PathBuf,
}

impl FileArtifactStore {
    /// Creates both directories if needed. Failing to do so is fatal for the
    /// store.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        upload_directory: P,
        download_directory: Q,
    ) -> Result<Self, StorageError> {
        let store = Self {
            upload_directory: upload_directory.as_ref().to_path_buf(),
            download_directory: download_directory.as_ref().to_path_buf(),
        };
        ensure_directory(&store.upload_directory)?;
        ensure_directory(&store.download_directory)?;
        Ok(store)
    }

    pub fn upload_directory(&self) -> &Path {
        &self.upload_directory
    }

    pub fn download_directory(&self) -> &Path {
        &self.download_directory
    }

    /// Writes `content` to `dir/name`, never overwriting an existing file.
    fn store_exclusive(
        &self,
        dir_path: &Path,
        name: &str,
        content: &[u8],
    ) -> Result<PathBuf, StorageError> {
        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let try_path = dir_path.join(candidate_name(name, attempt));

            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&try_path)
            {
                Ok(file) => {
                    fill_or_remove(file, &try_path, content)?;
                    return Ok(try_path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::WriteFile {
                        path: try_path,
                        source: e,
                    });
                }
            }
        }

        Err(StorageError::FileExists(dir_path.join(name)))
    }

    /// Maps a location back to a path, refusing anything outside the two
    /// store directories.
    fn resolve(&self, location: &str) -> Result<PathBuf, StorageError> {
        let path = PathBuf::from(location);
        let escapes = path
            .components()
            .any(|c| matches!(c, Component::ParentDir));
        let inside =
            path.starts_with(&self.upload_directory) || path.starts_with(&self.download_directory);

        if escapes || !inside {
            return Err(StorageError::OutsideRoot(location.to_string()));
        }
        Ok(path)
    }
}

/// Writes `content` into a freshly created file. On failure the partial
/// file at `path` is removed so no fragment is left behind.
fn fill_or_remove<W: Write>(mut file: W, path: &Path, content: &[u8]) -> Result<(), StorageError> {
    if let Err(e) = file.write_all(content).and_then(|()| file.flush()) {
        drop(file);
        if let Err(remove_err) = std::fs::remove_file(path) {
            log::warn!(
                "Failed to remove partial file {}: {}",
                crate::sanitize::redact_path(path),
                remove_err
            );
        }
        return Err(StorageError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        });
    }
    Ok(())
}

fn ensure_directory(path: &Path) -> Result<(), StorageError> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}

fn location_of(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

impl ArtifactStore for FileArtifactStore {
    fn save(&self, bytes: &[u8], job_id: &JobId, filename: &str) -> Result<String, StorageError> {
        let name = upload_name(job_id, filename);
        let path = self.store_exclusive(&self.upload_directory, &name, bytes)?;
        log::debug!("Stored upload for job {} ({} bytes)", job_id, bytes.len());
        Ok(location_of(path))
    }

    fn save_output(&self, bytes: &[u8], name: &str) -> Result<String, StorageError> {
        let path = self.store_exclusive(&self.download_directory, name, bytes)?;
        Ok(location_of(path))
    }

    fn read(&self, location: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(location)?;
        std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(location.to_string())
            } else {
                StorageError::ReadFile { path, source: e }
            }
        })
    }

    fn exists(&self, location: &str) -> bool {
        self.resolve(location)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }

    fn delete(&self, location: &str) -> Result<(), StorageError> {
        let path = self.resolve(location)?;
        std::fs::remove_file(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(location.to_string())
            } else {
                StorageError::DeleteFile { path, source: e }
            }
        })
    }
}
