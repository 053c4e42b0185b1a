//! JSON file adapter for the perspective repository.

use super::contract::{HandleSet, PerspectiveRepository};
use crate::error::StorageError;
use crate::perspective::PerspectiveHandle;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Stores the handle set as one JSON object keyed by uuid.
///
/// Writes go to a sibling temp file which is synced and then renamed over
/// the target.
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_failed(&self, path: &Path, source: std::io::Error) -> StorageError {
        StorageError::WriteFailed {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl PerspectiveRepository for JsonFileRepository {
    fn load(&self) -> Result<HandleSet, StorageError> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No perspective store yet, starting empty");
            return Ok(HandleSet::new());
        }

        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(HandleSet::new());
        }
        let records: BTreeMap<String, PerspectiveHandle> =
            serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        let mut handles = HandleSet::new();
        for (key, handle) in records {
            if key != handle.uuid.to_string() {
                warn!(
                    key = %key,
                    uuid = %handle.uuid,
                    "Perspective record key does not match its uuid, using the uuid"
                );
            }
            handles.insert(handle.uuid, handle);
        }
        Ok(handles)
    }

    fn save(&self, handles: &HandleSet) -> Result<(), StorageError> {
        if self.path.file_name().is_none() {
            return Err(StorageError::InvalidPath(self.path.display().to_string()));
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.write_failed(parent, e))?;
            }
        }

        let records: BTreeMap<String, &PerspectiveHandle> = handles
            .iter()
            .map(|(uuid, handle)| (uuid.to_string(), handle))
            .collect();
        let bytes = serde_json::to_vec_pretty(&records)?;

        let temp = self.temp_path();
        let mut file = fs::File::create(&temp).map_err(|e| self.write_failed(&temp, e))?;
        file.write_all(&bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| self.write_failed(&temp, e))?;
        drop(file);

        fs::rename(&temp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            self.write_failed(&self.path, e)
        })?;
        debug!(path = %self.path.display(), count = handles.len(), "Persisted perspective handles");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
