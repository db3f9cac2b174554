//! Resume position persistence.
//!
//! The controller reads a media item's resume position once when a session
//! opens and writes it back on pause and on dispose. Failures here never fail
//! a playback command; callers log and carry on.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Identity of a media item across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(String);

impl MediaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors from resume position storage.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt resume store {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

/// Storage for per-media resume positions.
#[async_trait]
pub trait ResumeStore: Send + Sync {
    /// Returns the stored position in seconds, if any.
    ///
    /// # Errors
    ///
    /// - `PersistenceError` - Backing storage could not be read
    async fn resume_position(&self, media_id: &MediaId) -> Result<Option<f64>, PersistenceError>;

    /// Stores the position in seconds, replacing any previous value.
    ///
    /// # Errors
    ///
    /// - `PersistenceError` - Backing storage could not be written
    async fn save_resume_position(
        &self,
        media_id: &MediaId,
        seconds: f64,
    ) -> Result<(), PersistenceError>;
}

/// Process-local resume store.
#[derive(Debug, Default)]
pub struct MemoryResumeStore {
    positions: Mutex<HashMap<MediaId, f64>>,
}

impl MemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of media items with a stored position.
    pub fn len(&self) -> usize {
        self.positions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.lock().is_empty()
    }
}

#[async_trait]
impl ResumeStore for MemoryResumeStore {
    async fn resume_position(&self, media_id: &MediaId) -> Result<Option<f64>, PersistenceError> {
        Ok(self.positions.lock().get(media_id).copied())
    }

    async fn save_resume_position(
        &self,
        media_id: &MediaId,
        seconds: f64,
    ) -> Result<(), PersistenceError> {
        self.positions.lock().insert(media_id.clone(), seconds);
        Ok(())
    }
}

/// Resume store backed by a JSON file mapping media ids to seconds.
///
/// Writes go to a sibling temporary file that is renamed over the target,
/// so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct JsonFileResumeStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileResumeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<HashMap<MediaId, f64>, PersistenceError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }

        serde_json::from_str(&contents).map_err(|e| PersistenceError::Corrupt {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl ResumeStore for JsonFileResumeStore {
    async fn resume_position(&self, media_id: &MediaId) -> Result<Option<f64>, PersistenceError> {
        Ok(self.read_all().await?.get(media_id).copied())
    }

    async fn save_resume_position(
        &self,
        media_id: &MediaId,
        seconds: f64,
    ) -> Result<(), PersistenceError> {
        let _guard = self.write_lock.lock().await;

        let mut positions = self.read_all().await?;
        positions.insert(media_id.clone(), seconds);

        let serialized =
            serde_json::to_string_pretty(&positions).map_err(|e| PersistenceError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, serialized).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryResumeStore::new();
        let id = MediaId::new("movie-42");

        assert_eq!(store.resume_position(&id).await.unwrap(), None);
        store.save_resume_position(&id, 93.5).await.unwrap();
        store.save_resume_position(&id, 120.0).await.unwrap();

        assert_eq!(store.resume_position(&id).await.unwrap(), Some(120.0));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_json_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("resume.json");

        let store = JsonFileResumeStore::new(&path);
        store
            .save_resume_position(&MediaId::new("a"), 10.0)
            .await
            .unwrap();
        store
            .save_resume_position(&MediaId::new("b"), 20.0)
            .await
            .unwrap();

        let reopened = JsonFileResumeStore::new(&path);
        assert_eq!(
            reopened.resume_position(&MediaId::new("a")).await.unwrap(),
            Some(10.0)
        );
        assert_eq!(
            reopened.resume_position(&MediaId::new("b")).await.unwrap(),
            Some(20.0)
        );
        assert_eq!(
            reopened.resume_position(&MediaId::new("c")).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_json_store_reports_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("resume.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let store = JsonFileResumeStore::new(&path);
        let result = store.resume_position(&MediaId::new("a")).await;
        assert!(matches!(result, Err(PersistenceError::Corrupt { .. })));
    }
}
