use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;

use super::validate_key;
use crate::errors::PersistenceError;

/// On-disk shape of one context snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub timestamp: DateTime<Local>,
    pub owner: String,
    pub data: Value,
}

/// Read-side status of a worker, derived from its most recent context write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Active,
    Idle,
    NotStarted,
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerStatus::Active => write!(f, "active"),
            WorkerStatus::Idle => write!(f, "idle"),
            WorkerStatus::NotStarted => write!(f, "not_started"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OwnerStatus {
    pub owner: String,
    pub status: WorkerStatus,
    pub last_write: Option<DateTime<Local>>,
    pub snapshots: usize,
}

/// Durable key-value store, one directory per owner.
#[derive(Debug, Clone)]
pub struct ContextStore {
    root: PathBuf,
}

impl ContextStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, owner: &str, context_id: &str) -> Result<PathBuf, PersistenceError> {
        validate_key("owner", owner)?;
        validate_key("context id", context_id)?;
        Ok(self.root.join(owner).join(format!("{}.json", context_id)))
    }

    /// Write or overwrite the record at `(owner, context_id)`.
    ///
    /// The owner's directory is created on first use. Each write goes to its
    /// own temp file in that directory and is renamed into place, so readers
    /// never see a half-written file and concurrent writers to one key do not
    /// trample each other; the last rename wins.
    pub fn save(&self, owner: &str, context_id: &str, data: &Value) -> Result<(), PersistenceError> {
        let path = self.record_path(owner, context_id)?;
        let dir = self.root.join(owner);
        fs::create_dir_all(&dir).map_err(|source| PersistenceError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let record = ContextRecord {
            timestamp: Local::now(),
            owner: owner.to_string(),
            data: data.clone(),
        };
        let json = serde_json::to_string_pretty(&record).map_err(PersistenceError::Encode)?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|source| PersistenceError::Write {
            path: dir.clone(),
            source,
        })?;
        tmp.write_all(json.as_bytes())
            .map_err(|source| PersistenceError::Write {
                path: tmp.path().to_path_buf(),
                source,
            })?;
        tmp.persist(&path).map_err(|e| PersistenceError::Write {
            path: path.clone(),
            source: e.error,
        })?;

        tracing::debug!(owner, context_id, "Saved context");
        Ok(())
    }

    /// Full record at `(owner, context_id)`, `None` when never written.
    pub fn load_record(
        &self,
        owner: &str,
        context_id: &str,
    ) -> Result<Option<ContextRecord>, PersistenceError> {
        let path = self.record_path(owner, context_id)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(PersistenceError::Read { path, source }),
        };
        let record: ContextRecord = serde_json::from_str(&content)
            .map_err(|source| PersistenceError::Corrupt { path, source })?;
        tracing::debug!(owner, context_id, "Loaded context");
        Ok(Some(record))
    }

    /// Stored payload at `(owner, context_id)`, `None` when never written.
    pub fn load(&self, owner: &str, context_id: &str) -> Result<Option<Value>, PersistenceError> {
        Ok(self.load_record(owner, context_id)?.map(|r| r.data))
    }

    fn snapshot_files(&self, owner: &str) -> Result<Vec<PathBuf>, PersistenceError> {
        validate_key("owner", owner)?;
        let dir = self.root.join(owner);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(PersistenceError::Read { path: dir, source }),
        };
        Ok(entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|e| e == "json"))
            .collect())
    }

    /// Context ids stored for `owner`, sorted.
    pub fn list(&self, owner: &str) -> Result<Vec<String>, PersistenceError> {
        let mut ids: Vec<String> = self
            .snapshot_files(owner)?
            .iter()
            .filter_map(|p| p.file_stem().map(|s| s.to_string_lossy().to_string()))
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Modification time of the owner's most recently written snapshot.
    pub fn last_write(&self, owner: &str) -> Result<Option<DateTime<Local>>, PersistenceError> {
        let latest = self
            .snapshot_files(owner)?
            .iter()
            .filter_map(|p| p.metadata().and_then(|m| m.modified()).ok())
            .max();
        Ok(latest.map(DateTime::<Local>::from))
    }

    /// Status projection: `active` if the last write is younger than
    /// `freshness`, `idle` if older, `not_started` if nothing was written.
    pub fn owner_status(
        &self,
        owner: &str,
        now: DateTime<Local>,
        freshness: Duration,
    ) -> Result<OwnerStatus, PersistenceError> {
        let snapshots = self.snapshot_files(owner)?.len();
        let last_write = self.last_write(owner)?;
        let status = match last_write {
            None => WorkerStatus::NotStarted,
            Some(at) => {
                let age = now.signed_duration_since(at).to_std().unwrap_or(Duration::ZERO);
                if age < freshness {
                    WorkerStatus::Active
                } else {
                    WorkerStatus::Idle
                }
            }
        };
        Ok(OwnerStatus {
            owner: owner.to_string(),
            status,
            last_write,
            snapshots,
        })
    }
}
