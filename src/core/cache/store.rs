//! Persistent index of completed spaces
//!
//! The index is a single JSON file loaded once at startup. Writes update the
//! in-memory copy and then persist the whole index through a temporary file
//! and a rename, so a crash mid-write leaves the previous index intact.
//! Concurrent writers are serialized by an async mutex.

use super::entry::CacheEntry;
use crate::domain::{AppError, Result, SpaceKey};
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const INDEX_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    #[serde(default)]
    entries: BTreeMap<SpaceKey, CacheEntry>,
}

/// Cache of completed space exports
#[derive(Debug)]
pub struct CacheStore {
    path: Option<PathBuf>,
    max_age: Option<ChronoDuration>,
    entries: RwLock<BTreeMap<SpaceKey, CacheEntry>>,
    write_lock: Mutex<()>,
}

impl CacheStore {
    /// Loads the index at `path`
    ///
    /// A missing file yields an empty cache. A corrupt file is logged and
    /// also treated as empty; it is replaced on the next write.
    pub fn load(path: impl Into<PathBuf>, max_age: Option<std::time::Duration>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<IndexFile>(&contents) {
                Ok(index) => {
                    tracing::info!(
                        path = %path.display(),
                        entries = index.entries.len(),
                        "Loaded export cache"
                    );
                    index.entries
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Export cache is unreadable, starting with an empty cache"
                    );
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No export cache found");
                BTreeMap::new()
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Could not read export cache, starting with an empty cache"
                );
                BTreeMap::new()
            }
        };

        Self {
            path: Some(path),
            max_age: max_age.and_then(|age| ChronoDuration::from_std(age).ok()),
            entries: RwLock::new(entries),
            write_lock: Mutex::new(()),
        }
    }

    /// A cache that never reports hits and never persists
    pub fn disabled() -> Self {
        Self {
            path: None,
            max_age: None,
            entries: RwLock::new(BTreeMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Returns the stored entry for `key`, valid or not
    pub fn lookup(&self, key: &SpaceKey) -> Option<CacheEntry> {
        self.read_entries().get(key).cloned()
    }

    /// Whether `entry` still describes a usable archive
    ///
    /// The archive must exist with the recorded size, and must not be older
    /// than the configured maximum age.
    pub fn is_valid(&self, entry: &CacheEntry) -> bool {
        if !self.is_enabled() {
            return false;
        }

        if let Some(max_age) = self.max_age {
            if Utc::now() - entry.completed_at > max_age {
                return false;
            }
        }

        match std::fs::metadata(&entry.file_path) {
            Ok(meta) if meta.is_file() => entry.size_bytes == 0 || meta.len() == entry.size_bytes,
            _ => false,
        }
    }

    /// Returns the entry for `key` only if it is valid
    pub fn valid_entry(&self, key: &SpaceKey) -> Option<CacheEntry> {
        self.lookup(key).filter(|entry| self.is_valid(entry))
    }

    /// Inserts or replaces the entry for its space and persists the index
    pub async fn write(&self, entry: CacheEntry) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };

        let _guard = self.write_lock.lock().await;

        let snapshot = {
            let mut entries = self.write_entries();
            entries.insert(entry.space_key.clone(), entry);
            IndexFile {
                version: INDEX_VERSION,
                entries: entries.clone(),
            }
        };

        let json = serde_json::to_vec_pretty(&snapshot)?;
        persist_atomically(path, &json).await
    }

    /// All entries in key order
    pub fn entries(&self) -> Vec<CacheEntry> {
        self.read_entries().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, BTreeMap<SpaceKey, CacheEntry>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, BTreeMap<SpaceKey, CacheEntry>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn persist_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);

    let mut file = tokio::fs::File::create(&tmp_path).await.map_err(|e| {
        AppError::Cache(format!("Failed to create {}: {e}", tmp_path.display()))
    })?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp_path, path).await.map_err(|e| {
        AppError::Cache(format!(
            "Failed to replace {} with {}: {e}",
            path.display(),
            tmp_path.display()
        ))
    })
}
