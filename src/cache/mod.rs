//! Cache layer: keyed snapshots of workspace paths reused across runs
//!
//! Caching is an optimization, never a correctness requirement: a missing
//! entry means a cold run, and a failed save is reported but must not sink
//! an otherwise-successful job (that policy lives in the job runner).

pub mod store;

pub use store::FsCacheStore;

use crate::environment::Environment;
use crate::error::JobError;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// One file inside a cache snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheFile {
    /// Path relative to the workspace root
    pub relative_path: String,

    /// Opaque file contents
    pub contents: Vec<u8>,
}

/// A keyed snapshot of declared workspace paths.
///
/// At most one entry per key is current; saving under an existing key
/// replaces the previous entry wholesale (no merge).
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Cache key
    pub key: String,

    /// Paths that were declared for the snapshot
    pub paths: Vec<String>,

    /// When the entry was written
    pub saved_at: DateTime<Utc>,

    /// Snapshot contents
    pub files: Vec<CacheFile>,
}

/// Manifest persisted next to a filesystem-backed entry's blobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CacheManifest {
    pub key: String,
    pub paths: Vec<String>,
    pub saved_at: DateTime<Utc>,
}

/// Trait for cache backing stores
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up the current entry for a key. `Ok(None)` is a miss, not an error.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Write (or overwrite) the entry for a key. Last write wins.
    async fn put(&self, entry: &CacheEntry) -> Result<()>;
}

/// In-memory cache store (for testing or ephemeral runs)
pub struct MemoryCacheStore {
    entries: tokio::sync::RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self {
            entries: tokio::sync::RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, entry: &CacheEntry) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(entry.key.clone(), entry.clone());
        Ok(())
    }
}

/// Restores and saves cache entries for one job's environment.
pub struct CacheManager {
    store: Arc<dyn CacheStore>,
}

impl CacheManager {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// Restore the entry for `key` into the environment's workspace.
    ///
    /// Returns `Ok(None)` on a miss; the run proceeds as a cold run.
    pub async fn restore(
        &self,
        key: &str,
        env: &Environment,
    ) -> Result<Option<CacheEntry>, JobError> {
        let entry = self
            .store
            .get(key)
            .await
            .map_err(|e| JobError::Cache(format!("lookup for key '{}' failed: {}", key, e)))?;

        let Some(entry) = entry else {
            debug!("Cache miss for key '{}'", key);
            return Ok(None);
        };

        for file in &entry.files {
            let target = env.workspace.join(&file.relative_path);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    JobError::Cache(format!("restore of '{}' failed: {}", file.relative_path, e))
                })?;
            }
            tokio::fs::write(&target, &file.contents).await.map_err(|e| {
                JobError::Cache(format!("restore of '{}' failed: {}", file.relative_path, e))
            })?;
        }

        debug!(
            "Restored {} file(s) for key '{}' into {}",
            entry.files.len(),
            key,
            env.workspace.display()
        );
        Ok(Some(entry))
    }

    /// Snapshot the declared workspace paths and persist them under `key`.
    ///
    /// Declared paths that do not exist yet (first run, nothing built) are
    /// skipped with a warning rather than failing the save.
    pub async fn save(
        &self,
        key: &str,
        paths: &[String],
        env: &Environment,
    ) -> Result<CacheEntry, JobError> {
        let mut files = Vec::new();

        for declared in paths {
            let full = env.workspace.join(declared);
            if !full.exists() {
                warn!("Cache path '{}' does not exist in workspace, skipping", declared);
                continue;
            }
            collect_files(&env.workspace, &full, &mut files)
                .map_err(|e| JobError::Cache(format!("snapshot of '{}' failed: {}", declared, e)))?;
        }

        let entry = CacheEntry {
            key: key.to_string(),
            paths: paths.to_vec(),
            saved_at: Utc::now(),
            files,
        };

        self.store
            .put(&entry)
            .await
            .map_err(|e| JobError::Cache(format!("write for key '{}' failed: {}", key, e)))?;

        debug!("Saved {} file(s) under key '{}'", entry.files.len(), key);
        Ok(entry)
    }
}

/// Collect every file under `path` (file or directory) as workspace-relative
/// snapshot entries.
fn collect_files(workspace: &Path, path: &Path, files: &mut Vec<CacheFile>) -> std::io::Result<()> {
    if path.is_dir() {
        for child in std::fs::read_dir(path)? {
            collect_files(workspace, &child?.path(), files)?;
        }
    } else {
        let relative = path
            .strip_prefix(workspace)
            .unwrap_or(path)
            .to_string_lossy()
            .into_owned();
        files.push(CacheFile {
            relative_path: relative,
            contents: std::fs::read(path)?,
        });
    }
    Ok(())
}
