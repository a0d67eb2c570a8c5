//! Filesystem-backed cache store

use crate::cache::{CacheEntry, CacheFile, CacheManifest, CacheStore};
use anyhow::{Context, Result};
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use tracing::debug;

const MANIFEST_FILE: &str = "manifest.json";
const FILES_DIR: &str = "files";

/// Cache store rooted at a directory: one subdirectory per key holding a
/// JSON manifest plus the snapshot blobs.
///
/// A put replaces the key's directory wholesale, so concurrent writers
/// settle on last-write-wins without locking.
pub struct FsCacheStore {
    root: PathBuf,
}

impl FsCacheStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Create a store at the default per-user cache location.
    pub fn with_default_path() -> Result<Self> {
        let root = dirs::cache_dir()
            .context("could not determine user cache directory")?
            .join("jobline");
        Ok(Self::new(root))
    }

    /// Directory for a key: sanitized for display plus a stable hash so
    /// distinct keys never share a directory.
    fn key_dir(&self, key: &str) -> PathBuf {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        key.hash(&mut hasher);
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
            .collect();
        self.root.join(format!("{}-{:016x}", safe, hasher.finish()))
    }
}

#[async_trait::async_trait]
impl CacheStore for FsCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let dir = self.key_dir(key);
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Ok(None);
        }

        let manifest: CacheManifest = serde_json::from_str(
            &std::fs::read_to_string(&manifest_path)
                .with_context(|| format!("reading manifest for key '{}'", key))?,
        )
        .with_context(|| format!("parsing manifest for key '{}'", key))?;

        let files_root = dir.join(FILES_DIR);
        let mut files = Vec::new();
        if files_root.is_dir() {
            read_blobs(&files_root, &files_root, &mut files)
                .with_context(|| format!("reading blobs for key '{}'", key))?;
        }

        debug!("Loaded cache entry '{}' ({} files)", key, files.len());
        Ok(Some(CacheEntry {
            key: manifest.key,
            paths: manifest.paths,
            saved_at: manifest.saved_at,
            files,
        }))
    }

    async fn put(&self, entry: &CacheEntry) -> Result<()> {
        let dir = self.key_dir(&entry.key);

        // replace any previous entry wholesale
        if dir.exists() {
            std::fs::remove_dir_all(&dir)
                .with_context(|| format!("clearing previous entry for key '{}'", entry.key))?;
        }
        let files_root = dir.join(FILES_DIR);
        std::fs::create_dir_all(&files_root)
            .with_context(|| format!("creating entry directory for key '{}'", entry.key))?;

        let manifest = CacheManifest {
            key: entry.key.clone(),
            paths: entry.paths.clone(),
            saved_at: entry.saved_at,
        };
        std::fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&manifest)?,
        )
        .with_context(|| format!("writing manifest for key '{}'", entry.key))?;

        for file in &entry.files {
            let target = files_root.join(&file.relative_path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, &file.contents)
                .with_context(|| format!("writing blob '{}'", file.relative_path))?;
        }

        debug!("Stored cache entry '{}' ({} files)", entry.key, entry.files.len());
        Ok(())
    }
}

fn read_blobs(root: &Path, path: &Path, files: &mut Vec<CacheFile>) -> std::io::Result<()> {
    for child in std::fs::read_dir(path)? {
        let child = child?.path();
        if child.is_dir() {
            read_blobs(root, &child, files)?;
        } else {
            let relative = child
                .strip_prefix(root)
                .unwrap_or(&child)
                .to_string_lossy()
                .into_owned();
            files.push(CacheFile {
                relative_path: relative,
                contents: std::fs::read(&child)?,
            });
        }
    }
    Ok(())
}
