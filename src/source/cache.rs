use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use walkdir::WalkDir;

const ENTRY_EXTENSION: &str = "pdf";

/// Deterministic cache key for a remote reference: hex SHA-256 of the URL string.
pub fn cache_key(url: &str) -> String {
    let mut h = Sha256::new();
    h.update(url.as_bytes());
    hex::encode(h.finalize())
}

/// Durable storage for fetched documents, keyed by [`cache_key`].
///
/// Shared across concurrent builds. `put` must never expose a partially
/// written entry to `get`.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// Filesystem cache sharded by key prefix: `<root>/ab/cd/<key>.pdf`.
#[derive(Debug, Clone)]
pub struct FsCache {
    root: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub total_bytes: u64,
}

impl FsCache {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let dir = if key.len() >= 4 {
            self.root.join(&key[0..2]).join(&key[2..4])
        } else {
            self.root.clone()
        };
        dir.join(format!("{key}.{ENTRY_EXTENSION}"))
    }

    /// Walk the store and tally completed entries. Leftover temp files are ignored.
    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        if !self.root.exists() {
            return stats;
        }
        for entry in WalkDir::new(&self.root).into_iter().filter_map(|e| e.ok()) {
            let is_entry = entry.file_type().is_file()
                && entry.path().extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION);
            if !is_entry {
                continue;
            }
            stats.entries += 1;
            stats.total_bytes += entry.metadata().map(|m| m.len()).unwrap_or(0);
        }
        stats
    }
}

impl CacheStore for FsCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Cache(format!("{}: {}", path.display(), e))),
        }
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path_for(key);
        let dir = path.parent().unwrap_or(&self.root);
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::Cache(format!("{}: {}", dir.display(), e)))?;

        // Write beside the target, then rename into place. Concurrent writers
        // of the same key race harmlessly; the last rename wins.
        let mut tmp = tempfile::Builder::new()
            .prefix(".partial-")
            .tempfile_in(dir)
            .map_err(|e| Error::Cache(format!("{}: {}", dir.display(), e)))?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| Error::Cache(format!("{}: {}", tmp.path().display(), e)))?;
        tmp.persist(&path)
            .map_err(|e| Error::Cache(format!("{}: {}", path.display(), e.error)))?;
        Ok(())
    }
}

/// Process-local cache, for tests and short-lived callers.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| Error::Cache("memory cache poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Cache("memory cache poisoned".into()))?;
        entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}
