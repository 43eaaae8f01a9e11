//! Implements FetchCachePort using a JSON file.
//!
//! Maps request fingerprints to the last successful fetch for change detection.

use crate::domain::{CacheEntry, DomainError};
use crate::ports::FetchCachePort;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// On-disk layout: fingerprint -> entry
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheData {
    entries: BTreeMap<String, CacheEntry>,
}

/// JSON file-based fetch cache. Writes are buffered until `flush`.
pub struct JsonFetchCache {
    path: PathBuf,
    cache: RwLock<CacheData>,
}

impl JsonFetchCache {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cache: RwLock::new(CacheData::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load entries from disk. A missing file is an empty cache; a corrupt one
    /// is logged and replaced on the next flush.
    pub async fn load(&self) -> Result<(), DomainError> {
        let data = match fs::read_to_string(&self.path).await {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "fetch cache unreadable, starting empty");
                CacheData::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheData::default(),
            Err(e) => return Err(DomainError::Cache(format!("read {}: {}", self.path.display(), e))),
        };
        debug!(entries = data.entries.len(), "fetch cache loaded");
        *self.cache.write().await = data;
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.cache.read().await.entries.len()
    }

    /// Atomic write-replace: temp file, sync_all, rename over the target.
    async fn save(&self) -> Result<(), DomainError> {
        let data = self.cache.read().await;
        let json =
            serde_json::to_string_pretty(&*data).map_err(|e| DomainError::Cache(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::Cache(format!("create cache dir: {}", e)))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&temp_path)
            .await
            .map_err(|e| DomainError::Cache(format!("create temp file: {}", e)))?;
        f.write_all(json.as_bytes())
            .await
            .map_err(|e| DomainError::Cache(format!("write temp file: {}", e)))?;
        f.sync_all()
            .await
            .map_err(|e| DomainError::Cache(format!("sync temp file: {}", e)))?;
        drop(f);

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| DomainError::Cache(format!("atomic rename failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl FetchCachePort for JsonFetchCache {
    async fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>, DomainError> {
        Ok(self.cache.read().await.entries.get(fingerprint).cloned())
    }

    async fn put(&self, fingerprint: &str, entry: CacheEntry) -> Result<(), DomainError> {
        self.cache
            .write()
            .await
            .entries
            .insert(fingerprint.to_string(), entry);
        Ok(())
    }

    async fn flush(&self) -> Result<(), DomainError> {
        self.save().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(hash: &str) -> CacheEntry {
        CacheEntry {
            content_hash: hash.to_string(),
            endpoint: "/orario-lezioni/@@orario_reale_json".to_string(),
            event_count: 3,
            fetched_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = JsonFetchCache::new(dir.path().join("nope.json"));
        cache.load().await.unwrap();
        assert_eq!(cache.len().await, 0);
        assert!(cache.get("x").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_flush_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let cache = JsonFetchCache::new(&path);
        cache.put("fp1", entry("abc")).await.unwrap();
        cache.flush().await.unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let reloaded = JsonFetchCache::new(&path);
        reloaded.load().await.unwrap();
        assert_eq!(reloaded.get("fp1").await.unwrap().unwrap().content_hash, "abc");
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{ not json").unwrap();
        let cache = JsonFetchCache::new(&path);
        cache.load().await.unwrap();
        assert_eq!(cache.len().await, 0);
    }
}
