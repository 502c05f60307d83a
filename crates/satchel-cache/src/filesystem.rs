//! Filesystem-backed cache storage.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<partition>-<digest>/partition.json      name + creation time
//! <root>/<partition>-<digest>/entries/<sha256>.json
//! ```

use crate::keys::{ensure_cacheable, entry_digest, partition_dir_name};
use crate::types::StoredEntry;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use satchel_core::ports::{Cache, CacheStorage};
use satchel_core::{Error, Request, Response, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

const META_FILE: &str = "partition.json";
const ENTRIES_DIR: &str = "entries";

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
struct PartitionMeta {
    name: String,
    created_at: DateTime<Utc>,
}

fn storage_err(action: &str, path: &Path, err: std::io::Error) -> Error {
    Error::Storage(format!("Failed to {} {}: {}", action, path.display(), err))
}

/// Write `bytes` to `path` through a sibling temp file and a rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_extension(format!("tmp{}-{}", std::process::id(), seq));
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| storage_err("write", &tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| storage_err("rename", path, e))
}

/// One partition directory.
pub struct FilesystemCache {
    name: String,
    entries_dir: PathBuf,
}

impl FilesystemCache {
    fn entry_path(&self, request: &Request) -> PathBuf {
        self.entries_dir.join(format!("{}.json", entry_digest(request)))
    }

    async fn read_entry(&self, path: &Path) -> Result<Option<StoredEntry>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_err("read", path, e)),
        }
    }
}

#[async_trait]
impl Cache for FilesystemCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, request: &Request) -> Result<Option<Response>> {
        let entry = self.read_entry(&self.entry_path(request)).await?;
        Ok(entry
            .filter(|e| e.request.cache_key() == request.cache_key())
            .map(|e| e.response))
    }

    async fn put(&self, request: &Request, response: &Response) -> Result<()> {
        ensure_cacheable(request)?;
        tokio::fs::create_dir_all(&self.entries_dir)
            .await
            .map_err(|e| storage_err("create", &self.entries_dir, e))?;

        let entry = StoredEntry::new(request.clone(), response.clone());
        let bytes = serde_json::to_vec(&entry)?;
        write_atomic(&self.entry_path(request), &bytes).await?;

        debug!(partition = %self.name, url = %request.url, bytes = bytes.len(), "Stored entry");
        Ok(())
    }

    async fn delete(&self, request: &Request) -> Result<bool> {
        let path = self.entry_path(request);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(storage_err("delete", &path, e)),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        if !self.entries_dir.exists() {
            return Ok(vec![]);
        }

        let mut keys = vec![];
        let mut read_dir = tokio::fs::read_dir(&self.entries_dir)
            .await
            .map_err(|e| storage_err("list", &self.entries_dir, e))?;

        while let Some(dir_entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| storage_err("list", &self.entries_dir, e))?
        {
            let path = dir_entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match self.read_entry(&path).await {
                Ok(Some(entry)) => keys.push(entry.request.cache_key()),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable entry"),
            }
        }

        keys.sort();
        Ok(keys)
    }
}

/// Partitions persisted as directories under a root.
#[derive(Debug, Clone)]
pub struct FilesystemCacheStorage {
    root_dir: PathBuf,
}

impl FilesystemCacheStorage {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Platform cache directory for Satchel, if one can be determined.
    pub fn default_root() -> Option<PathBuf> {
        directories::ProjectDirs::from("school", "satchel", "satchel")
            .map(|dirs| dirs.cache_dir().join("partitions"))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn partition_dir(&self, name: &str) -> PathBuf {
        self.root_dir.join(partition_dir_name(name))
    }

    async fn read_meta(dir: &Path) -> Option<PartitionMeta> {
        let bytes = tokio::fs::read(dir.join(META_FILE)).await.ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn handle(&self, name: &str) -> Arc<FilesystemCache> {
        Arc::new(FilesystemCache {
            name: name.to_string(),
            entries_dir: self.partition_dir(name).join(ENTRIES_DIR),
        })
    }
}

#[async_trait]
impl CacheStorage for FilesystemCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>> {
        let dir = self.partition_dir(name);
        if Self::read_meta(&dir).await.is_none() {
            tokio::fs::create_dir_all(dir.join(ENTRIES_DIR))
                .await
                .map_err(|e| storage_err("create", &dir, e))?;
            let meta = PartitionMeta {
                name: name.to_string(),
                created_at: Utc::now(),
            };
            write_atomic(&dir.join(META_FILE), &serde_json::to_vec(&meta)?).await?;
            debug!(partition = %name, dir = %dir.display(), "Created partition");
        }
        Ok(self.handle(name))
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(Self::read_meta(&self.partition_dir(name)).await.is_some())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let dir = self.partition_dir(name);
        if !dir.exists() {
            return Ok(false);
        }
        tokio::fs::remove_dir_all(&dir)
            .await
            .map_err(|e| storage_err("delete", &dir, e))?;
        Ok(true)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        if !self.root_dir.exists() {
            return Ok(vec![]);
        }

        let mut partitions = vec![];
        let mut read_dir = tokio::fs::read_dir(&self.root_dir)
            .await
            .map_err(|e| storage_err("list", &self.root_dir, e))?;

        while let Some(dir_entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| storage_err("list", &self.root_dir, e))?
        {
            if let Some(meta) = Self::read_meta(&dir_entry.path()).await {
                partitions.push(meta);
            }
        }

        // Creation order, matching the in-memory storage.
        partitions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.name.cmp(&b.name)));
        Ok(partitions.into_iter().map(|m| m.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(path: &str) -> Request {
        Request::parse_get(&format!("https://app.example.org{}", path)).unwrap()
    }

    #[tokio::test]
    async fn test_put_get_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();

        let storage = FilesystemCacheStorage::new(dir.path());
        let cache = storage.open("satchel-dynamic-v1.0.0").await.unwrap();
        cache
            .put(&req("/"), &Response::ok("<html>").with_header("Content-Type", "text/html"))
            .await
            .unwrap();

        let reopened = FilesystemCacheStorage::new(dir.path());
        let cache = reopened.open("satchel-dynamic-v1.0.0").await.unwrap();
        let response = cache.get(&req("/")).await.unwrap().unwrap();
        assert_eq!(response.text(), "<html>");
        assert_eq!(response.header("content-type"), Some("text/html"));
    }

    #[tokio::test]
    async fn test_keys_lists_request_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemCacheStorage::new(dir.path());
        let cache = storage.open("p").await.unwrap();

        cache.put(&req("/a"), &Response::ok("a")).await.unwrap();
        cache.put(&req("/b"), &Response::ok("b")).await.unwrap();
        cache.put(&req("/a"), &Response::ok("a2")).await.unwrap();

        assert_eq!(
            cache.keys().await.unwrap(),
            vec![
                "GET https://app.example.org/a".to_string(),
                "GET https://app.example.org/b".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_partition_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemCacheStorage::new(dir.path());

        assert!(storage.keys().await.unwrap().is_empty());
        storage.open("satchel-static-v1.0.0").await.unwrap();
        storage.open("satchel-static-v0.9.0").await.unwrap();
        assert!(storage.has("satchel-static-v0.9.0").await.unwrap());
        assert_eq!(storage.keys().await.unwrap().len(), 2);

        assert!(storage.delete("satchel-static-v0.9.0").await.unwrap());
        assert!(!storage.delete("satchel-static-v0.9.0").await.unwrap());
        assert_eq!(storage.keys().await.unwrap(), vec!["satchel-static-v1.0.0"]);
    }

    #[tokio::test]
    async fn test_delete_entry() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemCacheStorage::new(dir.path());
        let cache = storage.open("p").await.unwrap();

        cache.put(&req("/a"), &Response::ok("a")).await.unwrap();
        assert!(cache.delete(&req("/a")).await.unwrap());
        assert!(!cache.delete(&req("/a")).await.unwrap());
        assert!(cache.get(&req("/a")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_names_that_sanitize_alike_are_separate_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemCacheStorage::new(dir.path());

        let slashed = storage.open("shell/v1").await.unwrap();
        slashed.put(&req("/"), &Response::ok("A")).await.unwrap();
        let underscored = storage.open("shell_v1").await.unwrap();
        assert!(underscored.get(&req("/")).await.unwrap().is_none());

        assert!(storage.delete("shell_v1").await.unwrap());
        assert_eq!(storage.keys().await.unwrap(), vec!["shell/v1"]);
        let kept = storage.open("shell/v1").await.unwrap();
        assert_eq!(kept.get(&req("/")).await.unwrap().unwrap().text(), "A");
    }

    #[tokio::test]
    async fn test_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemCacheStorage::new(dir.path().join("not-there"));
        assert!(storage.keys().await.unwrap().is_empty());
        assert!(!storage.has("anything").await.unwrap());
    }
}
