//! In-memory cache storage.

use crate::keys::ensure_cacheable;
use crate::types::StoredEntry;
use async_trait::async_trait;
use satchel_core::ports::{Cache, CacheStorage};
use satchel_core::{Request, Response, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// A single in-memory partition.
pub struct MemoryCache {
    name: String,
    entries: RwLock<BTreeMap<String, StoredEntry>>,
}

impl MemoryCache {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Full stored entry, including insertion time.
    pub async fn entry(&self, request: &Request) -> Option<StoredEntry> {
        self.entries.read().await.get(&request.cache_key()).cloned()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, request: &Request) -> Result<Option<Response>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&request.cache_key())
            .map(|entry| entry.response.clone()))
    }

    async fn put(&self, request: &Request, response: &Response) -> Result<()> {
        ensure_cacheable(request)?;
        let entry = StoredEntry::new(request.clone(), response.clone());
        self.entries.write().await.insert(request.cache_key(), entry);
        debug!(partition = %self.name, url = %request.url, "Stored entry");
        Ok(())
    }

    async fn delete(&self, request: &Request) -> Result<bool> {
        Ok(self
            .entries
            .write()
            .await
            .remove(&request.cache_key())
            .is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

/// Partitions held in process memory, listed in creation order.
#[derive(Clone, Default)]
pub struct MemoryCacheStorage {
    partitions: Arc<RwLock<Vec<Arc<MemoryCache>>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Typed handle to an existing partition.
    pub async fn partition(&self, name: &str) -> Option<Arc<MemoryCache>> {
        self.partitions
            .read()
            .await
            .iter()
            .find(|p| p.name == name)
            .cloned()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn Cache>> {
        if let Some(existing) = self.partition(name).await {
            return Ok(existing);
        }

        let mut partitions = self.partitions.write().await;
        // Another caller may have created it between the two locks.
        if let Some(existing) = partitions.iter().find(|p| p.name == name) {
            return Ok(existing.clone());
        }
        let created = Arc::new(MemoryCache::new(name));
        partitions.push(created.clone());
        debug!(partition = %name, "Created partition");
        Ok(created)
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(self.partition(name).await.is_some())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        let mut partitions = self.partitions.write().await;
        let before = partitions.len();
        partitions.retain(|p| p.name != name);
        Ok(partitions.len() != before)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self
            .partitions
            .read()
            .await
            .iter()
            .map(|p| p.name.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satchel_core::Method;

    fn req(path: &str) -> Request {
        Request::parse_get(&format!("https://app.example.org{}", path)).unwrap()
    }

    #[tokio::test]
    async fn test_open_creates_once() {
        let storage = MemoryCacheStorage::new();
        storage.open("a").await.unwrap();
        storage.open("a").await.unwrap();
        storage.open("b").await.unwrap();
        assert_eq!(storage.keys().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let storage = MemoryCacheStorage::new();
        let cache = storage.open("dyn").await.unwrap();

        cache.put(&req("/"), &Response::ok("one")).await.unwrap();
        cache.put(&req("/"), &Response::ok("two")).await.unwrap();

        let stored = cache.get(&req("/")).await.unwrap().unwrap();
        assert_eq!(stored.text(), "two");
        assert_eq!(cache.keys().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_put_rejects_non_get() {
        let storage = MemoryCacheStorage::new();
        let cache = storage.open("dyn").await.unwrap();
        let post = req("/form").with_method(Method::Post);
        assert!(cache.put(&post, &Response::ok("")).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_partition() {
        let storage = MemoryCacheStorage::new();
        storage.open("old").await.unwrap();

        assert!(storage.delete("old").await.unwrap());
        assert!(!storage.delete("old").await.unwrap());
        assert!(!storage.has("old").await.unwrap());
    }

    #[tokio::test]
    async fn test_match_any_searches_all_partitions() {
        let storage = MemoryCacheStorage::new();
        storage.open("first").await.unwrap();
        let second = storage.open("second").await.unwrap();
        second.put(&req("/"), &Response::ok("root")).await.unwrap();

        let found = storage.match_any(&req("/")).await.unwrap().unwrap();
        assert_eq!(found.text(), "root");
        assert!(storage.match_any(&req("/missing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entry_records_insertion_time() {
        let storage = MemoryCacheStorage::new();
        storage.open("dyn").await.unwrap();
        let cache = storage.partition("dyn").await.unwrap();

        let before = chrono::Utc::now();
        cache.put(&req("/a"), &Response::ok("a")).await.unwrap();
        let entry = cache.entry(&req("/a")).await.unwrap();
        assert!(entry.stored_at >= before);
    }
}
