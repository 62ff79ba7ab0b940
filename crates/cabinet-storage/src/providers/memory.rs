//! In-memory object store.
//!
//! Used for dry runs and tests. Supports fault injection: keys registered
//! with [`MemoryObjectStore::fail_rename_from`] make `rename` fail with
//! `StoreUnavailable`, and `set_offline` fails every call.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::stream::StreamExt;
use tracing::debug;

use cabinet_core::error::AppError;
use cabinet_core::result::AppResult;
use cabinet_core::traits::storage::{ByteStream, ObjectMeta, ObjectStore};

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Bytes,
    modified: DateTime<Utc>,
}

/// Object store backed by a concurrent hash map.
#[derive(Debug, Clone, Default)]
pub struct MemoryObjectStore {
    blobs: Arc<DashMap<String, StoredBlob>>,
    failing_renames: Arc<Mutex<HashSet<String>>>,
    offline: Arc<AtomicBool>,
    rename_calls: Arc<AtomicU64>,
}

impl MemoryObjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a blob directly, bypassing the upload path.
    pub fn insert(&self, key: &str, data: impl Into<Bytes>) {
        self.blobs.insert(
            key.to_string(),
            StoredBlob {
                data: data.into(),
                modified: Utc::now(),
            },
        );
    }

    /// Make every rename whose source is `key` fail.
    pub fn fail_rename_from(&self, key: &str) {
        if let Ok(mut keys) = self.failing_renames.lock() {
            keys.insert(key.to_string());
        }
    }

    /// Toggle a simulated outage for all operations.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of rename calls received, including failed ones.
    pub fn rename_calls(&self) -> u64 {
        self.rename_calls.load(Ordering::SeqCst)
    }

    /// All keys currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    fn check_online(&self) -> AppResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::store_unavailable("Memory store is offline"));
        }
        Ok(())
    }

    fn blob(&self, key: &str) -> AppResult<StoredBlob> {
        self.blobs
            .get(key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AppError::not_found(format!("Blob not found: {key}")))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> AppResult<Bytes> {
        self.check_online()?;
        Ok(self.blob(key)?.data)
    }

    async fn download_range(&self, key: &str, start: u64, end: u64) -> AppResult<Bytes> {
        self.check_online()?;
        let data = self.blob(key)?.data;
        let len = data.len() as u64;
        let end = end.min(len);
        let start = start.min(end);
        Ok(data.slice(start as usize..end as usize))
    }

    async fn upload(&self, key: &str, mut stream: ByteStream) -> AppResult<u64> {
        self.check_online()?;
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        let written = buf.len() as u64;
        self.insert(key, buf.freeze());
        debug!(key, bytes = written, "Stored blob in memory");
        Ok(written)
    }

    async fn rename(&self, from: &str, to: &str) -> AppResult<()> {
        self.rename_calls.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let failing = self
            .failing_renames
            .lock()
            .map(|keys| keys.contains(from))
            .unwrap_or(false);
        if failing {
            return Err(AppError::store_unavailable(format!(
                "Injected rename failure for {from}"
            )));
        }
        let blob = self.blob(from)?;
        self.blobs.insert(to.to_string(), blob);
        self.blobs.remove(from);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.check_online()?;
        self.blobs.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.check_online()?;
        Ok(self.blobs.contains_key(key))
    }

    async fn metadata(&self, key: &str) -> AppResult<ObjectMeta> {
        self.check_online()?;
        let blob = self.blob(key)?;
        Ok(ObjectMeta {
            key: key.to_string(),
            size_bytes: blob.data.len() as u64,
            last_modified: Some(blob.modified),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabinet_core::error::ErrorKind;

    #[tokio::test]
    async fn test_range_is_clamped() {
        let store = MemoryObjectStore::new();
        store.insert("1/2-a.txt", "hello world");

        let part = store.download_range("1/2-a.txt", 6, 100).await.unwrap();
        assert_eq!(part, Bytes::from("world"));

        let empty = store.download_range("1/2-a.txt", 50, 60).await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_injected_rename_failure_keeps_source() {
        let store = MemoryObjectStore::new();
        store.insert("1/5-b.txt", "b");
        store.fail_rename_from("1/5-b.txt");

        let err = store.rename("1/5-b.txt", "2/5-b.txt").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::StoreUnavailable);
        assert!(store.exists("1/5-b.txt").await.unwrap());
        assert!(!store.exists("2/5-b.txt").await.unwrap());
        assert_eq!(store.rename_calls(), 1);
    }

    #[tokio::test]
    async fn test_offline_fails_everything() {
        let store = MemoryObjectStore::new();
        store.insert("k", "v");
        store.set_offline(true);
        assert!(store.get("k").await.is_err());
        store.set_offline(false);
        assert_eq!(store.get("k").await.unwrap(), Bytes::from("v"));
    }
}
