//! The single entry point to the blob store.
//!
//! Everything above the storage crate talks to blobs through
//! [`ObjectStoreGateway`]; it adds logging and chunked reads on top of an
//! [`ObjectStore`] backend.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use cabinet_core::result::AppResult;
use cabinet_core::traits::storage::{ByteStream, ObjectStore};

/// Split `0..size` into consecutive half-open ranges of at most `chunk` bytes.
pub fn chunk_ranges(size: u64, chunk: u64) -> Vec<(u64, u64)> {
    let chunk = chunk.max(1);
    let mut ranges = Vec::with_capacity(size.div_ceil(chunk) as usize);
    let mut start = 0;
    while start < size {
        let end = (start + chunk).min(size);
        ranges.push((start, end));
        start = end;
    }
    ranges
}

/// Logged, chunk-aware access to an object store.
#[derive(Debug, Clone)]
pub struct ObjectStoreGateway {
    store: Arc<dyn ObjectStore>,
    chunk_size: u64,
}

impl ObjectStoreGateway {
    /// Wrap a backend. `chunk_size` bounds each ranged read.
    pub fn new(store: Arc<dyn ObjectStore>, chunk_size: u64) -> Self {
        Self {
            store,
            chunk_size: chunk_size.max(1),
        }
    }

    /// The backend's provider name.
    pub fn provider_type(&self) -> &str {
        self.store.provider_type()
    }

    /// Configured ranged-read chunk size.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Read a whole blob.
    pub async fn get_blob(&self, key: &str) -> AppResult<Bytes> {
        debug!(key, "get_blob");
        self.store.get(key).await.inspect_err(|e| {
            warn!(key, error = %e, "get_blob failed");
        })
    }

    /// Move a blob to a new key (copy + delete, not atomic).
    pub async fn rename_blob(&self, old_key: &str, new_key: &str) -> AppResult<()> {
        debug!(old_key, new_key, "rename_blob");
        self.store.rename(old_key, new_key).await.inspect_err(|e| {
            warn!(old_key, new_key, error = %e, "rename_blob failed");
        })
    }

    /// Stream bytes into a blob.
    pub async fn upload_blob(&self, key: &str, stream: ByteStream) -> AppResult<u64> {
        debug!(key, "upload_blob");
        self.store.upload(key, stream).await.inspect_err(|e| {
            warn!(key, error = %e, "upload_blob failed");
        })
    }

    /// Upload an in-memory buffer.
    pub async fn upload_bytes(&self, key: &str, data: Bytes) -> AppResult<u64> {
        let stream: ByteStream = Box::pin(futures::stream::once(async move {
            Ok::<_, std::io::Error>(data)
        }));
        self.upload_blob(key, stream).await
    }

    /// Read `start..end` of a blob (end exclusive).
    pub async fn download_range(&self, key: &str, start: u64, end: u64) -> AppResult<Bytes> {
        debug!(key, start, end, "download_range");
        self.store
            .download_range(key, start, end)
            .await
            .inspect_err(|e| {
                warn!(key, start, end, error = %e, "download_range failed");
            })
    }

    /// Read a whole blob using ranged requests of `chunk_size` bytes.
    pub async fn download_chunked(&self, key: &str) -> AppResult<Bytes> {
        let size = self.blob_size(key).await?;
        let mut buf = BytesMut::with_capacity(size as usize);
        for (start, end) in chunk_ranges(size, self.chunk_size) {
            buf.extend_from_slice(&self.download_range(key, start, end).await?);
        }
        Ok(buf.freeze())
    }

    /// Check whether a blob exists.
    pub async fn exists(&self, key: &str) -> AppResult<bool> {
        debug!(key, "exists");
        self.store.exists(key).await.inspect_err(|e| {
            warn!(key, error = %e, "exists failed");
        })
    }

    /// Delete a blob; missing keys are ignored.
    pub async fn delete_blob(&self, key: &str) -> AppResult<()> {
        debug!(key, "delete_blob");
        self.store.delete(key).await.inspect_err(|e| {
            warn!(key, error = %e, "delete_blob failed");
        })
    }

    /// Byte length of a blob.
    pub async fn blob_size(&self, key: &str) -> AppResult<u64> {
        debug!(key, "blob_size");
        self.store
            .metadata(key)
            .await
            .map(|meta| meta.size_bytes)
            .inspect_err(|e| {
                warn!(key, error = %e, "blob_size failed");
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MemoryObjectStore;
    use cabinet_core::error::ErrorKind;

    #[test]
    fn test_chunk_ranges() {
        assert!(chunk_ranges(0, 4).is_empty());
        assert_eq!(chunk_ranges(4, 4), vec![(0, 4)]);
        assert_eq!(chunk_ranges(10, 4), vec![(0, 4), (4, 8), (8, 10)]);
        // zero chunk size degrades to single bytes instead of looping forever
        assert_eq!(chunk_ranges(2, 0), vec![(0, 1), (1, 2)]);
    }

    #[tokio::test]
    async fn test_download_chunked_reassembles() {
        let store = MemoryObjectStore::new();
        store.insert("1/3-report.txt", "abcdefghij");
        let gateway = ObjectStoreGateway::new(Arc::new(store), 3);

        let data = gateway.download_chunked("1/3-report.txt").await.unwrap();
        assert_eq!(data, Bytes::from("abcdefghij"));
        assert_eq!(gateway.blob_size("1/3-report.txt").await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_upload_then_rename() {
        let store = MemoryObjectStore::new();
        let gateway = ObjectStoreGateway::new(Arc::new(store.clone()), 1024);

        let written = gateway
            .upload_bytes("1/4-a.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        assert_eq!(written, 5);

        gateway.rename_blob("1/4-a.txt", "2/4-a.txt").await.unwrap();
        assert_eq!(store.keys(), vec!["2/4-a.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_blob_size_is_not_found() {
        let gateway = ObjectStoreGateway::new(Arc::new(MemoryObjectStore::new()), 16);
        let err = gateway.blob_size("missing").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }
}
