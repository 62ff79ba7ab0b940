//! Object store trait for pluggable blob backends.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::result::AppResult;

/// Metadata about a stored blob.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ObjectMeta {
    /// Key within the store.
    pub key: String,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Last modified timestamp.
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

/// A byte stream type used for reading and uploading blob contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Key-addressed blob store.
///
/// Implementations exist for an in-memory map, the local filesystem, and
/// S3-compatible buckets. Every operation may fail with
/// `ErrorKind::StoreUnavailable` or `ErrorKind::NotFound`.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "memory", "s3").
    fn provider_type(&self) -> &str;

    /// Read a whole blob into memory.
    async fn get(&self, key: &str) -> AppResult<Bytes>;

    /// Read bytes `start..end` of a blob. `end` is exclusive and clamped to
    /// the blob length.
    async fn download_range(&self, key: &str, start: u64, end: u64) -> AppResult<Bytes>;

    /// Write a byte stream to a blob, returning the number of bytes written.
    async fn upload(&self, key: &str, stream: ByteStream) -> AppResult<u64>;

    /// Move a blob to a new key. Providers implement this as copy + delete,
    /// so a failure may leave the source, the target, or both in place.
    async fn rename(&self, from: &str, to: &str) -> AppResult<()>;

    /// Delete a blob. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> AppResult<()>;

    /// Check whether a blob exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Fetch blob metadata.
    async fn metadata(&self, key: &str) -> AppResult<ObjectMeta>;
}
