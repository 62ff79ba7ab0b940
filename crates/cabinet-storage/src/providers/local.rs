//! Local filesystem object store.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::StreamExt;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::debug;

use cabinet_core::error::{AppError, ErrorKind};
use cabinet_core::result::AppResult;
use cabinet_core::traits::storage::{ByteStream, ObjectMeta, ObjectStore};

/// Object store mapping keys to files below a root directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    /// Root directory for all stored blobs.
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create a new local store rooted at the given path.
    pub async fn new(root_path: &str) -> AppResult<Self> {
        let root = PathBuf::from(root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::StoreUnavailable,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// Resolve a key to an absolute path within the root.
    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        let clean = key.trim_start_matches('/');
        if clean.split('/').any(|seg| seg == "..") {
            return Err(AppError::validation(format!("Invalid object key: {key}")));
        }
        Ok(self.root.join(clean))
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::StoreUnavailable,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }
}

fn io_error(e: std::io::Error, action: &str, key: &str) -> AppError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AppError::not_found(format!("Blob not found: {key}"))
    } else {
        AppError::with_source(
            ErrorKind::StoreUnavailable,
            format!("Failed to {action}: {key}"),
            e,
        )
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn get(&self, key: &str) -> AppResult<Bytes> {
        let path = self.resolve(key)?;
        let data = fs::read(&path).await.map_err(|e| io_error(e, "read", key))?;
        Ok(Bytes::from(data))
    }

    async fn download_range(&self, key: &str, start: u64, end: u64) -> AppResult<Bytes> {
        let path = self.resolve(key)?;
        let mut file = fs::File::open(&path)
            .await
            .map_err(|e| io_error(e, "open", key))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| io_error(e, "stat", key))?
            .len();
        let end = end.min(len);
        let start = start.min(end);

        file.seek(SeekFrom::Start(start))
            .await
            .map_err(|e| io_error(e, "seek", key))?;
        let mut buf = vec![0u8; (end - start) as usize];
        file.read_exact(&mut buf)
            .await
            .map_err(|e| io_error(e, "read range", key))?;
        Ok(Bytes::from(buf))
    }

    async fn upload(&self, key: &str, mut stream: ByteStream) -> AppResult<u64> {
        let path = self.resolve(key)?;
        self.ensure_parent(&path).await?;

        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| io_error(e, "create", key))?;

        let mut total_bytes = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                AppError::with_source(ErrorKind::StoreUnavailable, "Upload stream error", e)
            })?;
            total_bytes += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(|e| io_error(e, "write", key))?;
        }

        file.flush().await.map_err(|e| io_error(e, "flush", key))?;

        debug!(key, bytes = total_bytes, "Wrote blob from stream");
        Ok(total_bytes)
    }

    async fn rename(&self, from: &str, to: &str) -> AppResult<()> {
        let from_path = self.resolve(from)?;
        let to_path = self.resolve(to)?;
        self.ensure_parent(&to_path).await?;

        fs::rename(&from_path, &to_path)
            .await
            .map_err(|e| io_error(e, "rename", from))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(e, "delete", key)),
        }
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let path = self.resolve(key)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| io_error(e, "stat", key))
    }

    async fn metadata(&self, key: &str) -> AppResult<ObjectMeta> {
        let path = self.resolve(key)?;
        let meta = fs::metadata(&path)
            .await
            .map_err(|e| io_error(e, "stat", key))?;
        if meta.is_dir() {
            return Err(AppError::not_found(format!("Not a blob: {key}")));
        }

        let last_modified = meta.modified().ok().map(chrono::DateTime::<chrono::Utc>::from);

        Ok(ObjectMeta {
            key: key.to_string(),
            size_bytes: meta.len(),
            last_modified,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_chunk(data: &'static str) -> ByteStream {
        Box::pin(futures::stream::once(async move {
            Ok::<_, std::io::Error>(Bytes::from(data))
        }))
    }

    #[tokio::test]
    async fn test_upload_range_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().to_str().unwrap())
            .await
            .unwrap();

        let written = store
            .upload("3/8/11-notes.txt", single_chunk("hello world"))
            .await
            .unwrap();
        assert_eq!(written, 11);
        assert_eq!(store.metadata("3/8/11-notes.txt").await.unwrap().size_bytes, 11);

        let part = store.download_range("3/8/11-notes.txt", 0, 5).await.unwrap();
        assert_eq!(part, Bytes::from("hello"));

        store.delete("3/8/11-notes.txt").await.unwrap();
        assert!(!store.exists("3/8/11-notes.txt").await.unwrap());
        // deleting twice is fine
        store.delete("3/8/11-notes.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_rename_creates_target_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().to_str().unwrap())
            .await
            .unwrap();

        store.upload("1/4-a.txt", single_chunk("a")).await.unwrap();
        store.rename("1/4-a.txt", "2/9/4-a.txt").await.unwrap();

        assert!(!store.exists("1/4-a.txt").await.unwrap());
        assert_eq!(store.get("2/9/4-a.txt").await.unwrap(), Bytes::from("a"));
    }

    #[tokio::test]
    async fn test_missing_blob_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().to_str().unwrap())
            .await
            .unwrap();

        let err = store.get("nope").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_rejects_parent_segments() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().to_str().unwrap())
            .await
            .unwrap();

        let err = store.get("../etc/passwd").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
