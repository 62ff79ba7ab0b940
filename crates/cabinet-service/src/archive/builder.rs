//! Streams ZIP archives of planned entries.
//!
//! The archive is produced lazily: each poll writes at most one blob chunk
//! into the ZIP encoder and yields whatever bytes the encoder emitted. Blob
//! contents are fetched in ranges of the gateway's chunk size, so memory
//! use is bounded by one chunk plus the encoder's window.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use chrono::{DateTime, Datelike, Timelike, Utc};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::io::StreamReader;
use tracing::{debug, info, warn};
use zip::write::{SimpleFileOptions, StreamWriter};
use zip::{CompressionMethod, ZipWriter};

use cabinet_core::config::archive::ArchiveCompression;
use cabinet_core::error::AppError;
use cabinet_core::result::AppResult;
use cabinet_storage::ObjectStoreGateway;
use cabinet_storage::gateway::chunk_ranges;

use super::planner::{ArchiveEntry, ArchivePlan};

/// Archive bytes as they are produced.
pub type ArchiveStream = BoxStream<'static, AppResult<Bytes>>;

/// Write target shared between the encoder and the stream.
#[derive(Debug, Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn take(&self) -> Bytes {
        match self.0.lock() {
            Ok(mut buf) => Bytes::from(std::mem::take(&mut *buf)),
            Err(_) => Bytes::new(),
        }
    }
}

impl Write for SharedBuf {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("archive buffer poisoned"))?
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Blob currently being copied into the archive.
struct PendingBlob {
    key: String,
    ranges: VecDeque<(u64, u64)>,
}

struct BuildState {
    gateway: ObjectStoreGateway,
    method: CompressionMethod,
    zip: Option<ZipWriter<StreamWriter<SharedBuf>>>,
    buf: SharedBuf,
    entries: std::vec::IntoIter<(String, ArchiveEntry)>,
    pending: Option<PendingBlob>,
    name: String,
    written: u64,
}

fn zip_time(at: DateTime<Utc>) -> zip::DateTime {
    // archives cannot represent dates before 1980; those fall back to the epoch
    zip::DateTime::from_date_and_time(
        u16::try_from(at.year()).unwrap_or(1980),
        at.month() as u8,
        at.day() as u8,
        at.hour() as u8,
        at.minute() as u8,
        at.second() as u8,
    )
    .unwrap_or_default()
}

fn archive_err(context: &str, e: impl std::fmt::Display) -> AppError {
    AppError::archive(format!("{context}: {e}"))
}

impl BuildState {
    fn writer(&mut self) -> AppResult<&mut ZipWriter<StreamWriter<SharedBuf>>> {
        self.zip
            .as_mut()
            .ok_or_else(|| AppError::internal("archive already finished"))
    }

    /// Advance by one unit of work. Returns false once the archive is
    /// complete.
    async fn step(&mut self) -> AppResult<bool> {
        if let Some(mut blob) = self.pending.take() {
            if let Some((start, end)) = blob.ranges.pop_front() {
                let chunk = self.gateway.download_range(&blob.key, start, end).await?;
                self.writer()?
                    .write_all(&chunk)
                    .map_err(|e| archive_err("Failed to write entry data", e))?;
                self.pending = Some(blob);
            }
            return Ok(true);
        }

        let Some((name, entry)) = self.entries.next() else {
            return match self.zip.take() {
                Some(zip) => {
                    zip.finish()?;
                    Ok(true)
                }
                None => Ok(false),
            };
        };

        let options = SimpleFileOptions::default()
            .compression_method(self.method)
            .last_modified_time(zip_time(entry.modified));

        match entry.remote_key {
            None => {
                self.writer()?.add_directory(name.as_str(), options)?;
                debug!(entry = %name, "Archive directory entry");
            }
            Some(key) => {
                let size = self.gateway.blob_size(&key).await?;
                let options = options.large_file(size >= u64::from(u32::MAX));
                self.writer()?.start_file(name.as_str(), options)?;
                debug!(entry = %name, key = %key, size, "Archive file entry");
                self.pending = Some(PendingBlob {
                    ranges: chunk_ranges(size, self.gateway.chunk_size()).into(),
                    key,
                });
            }
        }
        Ok(true)
    }
}

/// Streams [`ArchivePlan`]s as ZIP bytes.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    gateway: ObjectStoreGateway,
    compression: ArchiveCompression,
}

impl ArchiveBuilder {
    /// Create a builder reading blobs through `gateway`.
    pub fn new(gateway: ObjectStoreGateway, compression: ArchiveCompression) -> Self {
        Self {
            gateway,
            compression,
        }
    }

    /// Lazily encode `plan`. A blob that cannot be read ends the stream
    /// with its error.
    pub fn build(&self, plan: ArchivePlan) -> ArchiveStream {
        let buf = SharedBuf::default();
        let entries: Vec<(String, ArchiveEntry)> = plan
            .entries
            .iter()
            .map(|entry| (plan.entry_name(entry), entry.clone()))
            .collect();
        info!(archive = %plan.file_name(), entries = entries.len(), "Building archive");

        let state = BuildState {
            gateway: self.gateway.clone(),
            method: match self.compression {
                ArchiveCompression::Deflated => CompressionMethod::Deflated,
                ArchiveCompression::Stored => CompressionMethod::Stored,
            },
            zip: Some(ZipWriter::new_stream(buf.clone())),
            buf,
            entries: entries.into_iter(),
            pending: None,
            name: plan.file_name(),
            written: 0,
        };

        stream::try_unfold(state, |mut state| async move {
            loop {
                let more = state.step().await.inspect_err(|e| {
                    warn!(archive = %state.name, error = %e, "Archive aborted");
                })?;
                let bytes = state.buf.take();
                if !bytes.is_empty() {
                    state.written += bytes.len() as u64;
                    return Ok(Some((bytes, state)));
                }
                if !more {
                    info!(archive = %state.name, bytes = state.written, "Archive complete");
                    return Ok(None);
                }
            }
        })
        .boxed()
    }

    /// [`Self::build`] as an `AsyncRead`.
    pub fn reader(&self, plan: ArchivePlan) -> impl AsyncRead + Send + Unpin + 'static {
        StreamReader::new(self.build(plan).map_err(io::Error::other))
    }

    /// Encode `plan` into `out`, returning the number of bytes written.
    pub async fn write_to<W>(&self, plan: ArchivePlan, out: &mut W) -> AppResult<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut reader = self.reader(plan);
        tokio::io::copy(&mut reader, out)
            .await
            .map_err(|e| archive_err("Failed to write archive", e))
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use super::*;
    use cabinet_storage::providers::memory::MemoryObjectStore;

    fn entry(key: Option<&str>, path: &str) -> ArchiveEntry {
        ArchiveEntry {
            remote_key: key.map(str::to_string),
            display_path: path.to_string(),
            modified: Utc::now(),
        }
    }

    async fn collect(stream: ArchiveStream) -> AppResult<Vec<u8>> {
        let chunks: Vec<Bytes> = stream.try_collect().await?;
        Ok(chunks.concat())
    }

    #[tokio::test]
    async fn test_archive_contains_files_and_markers() {
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("1/7-a.txt", "hello archive");
        let gateway = ObjectStoreGateway::new(store, 4);
        let builder = ArchiveBuilder::new(gateway, ArchiveCompression::Deflated);

        let plan = ArchivePlan {
            name: "Alpha".into(),
            common_prefix: Some("Alpha".into()),
            entries: vec![
                entry(Some("1/7-a.txt"), "Alpha/Docs/a.txt"),
                entry(None, "Alpha/Empty"),
            ],
        };
        let bytes = collect(builder.build(plan)).await.unwrap();

        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(zip.len(), 2);
        let mut content = String::new();
        zip.by_name("Docs/a.txt")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "hello archive");
        assert!(zip.by_name("Empty/").unwrap().is_dir());
    }

    #[tokio::test]
    async fn test_missing_blob_fails_stream() {
        let gateway = ObjectStoreGateway::new(Arc::new(MemoryObjectStore::new()), 1024);
        let builder = ArchiveBuilder::new(gateway, ArchiveCompression::Stored);
        let plan = ArchivePlan {
            name: "x".into(),
            common_prefix: None,
            entries: vec![entry(Some("gone"), "P/gone.txt")],
        };
        let err = collect(builder.build(plan)).await.unwrap_err();
        assert_eq!(err.kind, cabinet_core::error::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_write_to_reports_length() {
        let gateway = ObjectStoreGateway::new(Arc::new(MemoryObjectStore::new()), 1024);
        let builder = ArchiveBuilder::new(gateway, ArchiveCompression::Deflated);
        let plan = ArchivePlan {
            name: "Empty".into(),
            common_prefix: Some("Empty".into()),
            entries: vec![entry(None, "Empty")],
        };
        let mut out = Vec::new();
        let written = builder.write_to(plan, &mut out).await.unwrap();
        assert_eq!(written, out.len() as u64);

        let mut zip = zip::ZipArchive::new(Cursor::new(out)).unwrap();
        assert_eq!(zip.by_index(0).unwrap().name(), "Empty/");
    }
}
