//! S3-compatible object store (requires the `s3` feature).

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::primitives::ByteStream as S3Body;
use bytes::{Bytes, BytesMut};
use futures::stream::StreamExt;
use tracing::{debug, info};

use cabinet_core::config::storage::S3StorageConfig;
use cabinet_core::error::AppError;
use cabinet_core::result::AppResult;
use cabinet_core::traits::storage::{ByteStream, ObjectMeta, ObjectStore};

/// Object store backed by an S3-compatible bucket.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Create a client for the configured bucket.
    ///
    /// Explicit credentials win; otherwise the default AWS provider chain
    /// is used.
    pub async fn new(config: &S3StorageConfig) -> AppResult<Self> {
        if config.bucket.is_empty() {
            return Err(AppError::configuration("storage.s3.bucket is required"));
        }
        info!(
            endpoint = %config.endpoint,
            region = %config.region,
            bucket = %config.bucket,
            "Initializing S3 object store"
        );

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared).force_path_style(true);
        if !config.access_key.is_empty() {
            builder = builder.credentials_provider(Credentials::new(
                config.access_key.clone(),
                config.secret_key.clone(),
                None,
                None,
                "cabinet-config",
            ));
        }
        if !config.endpoint.is_empty() {
            builder = builder.endpoint_url(config.endpoint.clone());
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        })
    }

    async fn read_object(&self, key: &str, range: Option<String>) -> AppResult<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .set_range(range)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    AppError::not_found(format!("Blob not found: {key}"))
                } else {
                    AppError::store_unavailable(format!("S3 get_object failed for {key}: {e}"))
                }
            })?;

        let data = output.body.collect().await.map_err(|e| {
            AppError::store_unavailable(format!("S3 body read failed for {key}: {e}"))
        })?;
        Ok(data.into_bytes())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn provider_type(&self) -> &str {
        "s3"
    }

    async fn get(&self, key: &str) -> AppResult<Bytes> {
        self.read_object(key, None).await
    }

    async fn download_range(&self, key: &str, start: u64, end: u64) -> AppResult<Bytes> {
        if end <= start {
            return Ok(Bytes::new());
        }
        // HTTP ranges are inclusive
        self.read_object(key, Some(format!("bytes={}-{}", start, end - 1)))
            .await
    }

    async fn upload(&self, key: &str, mut stream: ByteStream) -> AppResult<u64> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = stream.next().await {
            buf.extend_from_slice(&chunk?);
        }
        let written = buf.len() as u64;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(S3Body::from(buf.freeze()))
            .send()
            .await
            .map_err(|e| AppError::store_unavailable(format!("S3 put_object failed for {key}: {e}")))?;

        debug!(key, bytes = written, "Uploaded blob to S3");
        Ok(written)
    }

    async fn rename(&self, from: &str, to: &str) -> AppResult<()> {
        let source = format!("{}/{}", self.bucket, urlencoding::encode(from));
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(source)
            .key(to)
            .send()
            .await
            .map_err(|e| {
                AppError::store_unavailable(format!("S3 copy_object {from} -> {to} failed: {e}"))
            })?;

        self.delete(from).await
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                AppError::store_unavailable(format!("S3 delete_object failed for {key}: {e}"))
            })?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        match self.metadata(key).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind == cabinet_core::error::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn metadata(&self, key: &str) -> AppResult<ObjectMeta> {
        let head = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    AppError::not_found(format!("Blob not found: {key}"))
                } else {
                    AppError::store_unavailable(format!("S3 head_object failed for {key}: {e}"))
                }
            })?;

        let last_modified = head
            .last_modified()
            .and_then(|t| chrono::DateTime::from_timestamp(t.secs(), t.subsec_nanos()));

        Ok(ObjectMeta {
            key: key.to_string(),
            size_bytes: head.content_length().unwrap_or(0).max(0) as u64,
            last_modified,
        })
    }
}
