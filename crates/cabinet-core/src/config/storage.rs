//! Object store configuration.

use serde::{Deserialize, Serialize};

/// Which object store backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageProviderKind {
    /// Volatile in-process store.
    #[default]
    Memory,
    /// Local filesystem rooted at `local.root_path`.
    Local,
    /// S3-compatible bucket (requires the `s3` feature).
    S3,
}

/// Top-level storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend to use.
    #[serde(default)]
    pub provider: StorageProviderKind,
    /// Prefix prepended to every minted object key (may be empty).
    #[serde(default)]
    pub bucket_root: String,
    /// Chunk size for ranged downloads.
    #[serde(default = "default_chunk_size")]
    pub blob_chunk_size_bytes: u64,
    /// Total storage quota used when no quota record exists.
    #[serde(default = "default_max_size")]
    pub max_size_bytes: u64,
    /// Local filesystem storage configuration.
    #[serde(default)]
    pub local: LocalStorageConfig,
    /// S3-compatible storage configuration.
    #[serde(default)]
    pub s3: S3StorageConfig,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProviderKind::default(),
            bucket_root: String::new(),
            blob_chunk_size_bytes: default_chunk_size(),
            max_size_bytes: default_max_size(),
            local: LocalStorageConfig::default(),
            s3: S3StorageConfig::default(),
        }
    }
}

/// Local filesystem storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalStorageConfig {
    /// Root path for local blob storage.
    #[serde(default = "default_local_root")]
    pub root_path: String,
}

impl Default for LocalStorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_local_root(),
        }
    }
}

/// S3-compatible object storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct S3StorageConfig {
    /// S3 endpoint URL (for non-AWS services like MinIO).
    #[serde(default)]
    pub endpoint: String,
    /// AWS region.
    #[serde(default = "default_region")]
    pub region: String,
    /// Bucket name.
    #[serde(default)]
    pub bucket: String,
    /// Access key ID.
    #[serde(default)]
    pub access_key: String,
    /// Secret access key.
    #[serde(default)]
    pub secret_key: String,
}

fn default_chunk_size() -> u64 {
    262_144 // 256 KiB
}

fn default_max_size() -> u64 {
    107_374_182_400 // 100 GiB
}

fn default_local_root() -> String {
    "./data/blobs".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}
