//! Backend construction from configuration.

use std::sync::Arc;

use tracing::info;

use cabinet_core::config::storage::{StorageConfig, StorageProviderKind};
use cabinet_core::result::AppResult;
use cabinet_core::traits::storage::ObjectStore;

use crate::gateway::ObjectStoreGateway;
use crate::providers::{LocalObjectStore, MemoryObjectStore};

/// Build the configured object store backend.
pub async fn build_store(config: &StorageConfig) -> AppResult<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config.provider {
        StorageProviderKind::Memory => Arc::new(MemoryObjectStore::new()),
        StorageProviderKind::Local => Arc::new(LocalObjectStore::new(&config.local.root_path).await?),
        #[cfg(feature = "s3")]
        StorageProviderKind::S3 => {
            Arc::new(crate::providers::s3::S3ObjectStore::new(&config.s3).await?)
        }
        #[cfg(not(feature = "s3"))]
        StorageProviderKind::S3 => {
            return Err(cabinet_core::error::AppError::configuration(
                "storage.provider = \"s3\" requires the `s3` feature",
            ));
        }
    };
    info!(provider = store.provider_type(), "Object store ready");
    Ok(store)
}

/// Build the configured backend wrapped in a gateway.
pub async fn build_gateway(config: &StorageConfig) -> AppResult<ObjectStoreGateway> {
    let store = build_store(config).await?;
    Ok(ObjectStoreGateway::new(store, config.blob_chunk_size_bytes))
}
