#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-memory")]
use crate::MemoryStore;
#[cfg(not(all(feature = "storage-local", feature = "storage-memory")))]
use crate::StorageError;
use crate::{KeyValueStore, StorageBackend, StorageResult};
use medvault_core::CacheConfig;
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &CacheConfig) -> StorageResult<Arc<dyn KeyValueStore>> {
    match config.storage_backend() {
        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let storage = LocalStorage::new(config.storage_path(), config.quota_bytes()).await?;
            tracing::debug!(
                path = %config.storage_path(),
                quota_bytes = ?config.quota_bytes(),
                "Using local report storage"
            );
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-memory")]
        StorageBackend::Memory => {
            let storage = match config.quota_bytes() {
                Some(quota) => MemoryStore::with_quota(quota),
                None => MemoryStore::new(),
            };
            tracing::debug!(quota_bytes = ?config.quota_bytes(), "Using in-memory report storage");
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-memory"))]
        StorageBackend::Memory => Err(StorageError::ConfigError(
            "Memory storage backend not available (storage-memory feature not enabled)".to_string(),
        )),
    }
}

#[cfg(all(test, feature = "storage-local", feature = "storage-memory"))]
mod tests {
    use super::*;
    use crate::StorageError;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_creates_configured_backend() {
        let dir = tempdir().unwrap();
        let config = CacheConfig {
            storage_backend: StorageBackend::Local,
            storage_path: dir.path().display().to_string(),
            ..CacheConfig::default()
        };
        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Local);
        assert!(dir.path().join("records").is_dir());

        let config = CacheConfig {
            storage_backend: StorageBackend::Memory,
            quota_bytes: Some(8),
            ..CacheConfig::default()
        };
        let storage = create_storage(&config).await.unwrap();
        assert_eq!(storage.backend_type(), StorageBackend::Memory);
        assert!(matches!(
            storage.set("key", vec![0; 16]).await,
            Err(StorageError::QuotaExceeded { .. })
        ));
    }
}
