use crate::quota::{check_quota, entry_cost};
use crate::traits::{KeyValueStore, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory key-value store
///
/// Clones share the same underlying map. Contents are lost when the last
/// clone is dropped.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    quota_bytes: Option<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes once `quota_bytes` would be exceeded
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            entries: Arc::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Bytes currently accounted against the quota
    pub fn used_bytes(&self) -> StorageResult<u64> {
        let entries = self.lock()?;
        Ok(Self::usage(&entries))
    }

    fn usage(entries: &HashMap<String, Vec<u8>>) -> u64 {
        entries
            .iter()
            .map(|(k, v)| entry_cost(k, v.len() as u64))
            .sum()
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|_| StorageError::BackendError("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        let mut entries = self.lock()?;

        if self.quota_bytes.is_some() {
            let replaced = entries
                .get(key)
                .map(|v| entry_cost(key, v.len() as u64))
                .unwrap_or(0);
            check_quota(
                self.quota_bytes,
                Self::usage(&entries),
                replaced,
                entry_cost(key, value.len() as u64),
            )?;
        }

        tracing::debug!(key = %key, size_bytes = value.len(), "Memory store set");
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<bool> {
        Ok(self.lock()?.remove(key).is_some())
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        let mut keys: Vec<String> = self.lock()?.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[cfg(all(test, feature = "storage-memory"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_set_get_remove() {
        let store = MemoryStore::new();
        store.set("a", b"one".to_vec()).await.unwrap();

        assert_eq!(store.get("a").await.unwrap(), Some(b"one".to_vec()));
        assert_eq!(store.get("missing").await.unwrap(), None);

        assert!(store.remove("a").await.unwrap());
        assert!(!store.remove("a").await.unwrap());
        assert_eq!(store.get("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_memory_keys_sorted() {
        let store = MemoryStore::new();
        for key in ["c", "a", "b"] {
            store.set(key, Vec::new()).await.unwrap();
        }
        assert_eq!(store.keys().await.unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_memory_clones_share_state() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set("shared", b"x".to_vec()).await.unwrap();
        assert!(other.get("shared").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_memory_quota_rejects_without_mutation() {
        let store = MemoryStore::with_quota(20);
        store.set("k", vec![1; 10]).await.unwrap();

        let result = store.set("k", vec![2; 30]).await;
        assert!(matches!(result, Err(StorageError::QuotaExceeded { .. })));
        assert_eq!(store.get("k").await.unwrap(), Some(vec![1; 10]));
        assert_eq!(store.used_bytes().unwrap(), 11);

        // Replacing the same key only counts the difference
        store.set("k", vec![3; 19]).await.unwrap();
        assert_eq!(store.used_bytes().unwrap(), 20);
    }
}
