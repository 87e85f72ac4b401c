use crate::quota::{check_quota, entry_cost};
use crate::traits::{KeyValueStore, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

const RECORDS_DIR: &str = "records";
const TMP_DIR: &str = "tmp";
const MAX_FILE_NAME_LEN: usize = 255;

/// Local filesystem storage implementation
///
/// Each key is one file under `{base_path}/records`, named by the URL-encoded
/// key. Writes land in `{base_path}/tmp` first and are renamed into place, so
/// a failed or interrupted write never replaces an existing value.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    quota_bytes: Option<u64>,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for the store (e.g., "/var/lib/medvault")
    /// * `quota_bytes` - Optional hard limit on stored bytes (keys plus values)
    pub async fn new(base_path: impl Into<PathBuf>, quota_bytes: Option<u64>) -> StorageResult<Self> {
        let base_path = base_path.into();

        for dir in [RECORDS_DIR, TMP_DIR] {
            let path = base_path.join(dir);
            fs::create_dir_all(&path).await.map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }

        Ok(LocalStorage {
            base_path,
            quota_bytes,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn records_dir(&self) -> PathBuf {
        self.base_path.join(RECORDS_DIR)
    }

    /// Convert a key to its record path
    ///
    /// The encoded name never contains a separator; `.` and `..` are rejected
    /// so a key cannot resolve outside the records directory.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
        }

        let file_name = urlencoding::encode(key);
        if file_name == "." || file_name == ".." {
            return Err(StorageError::InvalidKey(format!(
                "Storage key {:?} is reserved",
                key
            )));
        }
        if file_name.len() > MAX_FILE_NAME_LEN {
            return Err(StorageError::InvalidKey(format!(
                "Storage key is too long ({} bytes encoded)",
                file_name.len()
            )));
        }

        Ok(self.records_dir().join(&*file_name))
    }

    /// Bytes currently accounted against the quota
    pub async fn used_bytes(&self) -> StorageResult<u64> {
        let mut used = 0u64;
        let mut dir = fs::read_dir(self.records_dir()).await?;
        while let Some(entry) = dir.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            if let Some(key) = decode_file_name(&entry.file_name()) {
                used = used.saturating_add(entry_cost(&key, meta.len()));
            }
        }
        Ok(used)
    }

    async fn existing_len(path: &Path) -> StorageResult<Option<u64>> {
        match fs::metadata(path).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed(format!(
                "Failed to stat {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn write_temp(&self, tmp_path: &Path, data: &[u8]) -> StorageResult<()> {
        let mut file = fs::File::create(tmp_path).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to create file {}: {}", tmp_path.display(), e))
        })?;

        file.write_all(data).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write file {}: {}", tmp_path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to sync file {}: {}", tmp_path.display(), e))
        })?;

        Ok(())
    }
}

fn decode_file_name(name: &std::ffi::OsStr) -> Option<String> {
    let name = name.to_str()?;
    urlencoding::decode(name).ok().map(|k| k.into_owned())
}

#[async_trait]
impl KeyValueStore for LocalStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.key_to_path(key)?;

        match fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed(format!(
                "Failed to read file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let size = value.len();
        let start = std::time::Instant::now();

        if self.quota_bytes.is_some() {
            let replaced = Self::existing_len(&path)
                .await?
                .map(|len| entry_cost(key, len))
                .unwrap_or(0);
            let used = self.used_bytes().await?;
            check_quota(
                self.quota_bytes,
                used,
                replaced,
                entry_cost(key, size as u64),
            )?;
        }

        let tmp_path = self
            .base_path
            .join(TMP_DIR)
            .join(format!("{}.tmp", Uuid::new_v4()));

        let written = match self.write_temp(&tmp_path, &value).await {
            Ok(()) => fs::rename(&tmp_path, &path).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to move {} into place: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) => Err(e),
        };

        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&tmp_path).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(
                        path = %tmp_path.display(),
                        error = %cleanup,
                        "Failed to remove temporary file after failed write"
                    );
                }
            }
            return Err(e);
        }

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage write successful"
        );

        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        let start = std::time::Instant::now();

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(
                    path = %path.display(),
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage delete successful"
                );
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut dir = fs::read_dir(self.records_dir()).await?;

        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            match decode_file_name(&entry.file_name()) {
                Some(key) => keys.push(key),
                None => tracing::warn!(
                    path = %entry.path().display(),
                    "Skipping file with undecodable name in record directory"
                ),
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_local_storage_set_get() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), None).await.unwrap();

        let data = b"%PDF-1.4 test data".to_vec();
        storage.set("medvault:report:RPT-1", data.clone()).await.unwrap();

        let read = storage.get("medvault:report:RPT-1").await.unwrap();
        assert_eq!(read, Some(data));
        assert_eq!(storage.get("medvault:report:nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keys_with_separators_stay_inside_base() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), None).await.unwrap();

        storage.set("../../etc/passwd", b"x".to_vec()).await.unwrap();
        storage.set("a/b\\c", b"y".to_vec()).await.unwrap();

        assert_eq!(
            storage.keys().await.unwrap(),
            vec!["../../etc/passwd".to_string(), "a/b\\c".to_string()]
        );
        assert!(!dir.path().join("etc").exists());
    }

    #[tokio::test]
    async fn test_reserved_and_empty_keys_rejected() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), None).await.unwrap();

        for key in ["", ".", ".."] {
            let result = storage.set(key, b"x".to_vec()).await;
            assert!(matches!(result, Err(StorageError::InvalidKey(_))), "key {:?}", key);
        }

        let long_key = "k".repeat(300);
        assert!(matches!(
            storage.get(&long_key).await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_local_storage_remove() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), None).await.unwrap();

        storage.set("k", b"v".to_vec()).await.unwrap();
        assert!(storage.remove("k").await.unwrap());
        assert!(!storage.remove("k").await.unwrap());
        assert!(storage.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_local_storage_persists_across_instances() {
        let dir = tempdir().unwrap();
        {
            let storage = LocalStorage::new(dir.path(), None).await.unwrap();
            storage.set("persist", b"kept".to_vec()).await.unwrap();
        }

        let reopened = LocalStorage::new(dir.path(), None).await.unwrap();
        assert_eq!(reopened.get("persist").await.unwrap(), Some(b"kept".to_vec()));
    }

    #[tokio::test]
    async fn test_local_quota_keeps_previous_value() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), Some(64)).await.unwrap();

        storage.set("k", vec![1; 40]).await.unwrap();
        let result = storage.set("k", vec![2; 80]).await;
        assert!(matches!(result, Err(StorageError::QuotaExceeded { .. })));

        assert_eq!(storage.get("k").await.unwrap(), Some(vec![1; 40]));
        assert_eq!(storage.used_bytes().await.unwrap(), 41);

        let mut tmp = fs::read_dir(dir.path().join(TMP_DIR)).await.unwrap();
        assert!(tmp.next_entry().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_replaces_whole_value() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), None).await.unwrap();

        storage.set("k", vec![7; 100]).await.unwrap();
        storage.set("k", vec![8; 3]).await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), Some(vec![8; 3]));
    }
}
