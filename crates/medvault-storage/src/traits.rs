//! Storage port trait
//!
//! This module defines the key-value interface every backend implements. The
//! report cache only ever talks to storage through it.

use crate::StorageBackend;
use async_trait::async_trait;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage quota exceeded: {required} bytes required, {available} bytes available")]
    QuotaExceeded { required: u64, available: u64 },

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Key-value storage port
///
/// Values are opaque bytes. Implementations must make `set` atomic: on error
/// the previous value for the key (if any) is still readable and no partial
/// value is ever observed. Missing keys are not errors.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value
    ///
    /// Backends with a quota reject the write with `QuotaExceeded` before
    /// mutating anything.
    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Remove `key`, returning whether it existed
    async fn remove(&self, key: &str) -> StorageResult<bool>;

    /// List every key currently stored, in ascending order
    async fn keys(&self) -> StorageResult<Vec<String>>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
