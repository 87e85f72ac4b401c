//! Report cache errors
//!
//! Only writes can fail in a way the caller must handle. Missing and corrupt
//! records are ordinary outcomes (`None`, `false`, a skipped entry) and never
//! show up here.

use medvault_core::AppError;
use medvault_storage::{CodecError, StorageError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Storage quota exceeded while storing report {report_number}: {required} bytes required, {available} bytes available")]
    QuotaExceeded {
        report_number: String,
        required: u64,
        available: u64,
    },

    #[error("Failed to encode report {report_number}")]
    Encode {
        report_number: String,
        #[source]
        source: CodecError,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for report cache operations
pub type CacheResult<T> = Result<T, CacheError>;

impl From<CacheError> for AppError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::QuotaExceeded {
                required,
                available,
                ..
            } => AppError::QuotaExceeded {
                required,
                available,
            },
            CacheError::Encode { .. } => AppError::Internal(err.to_string()),
            CacheError::Storage(StorageError::InvalidKey(msg)) => AppError::InvalidInput(msg),
            CacheError::Storage(StorageError::ConfigError(msg)) => AppError::Config(msg),
            CacheError::Storage(e) => AppError::Storage(e.to_string()),
        }
    }
}
