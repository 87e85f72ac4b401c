//! Medvault Core Library
//!
//! This crate provides the domain models, error types and configuration shared by
//! the report cache, its storage backends and the command line tools.

pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{CacheConfig, LogFormat, DEFAULT_KEY_PREFIX, DEFAULT_MAX_SIZE_BYTES};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{report_filename, ReportSummary, StorageStats, StoredReport};
pub use storage_types::StorageBackend;
// Note: KeyValueStore, StorageError, StorageResult live in medvault-storage
