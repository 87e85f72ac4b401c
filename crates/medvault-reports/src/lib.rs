//! Medvault Reports Library
//!
//! The local PDF report cache: stores generated reports behind a
//! [`KeyValueStore`](medvault_storage::KeyValueStore), serves lookups and
//! deletions, and computes usage statistics against a configured size cap.
//! The cap is informational; nothing is ever evicted automatically.

pub mod cache;
pub mod error;
pub mod format;

pub use cache::{ReportCache, ReportCacheConfig};
pub use error::{CacheError, CacheResult};
pub use format::format_bytes;
