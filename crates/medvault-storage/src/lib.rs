//! Medvault Storage Library
//!
//! This crate provides the key-value storage port used by the report cache,
//! the record codec that defines what a stored value looks like, and the
//! backends implementing the port (in-memory and local filesystem).
//!
//! # Key format
//!
//! Report records live under `{prefix}{report_number}`. The prefix is
//! configurable so a single store can hold other data; enumeration and
//! clear-all only ever touch keys carrying the prefix. Key helpers are in the
//! `keys` module.
//!
//! # Value format
//!
//! Values are versioned JSON envelopes produced by the `codec` module. See
//! [`codec::RECORD_FORMAT_VERSION`].

pub mod codec;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-memory")]
pub mod memory;
pub(crate) mod quota;
pub mod traits;

// Re-export commonly used types
pub use codec::{decode_report, decode_summary, encode_report, CodecError, RECORD_FORMAT_VERSION};
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use medvault_core::StorageBackend;
#[cfg(feature = "storage-memory")]
pub use memory::MemoryStore;
pub use traits::{KeyValueStore, StorageError, StorageResult};
