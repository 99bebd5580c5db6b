//! Object storage backends.
//!
//! The uploader talks to storage through `ObjectStorage` so the S3 backend
//! can be swapped for the in-memory one (dry runs and tests).

pub mod memory;
pub mod s3;

pub use memory::MemoryStorage;
pub use s3::S3Storage;

use thiserror::Error;

/// Errors reported by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("storage configuration error: {0}")]
    Config(String),
}

/// Metadata returned by a successful existence probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
}

/// A bucket-scoped object store.
pub trait ObjectStorage: Send + Sync {
    /// Write `bytes` at `key`, replacing any existing object.
    fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    /// Metadata-only probe. Absent objects must yield `StorageError::NotFound`.
    fn head(&self, key: &str) -> Result<ObjectInfo, StorageError>;
}
