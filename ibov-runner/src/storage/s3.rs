//! S3 backend on `object_store`.
//!
//! `object_store` is async; the pipeline is not. The adapter owns a
//! current-thread runtime and blocks on each call.

use super::{ObjectInfo, ObjectStorage, StorageError};
use crate::config::StorageConfig;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use tokio::runtime::Runtime;

/// One S3 bucket, authenticated with the credentials in `StorageConfig`.
pub struct S3Storage {
    store: AmazonS3,
    runtime: Runtime,
}

impl S3Storage {
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region);
        if let Some(key) = &config.access_key {
            builder = builder.with_access_key_id(key);
        }
        if let Some(secret) = &config.secret_key {
            builder = builder.with_secret_access_key(secret);
        }
        if let Some(token) = &config.session_token {
            builder = builder.with_token(token);
        }
        let store = builder
            .build()
            .map_err(|e| StorageError::Config(e.to_string()))?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StorageError::Config(format!("async runtime: {e}")))?;

        Ok(Self { store, runtime })
    }
}

impl ObjectStorage for S3Storage {
    fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let path = ObjectPath::from(key);
        self.runtime
            .block_on(self.store.put(&path, PutPayload::from(bytes)))
            .map(|_| ())
            .map_err(|e| StorageError::Backend(e.to_string()))
    }

    fn head(&self, key: &str) -> Result<ObjectInfo, StorageError> {
        let path = ObjectPath::from(key);
        match self.runtime.block_on(self.store.head(&path)) {
            Ok(meta) => Ok(ObjectInfo {
                key: key.to_string(),
                size: meta.size as u64,
            }),
            Err(object_store::Error::NotFound { .. }) => Err(StorageError::NotFound(key.to_string())),
            Err(e) => Err(StorageError::Backend(e.to_string())),
        }
    }
}
