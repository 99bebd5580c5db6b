//! Partitioned Parquet upload.
//!
//! Layout: `s3://{bucket}/{prefix}/year=YYYY/month=MM/day=DD/bovespa_data.parquet`
//!
//! - The locator is stamped into every row (`source_path`) before the bytes
//!   leave the machine, so the stored object names itself.
//! - The caller's table is not touched; the stamped copy is returned.
//! - The Parquet file is staged in a local temp dir and removed afterwards.
//!   A failed removal is reported but never turns a successful upload into
//!   an error.
//! - Re-running for the same day overwrites the same key.

use crate::config::StorageConfig;
use crate::partition::PartitionKey;
use crate::storage::{ObjectStorage, S3Storage, StorageError};
use chrono::NaiveDate;
use ibov_core::schema::SOURCE_PATH;
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors from the upload layer.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("table error: {0}")]
    Frame(String),

    #[error("parquet I/O error: {0}")]
    Parquet(String),

    #[error("local staging failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A completed upload.
#[derive(Debug, Clone)]
pub struct Upload {
    /// `s3://bucket/key`
    pub locator: String,
    pub key: String,
    /// The uploaded table, with `source_path` filled in.
    pub table: DataFrame,
    pub bytes: usize,
    /// Set when the staged local file could not be removed.
    pub temp_cleanup_error: Option<String>,
}

/// Writes daily tables into the partitioned bucket.
pub struct Uploader {
    storage: Arc<dyn ObjectStorage>,
    bucket: String,
    prefix: String,
    temp_dir: PathBuf,
}

impl Uploader {
    pub fn new(storage: Arc<dyn ObjectStorage>, config: &StorageConfig) -> Self {
        Self {
            storage,
            bucket: config.bucket.clone(),
            prefix: config.prefix.clone(),
            temp_dir: config.temp_dir.clone(),
        }
    }

    /// Uploader backed by S3 with the configured credentials.
    pub fn s3(config: &StorageConfig) -> Result<Self, UploadError> {
        Ok(Self::new(Arc::new(S3Storage::new(config)?), config))
    }

    pub fn object_key(&self, reference_date: NaiveDate) -> String {
        PartitionKey::from_date(reference_date).object_key(&self.prefix)
    }

    pub fn locator(&self, reference_date: NaiveDate) -> String {
        format!("s3://{}/{}", self.bucket, self.object_key(reference_date))
    }

    /// Stamp, stage and upload `table` into the partition for `reference_date`.
    pub fn upload(&self, table: &DataFrame, reference_date: NaiveDate) -> Result<Upload, UploadError> {
        let key = self.object_key(reference_date);
        let locator = self.locator(reference_date);
        let mut stamped = with_source_path(table, &locator)?;

        fs::create_dir_all(&self.temp_dir).map_err(|source| UploadError::Io {
            path: self.temp_dir.clone(),
            source,
        })?;
        let local = self
            .temp_dir
            .join(format!("bovespa_data_{}.parquet", reference_date.format("%Y%m%d")));

        info!(path = %local.display(), "writing parquet locally");
        let result = write_parquet(&mut stamped, &local).and_then(|()| {
            let bytes = fs::read(&local).map_err(|source| UploadError::Io {
                path: local.clone(),
                source,
            })?;
            let len = bytes.len();
            info!(%locator, bytes = len, "uploading");
            self.storage.put(&key, bytes)?;
            Ok(len)
        });

        let temp_cleanup_error = match fs::remove_file(&local) {
            Ok(()) => None,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && result.is_err() => None,
            Err(e) => {
                warn!(path = %local.display(), "could not remove staged parquet: {e}");
                Some(e.to_string())
            }
        };

        match result {
            Ok(bytes) => {
                info!(%locator, "upload finished");
                Ok(Upload {
                    locator,
                    key,
                    table: stamped,
                    bytes,
                    temp_cleanup_error,
                })
            }
            Err(e) => {
                error!(%locator, "upload failed: {e}");
                Err(e)
            }
        }
    }

    /// Whether the partition for `reference_date` already holds an object.
    ///
    /// Only "not found" maps to `false`; other backend errors propagate.
    pub fn exists(&self, reference_date: NaiveDate) -> Result<bool, UploadError> {
        let key = self.object_key(reference_date);
        match self.storage.head(&key) {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => {
                error!(%key, "existence check failed: {e}");
                Err(UploadError::Storage(e))
            }
        }
    }
}

/// Copy of `table` with `source_path = locator` on every row.
pub fn with_source_path(table: &DataFrame, locator: &str) -> Result<DataFrame, UploadError> {
    let mut df = table.clone();
    let paths = vec![locator.to_string(); df.height()];
    df.with_column(Column::new(SOURCE_PATH.into(), paths))
        .map_err(|e| UploadError::Frame(e.to_string()))?;
    Ok(df)
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), UploadError> {
    let file = fs::File::create(path).map_err(|source| UploadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| UploadError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}
