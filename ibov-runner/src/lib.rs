//! IBOV Runner: daily ingest orchestration and storage.
//!
//! This crate builds on `ibov-core` to provide:
//! - Layered configuration (defaults, TOML, environment credentials)
//! - Hive-style date partition keys
//! - Object storage backends (S3, in-memory)
//! - Partitioned Parquet uploader with existence probe
//! - The fetch → transform → upload pipeline
//! - The downstream trigger that starts the ETL job for new objects

pub mod config;
pub mod partition;
pub mod pipeline;
pub mod storage;
pub mod trigger;
pub mod uploader;

pub use config::{ConfigError, PipelineConfig, StorageConfig};
pub use partition::PartitionKey;
pub use pipeline::{local_today, Pipeline, PipelineError, PipelineReport};
pub use storage::{MemoryStorage, ObjectStorage, S3Storage, StorageError};
pub use trigger::{handle_event, JobLauncher, LoggingLauncher, TriggerError, TriggerResponse};
pub use uploader::{Upload, UploadError, Uploader};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn uploader_is_send_sync() {
        assert_send::<Uploader>();
        assert_sync::<Uploader>();
    }

    #[test]
    fn pipeline_is_send_sync() {
        assert_send::<Pipeline>();
        assert_sync::<Pipeline>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
    }
}
