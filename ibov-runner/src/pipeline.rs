//! The daily ingest: fetch (with validation) → transform → upload.
//!
//! Strictly sequential. The first failure aborts the run; nothing already
//! written (local file, uploaded object) is rolled back.

use crate::uploader::{UploadError, Uploader};
use chrono::NaiveDate;
use ibov_core::{process, FetchError, PortfolioSource, ProcessingError};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info};

/// Errors from a pipeline run, one variant per stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("fetch stage: {0}")]
    Fetch(#[from] FetchError),

    #[error("transform stage: {0}")]
    Processing(#[from] ProcessingError),

    #[error("upload stage: {0}")]
    Upload(#[from] UploadError),
}

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub source: String,
    pub local_file: PathBuf,
    pub rows: usize,
    pub columns: Vec<String>,
    pub locator: String,
    pub bytes: usize,
    pub temp_cleanup_error: Option<String>,
}

/// Today's date in local time.
pub fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Wires a source and an uploader together.
pub struct Pipeline {
    source: Box<dyn PortfolioSource>,
    uploader: Uploader,
    clock: fn() -> NaiveDate,
}

impl Pipeline {
    pub fn new(source: Box<dyn PortfolioSource>, uploader: Uploader) -> Self {
        Self {
            source,
            uploader,
            clock: local_today,
        }
    }

    /// Replace the wall clock. Each stage reads it independently.
    pub fn with_clock(mut self, clock: fn() -> NaiveDate) -> Self {
        self.clock = clock;
        self
    }

    pub fn run(&self) -> Result<PipelineReport, PipelineError> {
        let result = self.run_stages();
        if let Err(e) = &result {
            error!("pipeline run failed: {e}");
        }
        result
    }

    fn run_stages(&self) -> Result<PipelineReport, PipelineError> {
        info!(source = self.source.name(), "starting daily ingest");
        let path = self.source.download_daily((self.clock)())?;

        let table = process(&path, (self.clock)())?;
        info!(rows = table.height(), columns = table.width(), "data processed");

        let upload = self.uploader.upload(&table, (self.clock)())?;
        info!(locator = %upload.locator, "daily ingest finished");

        Ok(PipelineReport {
            source: self.source.name().to_string(),
            local_file: path,
            rows: upload.table.height(),
            columns: upload
                .table
                .get_column_names()
                .into_iter()
                .map(|n| n.to_string())
                .collect(),
            locator: upload.locator,
            bytes: upload.bytes,
            temp_cleanup_error: upload.temp_cleanup_error,
        })
    }

    /// Whether the partition for `date` already holds an object.
    pub fn exists_for(&self, date: NaiveDate) -> Result<bool, PipelineError> {
        Ok(self.uploader.exists(date)?)
    }
}
