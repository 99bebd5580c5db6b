//! Download of the daily composition file.
//!
//! The `PortfolioSource` trait abstracts over where the file comes from so
//! the orchestrator can be driven by a stub in tests. `B3Fetcher` is the
//! real implementation against the exchange website.

pub mod b3;
pub mod sniff;

pub use b3::{B3Fetcher, FetchConfig};
pub use sniff::{json_rows_to_csv, rewrite_if_json, PayloadFormat};

use crate::validate::ValidationError;
use chrono::NaiveDate;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from fetching and materializing the composition file.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP client setup failed: {0}")]
    Client(String),

    #[error("cannot write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unexpected payload: {0}")]
    UnexpectedPayload(String),

    #[error("character {0:?} cannot be written in Windows-1252")]
    Encoding(char),

    #[error("downloaded file is invalid: {0}")]
    Validation(#[from] ValidationError),
}

/// A source of the daily composition file.
pub trait PortfolioSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch today's file, store it locally, validate it and return its path.
    fn download_daily(&self, today: NaiveDate) -> Result<PathBuf, FetchError>;
}
