//! Hive-style date partitions: `year=YYYY/month=MM/day=DD`.

use chrono::{Datelike, NaiveDate};
use std::fmt;

/// Name of the object written into each partition.
pub const OBJECT_NAME: &str = "bovespa_data.parquet";

/// Partition path segment for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey(String);

impl PartitionKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(format!(
            "year={}/month={:02}/day={:02}",
            date.year(),
            date.month(),
            date.day()
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Object key under `prefix`: `<prefix>/<partition>/bovespa_data.parquet`.
    pub fn object_key(&self, prefix: &str) -> String {
        if prefix.is_empty() {
            format!("{}/{OBJECT_NAME}", self.0)
        } else {
            format!("{prefix}/{}/{OBJECT_NAME}", self.0)
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
