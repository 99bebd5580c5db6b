//! Payload format detection.
//!
//! The data endpoint sometimes answers with CSV and sometimes with a JSON
//! envelope whose `results` array holds one object per row. JSON payloads
//! are rewritten in place as the same `;`-separated Windows-1252 CSV the
//! rest of the pipeline expects.

use super::FetchError;
use crate::schema::SEPARATOR;
use crate::text;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// What the downloaded bytes turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// Not JSON; assumed to already be CSV.
    Delimited,
    /// JSON without a `results` envelope; left untouched.
    JsonWithoutResults,
    /// JSON `results` rows, rewritten as CSV.
    JsonResults,
}

/// Inspect `bytes` and, for a JSON `results` payload, overwrite `path` with CSV.
pub fn rewrite_if_json(bytes: &[u8], path: &Path) -> Result<PayloadFormat, FetchError> {
    let value: Value = match serde_json::from_slice(bytes) {
        Ok(v) => v,
        Err(_) => {
            info!("payload is not JSON, assuming CSV");
            return Ok(PayloadFormat::Delimited);
        }
    };

    let Some(results) = value.as_object().and_then(|obj| obj.get("results")) else {
        debug!("payload is JSON without a results key, leaving file as written");
        return Ok(PayloadFormat::JsonWithoutResults);
    };

    info!("payload is JSON, converting results to CSV");
    let csv = json_rows_to_csv(results)?;
    let encoded = text::encode(&csv).map_err(FetchError::Encoding)?;
    fs::write(path, encoded).map_err(|source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(PayloadFormat::JsonResults)
}

/// Render an array of row objects as `;`-separated CSV with a header line.
///
/// Columns are the union of object keys in first-seen order. Missing keys
/// and `null` become empty cells.
pub fn json_rows_to_csv(results: &Value) -> Result<String, FetchError> {
    let rows = results
        .as_array()
        .ok_or_else(|| FetchError::UnexpectedPayload("`results` is not an array".into()))?;

    let mut headers: Vec<&str> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut objects = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let obj = row.as_object().ok_or_else(|| {
            FetchError::UnexpectedPayload(format!("`results[{i}]` is not an object"))
        })?;
        for key in obj.keys() {
            if seen.insert(key.as_str()) {
                headers.push(key.as_str());
            }
        }
        objects.push(obj);
    }

    if headers.is_empty() {
        return Ok(String::new());
    }

    let csv_err = |e: csv::Error| FetchError::UnexpectedPayload(format!("csv encoding: {e}"));
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(SEPARATOR)
        .from_writer(Vec::new());
    wtr.write_record(&headers).map_err(csv_err)?;
    for obj in objects {
        let record: Vec<String> = headers
            .iter()
            .map(|h| obj.get(*h).map(cell_text).unwrap_or_default())
            .collect();
        wtr.write_record(&record).map_err(csv_err)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| FetchError::UnexpectedPayload(format!("csv flush: {e}")))?;
    String::from_utf8(bytes).map_err(|e| FetchError::UnexpectedPayload(e.to_string()))
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
