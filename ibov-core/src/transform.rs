//! Normalization of the validated composition file into a columnar table.
//!
//! The file is re-read with the primary parse only. A file that passed
//! validation through the skip-first-line fallback is rejected here.

use crate::schema::{RawTable, DATA_REFERENCIA, PART, THEORICAL_QTY};
use crate::text;
use crate::validate::parse_delimited;
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs;
use std::num::ParseFloatError;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};

/// Errors from transforming the local file.
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file could not be parsed: {0}")]
    Parse(String),

    #[error("column '{0}' not found")]
    MissingColumn(String),

    #[error("cannot convert '{value}' in column '{column}' (row {row}) to a number")]
    Coercion {
        column: String,
        row: usize,
        value: String,
    },

    #[error("table construction failed: {0}")]
    Frame(String),
}

/// `part` is comma-decimal: every `,` becomes `.`.
///
/// Dots already present are left alone, so `"1.234,56"` becomes
/// `"1.234.56"` and does not parse.
pub fn coerce_part(raw: &str) -> Result<f64, ParseFloatError> {
    raw.replace(',', ".").parse()
}

/// `theoricalQty` is dot-thousands: every `.` is dropped.
pub fn coerce_theorical_qty(raw: &str) -> Result<f64, ParseFloatError> {
    raw.replace('.', "").parse()
}

/// Load the file at `path` and normalize it, stamping `today` on every row.
pub fn process(path: &Path, today: NaiveDate) -> Result<DataFrame, ProcessingError> {
    let result = fs::read(path)
        .map_err(|source| ProcessingError::Io {
            path: path.to_path_buf(),
            source,
        })
        .and_then(|bytes| {
            let table =
                parse_delimited(&text::decode(&bytes)).map_err(ProcessingError::Parse)?;
            process_table(&table, today)
        });

    match &result {
        Ok(df) => info!(rows = df.height(), columns = df.width(), "processing finished"),
        Err(e) => error!(path = %path.display(), "processing failed: {e}"),
    }
    result
}

/// Normalize an already-parsed table.
pub fn process_table(table: &RawTable, today: NaiveDate) -> Result<DataFrame, ProcessingError> {
    for required in [PART, THEORICAL_QTY] {
        if table.column_index(required).is_none() {
            return Err(ProcessingError::MissingColumn(required.to_string()));
        }
    }

    let mut columns = Vec::with_capacity(table.headers.len() + 1);
    for (idx, name) in table.headers.iter().enumerate() {
        let cells = table.column(idx).map(str::trim);
        let column = match name.as_str() {
            PART => Column::new(name.as_str().into(), coerce_column(name, cells, coerce_part)?),
            THEORICAL_QTY => {
                Column::new(name.as_str().into(), coerce_column(name, cells, coerce_theorical_qty)?)
            }
            _ => {
                let values: Vec<Option<String>> = cells
                    .map(|c| (!c.is_empty()).then(|| c.to_string()))
                    .collect();
                Column::new(name.as_str().into(), values)
            }
        };
        columns.push(column);
    }

    let day = days_since_epoch(today)?;
    columns.push(
        Column::new(DATA_REFERENCIA.into(), vec![day; table.height()])
            .cast(&DataType::Date)
            .map_err(|e| ProcessingError::Frame(format!("date cast: {e}")))?,
    );

    DataFrame::new(columns).map_err(|e| ProcessingError::Frame(e.to_string()))
}

/// Polars `Date` physical value: days since 1970-01-01.
fn days_since_epoch(date: NaiveDate) -> Result<i32, ProcessingError> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or_else(|| ProcessingError::Frame("invalid epoch date".into()))?;
    Ok((date - epoch).num_days() as i32)
}

/// Empty cells become nulls; anything else must coerce.
fn coerce_column<'a>(
    name: &str,
    cells: impl Iterator<Item = &'a str>,
    coerce: fn(&str) -> Result<f64, ParseFloatError>,
) -> Result<Vec<Option<f64>>, ProcessingError> {
    cells
        .enumerate()
        .map(|(row, cell)| {
            if cell.is_empty() {
                return Ok(None);
            }
            coerce(cell).map(Some).map_err(|_| ProcessingError::Coercion {
                column: name.to_string(),
                row,
                value: cell.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn part_replaces_comma_with_point() {
        assert_eq!(coerce_part("12,34").unwrap(), 12.34);
        assert_eq!(coerce_part("0,5").unwrap(), 0.5);
    }

    #[test]
    fn part_with_thousands_and_decimal_is_not_handled() {
        // Only the comma is replaced; the thousands dot survives.
        assert!(coerce_part("1.234,56").is_err());
    }

    #[test]
    fn theorical_qty_drops_thousands_points() {
        assert_eq!(coerce_theorical_qty("1.234.567").unwrap(), 1_234_567.0);
        assert_eq!(coerce_theorical_qty("42").unwrap(), 42.0);
    }

    #[test]
    fn reference_date_is_days_since_unix_epoch() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(days_since_epoch(epoch).unwrap(), 0);
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(days_since_epoch(day).unwrap(), 19_797);
    }

    #[test]
    fn cells_are_trimmed_before_coercion() {
        let table = RawTable {
            headers: vec![
                "segment".into(),
                "cod".into(),
                "asset".into(),
                "type".into(),
                "part".into(),
                "partAcum".into(),
                "theoricalQty".into(),
            ],
            rows: vec![vec![
                "".into(),
                " PETR4 ".into(),
                "PETROBRAS".into(),
                "PN  N2   ".into(),
                " 8,1 ".into(),
                "8,1".into(),
                " 1.000 ".into(),
            ]],
        };
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let df = process_table(&table, today).unwrap();

        let cod = df.column("cod").unwrap().str().unwrap();
        assert_eq!(cod.get(0), Some("PETR4"));
        let ty = df.column("type").unwrap().str().unwrap();
        assert_eq!(ty.get(0), Some("PN  N2"));
        let segment = df.column("segment").unwrap().str().unwrap();
        assert_eq!(segment.get(0), None);
        assert_eq!(df.column("part").unwrap().f64().unwrap().get(0), Some(8.1));
        assert_eq!(
            df.column("theoricalQty").unwrap().f64().unwrap().get(0),
            Some(1000.0)
        );
    }

    #[test]
    fn coercion_error_names_the_cell() {
        let table = RawTable {
            headers: vec!["part".into(), "theoricalQty".into()],
            rows: vec![vec!["1,0".into(), "10".into()], vec!["abc".into(), "20".into()]],
        };
        let err = process_table(&table, NaiveDate::default()).unwrap_err();
        match err {
            ProcessingError::Coercion { column, row, value } => {
                assert_eq!(column, "part");
                assert_eq!(row, 1);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
