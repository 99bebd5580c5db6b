//! Validation of the downloaded composition file.
//!
//! Some payload variants carry a title line above the header
//! (`IBOV - Carteira do Dia ...`). Parsing therefore has two explicit
//! attempts: header on line 1, then header on line 2. Which one succeeded
//! is part of the result so callers can see when the fallback kicked in.

use crate::schema::{RawTable, SEPARATOR};
use crate::text;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info};

/// Errors from validating the local file.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file could not be parsed: {0}")]
    Unparseable(String),

    #[error("file has no data rows")]
    EmptyData,

    #[error("missing columns in file: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },
}

/// Which parse attempt produced the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    /// Header on the first line.
    Primary,
    /// First line skipped, header on the second.
    Fallback,
}

/// Result of the two-attempt parse.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Primary(RawTable),
    Fallback(RawTable),
    Failed(String),
}

impl ParseOutcome {
    pub fn strategy(&self) -> Option<ParseStrategy> {
        match self {
            ParseOutcome::Primary(_) => Some(ParseStrategy::Primary),
            ParseOutcome::Fallback(_) => Some(ParseStrategy::Fallback),
            ParseOutcome::Failed(_) => None,
        }
    }

    pub fn into_table(self) -> Result<RawTable, String> {
        match self {
            ParseOutcome::Primary(t) | ParseOutcome::Fallback(t) => Ok(t),
            ParseOutcome::Failed(reason) => Err(reason),
        }
    }
}

/// Parse `;`-separated text with the header on the first line.
///
/// Short records are padded with empty cells. A record longer than the
/// header is an error.
pub fn parse_delimited(content: &str) -> Result<RawTable, String> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(SEPARATOR)
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() {
        return Err("no columns to parse from file".into());
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| e.to_string())?;
        if record.len() > headers.len() {
            let line = record.position().map_or(0, |p| p.line());
            return Err(format!(
                "expected {} fields in line {line}, saw {}",
                headers.len(),
                record.len()
            ));
        }
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}

/// Parse decoded file bytes: primary attempt, then the skip-one-line fallback.
pub fn parse_with_fallback(bytes: &[u8]) -> ParseOutcome {
    let content = text::decode(bytes);

    let primary_err = match parse_delimited(&content) {
        Ok(table) => return ParseOutcome::Primary(table),
        Err(e) => e,
    };
    info!(reason = %primary_err, "primary parse failed, retrying without the first line");

    let rest = content.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
    match parse_delimited(rest) {
        Ok(table) => ParseOutcome::Fallback(table),
        Err(fallback_err) => ParseOutcome::Failed(format!(
            "primary: {primary_err}; skipping first line: {fallback_err}"
        )),
    }
}

/// Check a parsed table: non-empty, then all required columns present.
pub fn check_table(table: &RawTable) -> Result<(), ValidationError> {
    if table.is_empty() {
        return Err(ValidationError::EmptyData);
    }
    let missing = table.missing_required();
    if !missing.is_empty() {
        return Err(ValidationError::MissingColumns { missing });
    }
    Ok(())
}

/// Validate the local file at `path`.
pub fn validate(path: &Path) -> Result<ParseStrategy, ValidationError> {
    let result = validate_inner(path);
    if let Err(e) = &result {
        error!(path = %path.display(), "file validation failed: {e}");
    }
    result
}

fn validate_inner(path: &Path) -> Result<ParseStrategy, ValidationError> {
    let bytes = fs::read(path).map_err(|source| ValidationError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let content = text::decode(&bytes);
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyData);
    }
    let mut lines = content.lines();
    debug!(lines = content.lines().count(), "file line count");
    if let Some(first) = lines.next() {
        debug!(line = first, "first line");
    }
    if let Some(second) = lines.next() {
        debug!(line = second, "second line");
    }

    let outcome = parse_with_fallback(&bytes);
    let strategy = outcome.strategy();
    let table = outcome.into_table().map_err(ValidationError::Unparseable)?;

    info!(
        columns = ?table.headers,
        rows = table.height(),
        "parsed composition file"
    );
    check_table(&table)?;

    let strategy = strategy.unwrap_or(ParseStrategy::Primary);
    info!(?strategy, "file validated");
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "segment;cod;asset;type;part;partAcum;theoricalQty";

    #[test]
    fn primary_parse_reads_header_on_first_line() {
        let csv = format!("{HEADER}\n;PETR4;PETROBRAS;PN N2;8,123;8,123;4.566.445.852\n");
        match parse_with_fallback(csv.as_bytes()) {
            ParseOutcome::Primary(t) => {
                assert_eq!(t.headers.len(), 7);
                assert_eq!(t.rows[0][1], "PETR4");
            }
            other => panic!("expected primary, got {other:?}"),
        }
    }

    #[test]
    fn title_line_triggers_fallback() {
        let csv = format!("IBOV - Carteira do Dia 15/03/24\n{HEADER}\n;VALE3;VALE;ON NM;11,2;19,3;4.196.924.316\n");
        let outcome = parse_with_fallback(csv.as_bytes());
        assert_eq!(outcome.strategy(), Some(ParseStrategy::Fallback));
        let t = outcome.into_table().unwrap();
        assert_eq!(t.headers[1], "cod");
        assert_eq!(t.height(), 1);
    }

    #[test]
    fn both_attempts_failing_reports_both_reasons() {
        let csv = "a;b\n1;2;3\n4;5;6;7\n";
        match parse_with_fallback(csv.as_bytes()) {
            ParseOutcome::Failed(reason) => {
                assert!(reason.contains("primary"));
                assert!(reason.contains("skipping first line"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn short_rows_are_padded_with_empty_cells() {
        let csv = format!("{HEADER}\n;PETR4;PETROBRAS;PN N2;8,123;8,123\n");
        match parse_with_fallback(csv.as_bytes()) {
            ParseOutcome::Primary(t) => {
                assert_eq!(t.rows[0].len(), 7);
                assert_eq!(t.rows[0][6], "");
            }
            other => panic!("expected primary, got {other:?}"),
        }
    }

    #[test]
    fn long_rows_are_rejected() {
        let err = parse_delimited("a;b\n1;2;3\n").unwrap_err();
        assert!(err.contains("expected 2 fields"), "{err}");
    }

    #[test]
    fn empty_input_is_unparseable() {
        assert!(matches!(parse_with_fallback(b""), ParseOutcome::Failed(_)));
    }

    #[test]
    fn header_only_table_is_empty_data() {
        let t = parse_delimited(HEADER).unwrap();
        assert!(matches!(check_table(&t), Err(ValidationError::EmptyData)));
    }

    #[test]
    fn empty_check_runs_before_column_check() {
        let t = parse_delimited("x;y\n").unwrap();
        assert!(matches!(check_table(&t), Err(ValidationError::EmptyData)));
    }
}
