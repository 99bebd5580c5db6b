//! Validator and transformer against on-disk fixtures.

use chrono::NaiveDate;
use ibov_core::schema::REQUIRED_COLUMNS;
use ibov_core::{process, validate, ParseStrategy, ProcessingError, ValidationError};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn ten_row_fixture_validates_with_primary_parse() {
    let strategy = validate(&fixture("ibov_ten_rows.csv")).unwrap();
    assert_eq!(strategy, ParseStrategy::Primary);
}

#[test]
fn ten_row_fixture_transforms_into_ten_typed_rows() {
    let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    let df = process(&fixture("ibov_ten_rows.csv"), today).unwrap();

    assert_eq!(df.height(), 10);
    assert_eq!(df.column("part").unwrap().dtype(), &DataType::Float64);
    assert_eq!(df.column("theoricalQty").unwrap().dtype(), &DataType::Float64);
    assert_eq!(df.column("data_referencia").unwrap().dtype(), &DataType::Date);

    let part = df.column("part").unwrap().f64().unwrap();
    assert_eq!(part.get(0), Some(0.476));
    let qty = df.column("theoricalQty").unwrap().f64().unwrap();
    assert_eq!(qty.get(1), Some(4_394_835_131.0));

    let days = df.column("data_referencia").unwrap().date().unwrap();
    let expected = (today - NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()).num_days() as i32;
    for i in 0..10 {
        assert_eq!(days.get(i), Some(expected));
    }

    for col in REQUIRED_COLUMNS {
        assert!(df.column(col).is_ok(), "missing {col}");
    }
}

#[test]
fn title_line_validates_through_fallback_but_fails_transform() {
    let path = fixture("ibov_title_line.csv");
    assert_eq!(validate(&path).unwrap(), ParseStrategy::Fallback);

    // The transformer only uses the primary parse.
    let err = process(&path, NaiveDate::default()).unwrap_err();
    assert!(matches!(err, ProcessingError::Parse(_)));
}

#[test]
fn each_missing_required_column_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    for dropped in REQUIRED_COLUMNS {
        let kept: Vec<&str> = REQUIRED_COLUMNS.iter().copied().filter(|c| *c != dropped).collect();
        let row = vec!["x"; kept.len()];
        let path = dir.path().join(format!("{dropped}.csv"));
        fs::write(&path, format!("{}\n{}\n", kept.join(";"), row.join(";"))).unwrap();

        match validate(&path) {
            Err(ValidationError::MissingColumns { missing }) => {
                assert_eq!(missing, vec![dropped.to_string()]);
            }
            other => panic!("dropping {dropped}: expected MissingColumns, got {other:?}"),
        }
    }
}

#[test]
fn extra_columns_are_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("extra.csv");
    fs::write(
        &path,
        "reductor;segment;cod;asset;type;part;partAcum;theoricalQty;note\n\
         1;;PETR4;PETROBRAS;PN;8,1;8,1;1.000;ok\n",
    )
    .unwrap();
    assert_eq!(validate(&path).unwrap(), ParseStrategy::Primary);
}

#[test]
fn header_only_file_is_empty_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.csv");
    fs::write(&path, format!("{}\n", REQUIRED_COLUMNS.join(";"))).unwrap();
    assert!(matches!(validate(&path), Err(ValidationError::EmptyData)));
}

#[test]
fn short_row_is_padded_and_transforms_to_null() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.csv");
    fs::write(
        &path,
        format!(
            "{}\n;PETR4;PETROBRAS;PN N2;8,123;8,123\n;VALE3;VALE;ON NM;11,204;19,327;4.196.924.316\n",
            REQUIRED_COLUMNS.join(";")
        ),
    )
    .unwrap();

    assert_eq!(validate(&path).unwrap(), ParseStrategy::Primary);
    let df = process(&path, NaiveDate::default()).unwrap();
    let qty = df.column("theoricalQty").unwrap().f64().unwrap();
    assert_eq!(qty.get(0), None);
    assert_eq!(qty.get(1), Some(4_196_924_316.0));
}

#[test]
fn blank_file_is_empty_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blank.csv");
    fs::write(&path, "\n").unwrap();
    assert!(matches!(validate(&path), Err(ValidationError::EmptyData)));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = validate(Path::new("/nonexistent/IBOVDia_010101.csv")).unwrap_err();
    assert!(matches!(err, ValidationError::Io { .. }));
}

#[test]
fn mixed_separator_part_fails_processing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.csv");
    fs::write(
        &path,
        format!(
            "{}\n;PETR4;PETROBRAS;PN;1.234,56;8,1;1.000\n",
            REQUIRED_COLUMNS.join(";")
        ),
    )
    .unwrap();

    validate(&path).unwrap();
    let err = process(&path, NaiveDate::default()).unwrap_err();
    match err {
        ProcessingError::Coercion { column, value, .. } => {
            assert_eq!(column, "part");
            assert_eq!(value, "1.234,56");
        }
        other => panic!("expected coercion error, got {other}"),
    }
}
