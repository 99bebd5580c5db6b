//! Column contract and on-disk layout of the IBOV composition file.
//!
//! Downstream consumers query the uploaded Parquet by these names, so the
//! required set is a schema boundary: it must be present in every table
//! this crate hands out.

/// Market segment.
pub const SEGMENT: &str = "segment";
/// Ticker code (e.g. `PETR4`).
pub const COD: &str = "cod";
/// Issuer short name.
pub const ASSET: &str = "asset";
/// Share class / listing type.
pub const TYPE: &str = "type";
/// Participation in the index (%), comma-decimal text on the wire.
pub const PART: &str = "part";
/// Accumulated participation (%).
pub const PART_ACUM: &str = "partAcum";
/// Theoretical quantity, dot-thousands text on the wire.
pub const THEORICAL_QTY: &str = "theoricalQty";

/// Processing date stamped by the transformer.
pub const DATA_REFERENCIA: &str = "data_referencia";
/// Storage locator stamped by the uploader.
pub const SOURCE_PATH: &str = "source_path";

/// Columns every composition file must carry.
pub const REQUIRED_COLUMNS: [&str; 7] = [SEGMENT, COD, ASSET, TYPE, PART, PART_ACUM, THEORICAL_QTY];

/// Field separator of the local file.
pub const SEPARATOR: u8 = b';';

/// Local file name for a given day: `IBOVDia_<ddmmyy>.csv`.
pub fn local_file_name(date: chrono::NaiveDate) -> String {
    format!("IBOVDia_{}.csv", date.format("%d%m%y"))
}

/// A parsed delimited file: header names plus text cells, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Required columns absent from the header, sorted.
    pub fn missing_required(&self) -> Vec<String> {
        let mut missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| self.column_index(c).is_none())
            .map(|c| c.to_string())
            .collect();
        missing.sort();
        missing
    }

    /// All cells of one column, top to bottom.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(move |r| r.get(idx).map(String::as_str).unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn file_name_uses_two_digit_day_month_year() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(local_file_name(d), "IBOVDia_050324.csv");
    }

    #[test]
    fn missing_required_is_sorted_and_ignores_extras() {
        let t = RawTable {
            headers: vec!["cod".into(), "extra".into(), "part".into()],
            rows: vec![],
        };
        assert_eq!(
            t.missing_required(),
            vec!["asset", "partAcum", "segment", "theoricalQty", "type"]
        );
    }
}
