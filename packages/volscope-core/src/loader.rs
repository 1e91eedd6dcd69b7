//! CSV price loading.
//!
//! Reads a daily price file, keeps rows with a parseable date and a positive price,
//! and derives simple returns.

use crate::types::{PriceData, PriceSeries};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Date column header.
pub const DATE_COLUMN: &str = "Date";

/// Price column headers in order of preference.
pub const PRICE_COLUMNS: [&str; 2] = ["Adj Close", "Close"];

/// Load a price file and derive its daily returns.
///
/// The instrument name is the file stem (`data/TSLA.csv` -> `TSLA`).
///
/// # Errors
///
/// - [`Error::MissingColumn`] if there is no `Date` column, or neither `Adj Close` nor `Close`
/// - [`Error::EmptyData`] if fewer than two valid rows remain
/// - [`Error::Io`] / [`Error::Csv`] if the file cannot be read
pub fn load_price_series(path: impl AsRef<Path>) -> Result<PriceData> {
    let path = path.as_ref();
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let file = File::open(path)?;
    read_price_series(&name, BufReader::new(file))
}

/// Parse price rows from any CSV reader.
pub fn read_price_series<R: Read>(name: &str, reader: R) -> Result<PriceData> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();

    let date_idx = headers
        .iter()
        .position(|h| h == DATE_COLUMN)
        .ok_or_else(|| Error::MissingColumn(format!("{}: no '{}' column", name, DATE_COLUMN)))?;

    let (price_idx, price_column) = PRICE_COLUMNS
        .iter()
        .find_map(|col| headers.iter().position(|h| h == *col).map(|i| (i, *col)))
        .ok_or_else(|| {
            Error::MissingColumn(format!("{}: neither 'Close' nor 'Adj Close' found", name))
        })?;

    let mut rows: Vec<(NaiveDate, f64)> = Vec::new();
    let mut dropped = 0usize;

    for (line, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("{}: skipping malformed record {}: {}", name, line + 1, e);
                dropped += 1;
                continue;
            }
        };

        let date = record.get(date_idx).and_then(parse_date);
        let price = record.get(price_idx).and_then(parse_price);

        match (date, price) {
            (Some(date), Some(price)) => rows.push((date, price)),
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        tracing::debug!("{}: dropped {} rows with invalid date or price", name, dropped);
    }

    // Stable sort keeps the first occurrence of a duplicated date first
    rows.sort_by_key(|(date, _)| *date);
    rows.dedup_by_key(|(date, _)| *date);

    if rows.len() < 2 {
        return Err(Error::EmptyData(format!(
            "{}: {} valid rows, need at least 2 to compute returns",
            name,
            rows.len()
        )));
    }

    let (dates, prices): (Vec<_>, Vec<_>) = rows.into_iter().unzip();
    Ok(PriceData::new(name, price_column, PriceSeries::new(dates, prices)))
}

/// Parse a date in one of the formats commonly found in price exports.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS`, RFC 3339 and `MM/DD/YYYY`.
/// Time components are discarded.
pub fn parse_date(field: &str) -> Option<NaiveDate> {
    let field = field.trim();
    if field.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(field, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(field, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(field).ok().map(|dt| dt.date_naive()))
        .or_else(|| NaiveDate::parse_from_str(field, "%m/%d/%Y").ok())
}

/// Parse a price, rejecting non-numeric, non-finite and non-positive values.
pub fn parse_price(field: &str) -> Option<f64> {
    field
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|p| p.is_finite() && *p > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_prefers_adj_close() {
        let csv = "Date,Open,Close,Adj Close\n\
                   2024-01-02,1,100,50\n\
                   2024-01-03,1,110,55\n";
        let data = read_price_series("SPY", csv.as_bytes()).unwrap();

        assert_eq!(data.price_column, "Adj Close");
        assert_eq!(data.prices.prices, vec![50.0, 55.0]);
        assert!((data.returns.values[0] - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_falls_back_to_close() {
        let csv = "Date,Close\n2024-01-02,100\n2024-01-03,110\n2024-01-04,99\n";
        let data = read_price_series("BND", csv.as_bytes()).unwrap();

        assert_eq!(data.price_column, "Close");
        assert_eq!(data.prices.len(), 3);
        assert_eq!(data.returns.len(), 2);
    }

    #[test]
    fn test_missing_price_column() {
        let csv = "Date,Open,Volume\n2024-01-02,1,100\n";
        let result = read_price_series("X", csv.as_bytes());
        assert!(matches!(result, Err(Error::MissingColumn(_))));
    }

    #[test]
    fn test_missing_date_column() {
        let csv = "Day,Close\n2024-01-02,1\n";
        let result = read_price_series("X", csv.as_bytes());
        assert!(matches!(result, Err(Error::MissingColumn(_))));
    }

    #[test]
    fn test_drops_bad_rows_and_sorts() {
        let csv = "Date,Close\n\
                   2024-01-04,99\n\
                   not-a-date,105\n\
                   2024-01-02,100\n\
                   2024-01-05,abc\n\
                   2024-01-06,-3\n\
                   2024-01-03,110\n";
        let data = read_price_series("X", csv.as_bytes()).unwrap();

        assert_eq!(
            data.prices.dates,
            vec![ymd(2024, 1, 2), ymd(2024, 1, 3), ymd(2024, 1, 4)]
        );
        assert_eq!(data.prices.prices, vec![100.0, 110.0, 99.0]);
    }

    #[test]
    fn test_duplicate_dates_keep_first() {
        let csv = "Date,Close\n2024-01-02,100\n2024-01-02,200\n2024-01-03,110\n";
        let data = read_price_series("X", csv.as_bytes()).unwrap();
        assert_eq!(data.prices.prices, vec![100.0, 110.0]);
    }

    #[test]
    fn test_empty_data() {
        let csv = "Date,Close\n2024-01-02,100\nbad,1\n";
        let result = read_price_series("X", csv.as_bytes());
        assert!(matches!(result, Err(Error::EmptyData(_))));

        let header_only = "Date,Close\n";
        let result = read_price_series("X", header_only.as_bytes());
        assert!(matches!(result, Err(Error::EmptyData(_))));
    }

    #[test]
    fn test_ragged_rows_skipped() {
        let csv = "Date,Close\n2024-01-02,100\n2024-01-03\n2024-01-04,101,extra\n2024-01-05,102\n";
        let data = read_price_series("X", csv.as_bytes()).unwrap();
        assert_eq!(data.prices.prices, vec![100.0, 101.0, 102.0]);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = Some(ymd(2023, 7, 14));
        assert_eq!(parse_date("2023-07-14"), expected);
        assert_eq!(parse_date("2023-07-14 00:00:00"), expected);
        assert_eq!(parse_date("2023-07-14T16:00:00-04:00"), expected);
        assert_eq!(parse_date("07/14/2023"), expected);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("14.07.2023"), None);
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price(" 12.5 "), Some(12.5));
        assert_eq!(parse_price("0"), None);
        assert_eq!(parse_price("NaN"), None);
        assert_eq!(parse_price("inf"), None);
        assert_eq!(parse_price(""), None);
    }

    #[test]
    fn test_load_from_file_uses_stem() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "Date,Close").unwrap();
        writeln!(file, "2024-01-02,100.5").unwrap();
        writeln!(file, "2024-01-03,101.2").unwrap();

        let data = load_price_series(file.path()).unwrap();
        let stem = file.path().file_stem().unwrap().to_string_lossy().into_owned();
        assert_eq!(data.name, stem);
        assert_eq!(data.prices.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let result = load_price_series("/definitely/not/here.csv");
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
