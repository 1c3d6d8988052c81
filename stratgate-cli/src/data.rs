//! Price ingestion for the CLI — CSV files with a synthetic fallback.
//!
//! CSV layout: a header row, then `date,close` records with ISO dates
//! (`2024-01-02,471.33`). Extra columns are ignored.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::path::Path;

use stratgate_core::TimeSeries;

/// Load a (date, close) series from a CSV file.
pub fn load_csv_series(path: &Path) -> Result<TimeSeries> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("cannot open price file {}", path.display()))?;

    let headers = reader.headers()?.clone();
    let date_idx = column_index(&headers, &["date", "timestamp"])?;
    let close_idx = column_index(&headers, &["close", "adj_close", "price", "value"])?;

    let mut points = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let date_field = record
            .get(date_idx)
            .with_context(|| format!("row {}: missing date column", line + 2))?;
        let close_field = record
            .get(close_idx)
            .with_context(|| format!("row {}: missing close column", line + 2))?;

        let date = NaiveDate::parse_from_str(date_field.trim(), "%Y-%m-%d")
            .with_context(|| format!("row {}: bad date '{date_field}'", line + 2))?;
        let close: f64 = close_field
            .trim()
            .parse()
            .with_context(|| format!("row {}: bad close '{close_field}'", line + 2))?;
        points.push((date, close));
    }

    if points.is_empty() {
        bail!("price file {} holds no records", path.display());
    }

    TimeSeries::new(points).context("price file violates series ordering")
}

fn column_index(headers: &csv::StringRecord, names: &[&str]) -> Result<usize> {
    for (i, header) in headers.iter().enumerate() {
        let normalized = header.trim().to_ascii_lowercase();
        if names.contains(&normalized.as_str()) {
            return Ok(i);
        }
    }
    bail!("price file is missing a {} column", names[0]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_simple_csv() {
        let file = write_csv("date,close\n2024-01-02,100.0\n2024-01-03,101.5\n");
        let series = load_csv_series(file.path()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.values(), vec![100.0, 101.5]);
    }

    #[test]
    fn accepts_extra_columns_and_alternate_names() {
        let file = write_csv(
            "timestamp,open,adj_close,volume\n2024-01-02,99.0,100.0,5000\n2024-01-03,100.1,101.5,6000\n",
        );
        let series = load_csv_series(file.path()).unwrap();
        assert_eq!(series.values(), vec![100.0, 101.5]);
    }

    #[test]
    fn rejects_missing_close_column() {
        let file = write_csv("date,open\n2024-01-02,99.0\n");
        assert!(load_csv_series(file.path()).is_err());
    }

    #[test]
    fn rejects_bad_date() {
        let file = write_csv("date,close\n01/02/2024,100.0\n");
        assert!(load_csv_series(file.path()).is_err());
    }

    #[test]
    fn rejects_out_of_order_rows() {
        let file = write_csv("date,close\n2024-01-03,100.0\n2024-01-02,101.0\n");
        assert!(load_csv_series(file.path()).is_err());
    }

    #[test]
    fn rejects_empty_file() {
        let file = write_csv("date,close\n");
        assert!(load_csv_series(file.path()).is_err());
    }
}
