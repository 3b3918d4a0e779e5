//! Parquet I/O helpers shared by the snapshot store and the price history.
//!
//! Files are produced by external tooling, so column types are coerced on
//! read: numbers to `f64`, datetimes to dates, and date strings are parsed.
//! Writes are atomic (write to .tmp, rename into place).

use chrono::NaiveDate;
use polars::prelude::*;
use std::fs;
use std::path::Path;

use super::provider::DataError;

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

pub(crate) fn days_since_epoch(date: NaiveDate) -> i32 {
    (date - epoch()).num_days() as i32
}

/// Read a whole Parquet file into a DataFrame.
pub(crate) fn read_parquet(path: &Path) -> Result<DataFrame, DataError> {
    let file = fs::File::open(path)
        .map_err(|e| DataError::ParquetError(format!("open {}: {e}", path.display())))?;
    ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read {}: {e}", path.display())))
}

/// Write a DataFrame to `path` atomically.
pub(crate) fn write_parquet_atomic(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = path.with_extension("parquet.tmp");
    let file = fs::File::create(&tmp_path)
        .map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DataError::ParquetError(format!("atomic rename failed: {e}"))
    })
}

/// Fail with a validation error naming the first missing column.
pub(crate) fn require_columns(df: &DataFrame, columns: &[&str]) -> Result<(), DataError> {
    for name in columns {
        if df.column(name).is_err() {
            return Err(DataError::ValidationError(format!(
                "missing column '{name}'"
            )));
        }
    }
    Ok(())
}

fn column_err(name: &str) -> impl Fn(PolarsError) -> DataError + '_ {
    move |e| DataError::ParquetError(format!("column '{name}': {e}"))
}

/// Read a column as strings. Integer codes are cast to their decimal text.
pub(crate) fn string_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, DataError> {
    let casted = df
        .column(name)
        .map_err(column_err(name))?
        .cast(&DataType::String)
        .map_err(column_err(name))?;
    let ca = casted.str().map_err(column_err(name))?;
    Ok((0..ca.len()).map(|i| ca.get(i).map(str::to_string)).collect())
}

/// Read a numeric column as `f64`. Nulls and NaN become `None`.
pub(crate) fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, DataError> {
    let casted = df
        .column(name)
        .map_err(column_err(name))?
        .cast(&DataType::Float64)
        .map_err(column_err(name))?;
    let ca = casted.f64().map_err(column_err(name))?;
    Ok((0..ca.len())
        .map(|i| ca.get(i).filter(|v| v.is_finite()))
        .collect())
}

/// Read a date column. Accepts Date, Datetime and `YYYY-MM-DD`-prefixed strings.
pub(crate) fn date_column(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>, DataError> {
    let column = df.column(name).map_err(column_err(name))?;

    if matches!(column.dtype(), DataType::String) {
        let ca = column.str().map_err(column_err(name))?;
        return Ok((0..ca.len())
            .map(|i| ca.get(i).and_then(parse_date_prefix))
            .collect());
    }

    let casted = column.cast(&DataType::Date).map_err(column_err(name))?;
    let ca = casted.date().map_err(column_err(name))?;
    let epoch = epoch();
    Ok((0..ca.len())
        .map(|i| ca.get(i).map(|days| epoch + chrono::Duration::days(days as i64)))
        .collect())
}

/// Parse `2026-02-27`, `2026-02-27 00:00:00` or `20260227`.
pub(crate) fn parse_date_prefix(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Some(head) = s.get(..10) {
        if let Ok(d) = NaiveDate::parse_from_str(head, "%Y-%m-%d") {
            return Some(d);
        }
    }
    s.get(..8)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y%m%d").ok())
}

/// Build a Date column from chrono dates.
pub(crate) fn date_series(name: &str, dates: &[NaiveDate]) -> Result<Column, DataError> {
    let days: Vec<i32> = dates.iter().map(|d| days_since_epoch(*d)).collect();
    Column::new(name.into(), days)
        .cast(&DataType::Date)
        .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))
}
