//! Factor snapshot store.
//!
//! Layout: `{dir}/factor_{LABEL}.parquet`, one file per computation period
//! (e.g. `factor_2026-02.parquet`). Each file holds `symbol`, `trade_date`,
//! `factor` and `close` rows for one or more dates; a snapshot keeps only the
//! rows of the file's latest trade date.

use chrono::NaiveDate;
use log::{info, warn};
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use super::parquet::{
    date_column, date_series, f64_column, read_parquet, require_columns, string_column,
    write_parquet_atomic,
};
use super::provider::{DataError, FactorSource, PeriodSelector};
use crate::domain::{normalize_symbol, FactorRecord, FactorSnapshot};

const PREFIX: &str = "factor_";
const EXTENSION: &str = ".parquet";

pub const SNAPSHOT_COLUMNS: [&str; 4] = ["symbol", "trade_date", "factor", "close"];

/// Directory of factor files.
pub struct FactorSnapshotStore {
    dir: PathBuf,
}

impl FactorSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file for a period label.
    pub fn path_for(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{PREFIX}{label}{EXTENSION}"))
    }

    /// All factor files, sorted by file name.
    pub fn list(&self) -> Result<Vec<PathBuf>, DataError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if label_of(&path).is_some() && path.is_file() {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Pick the file a selector refers to.
    ///
    /// A missing target period falls back to the lexicographically-last file.
    pub fn resolve(&self, selector: &PeriodSelector) -> Result<PathBuf, DataError> {
        if let PeriodSelector::Target(label) = selector {
            let path = self.path_for(label);
            if path.is_file() {
                return Ok(path);
            }
            warn!(
                "factor file for period '{label}' not found in {}, falling back to the latest file",
                self.dir.display()
            );
        }
        self.list()?
            .pop()
            .ok_or_else(|| DataError::SnapshotUnavailable {
                dir: self.dir.clone(),
            })
    }

    /// Write a factor file for `label` (atomic).
    pub fn write(&self, label: &str, records: &[FactorRecord]) -> Result<PathBuf, DataError> {
        if records.is_empty() {
            return Err(DataError::ValidationError("no factor rows to write".into()));
        }
        let path = self.path_for(label);
        let mut df = records_to_dataframe(records)?;
        write_parquet_atomic(&mut df, &path)?;
        Ok(path)
    }
}

impl FactorSource for FactorSnapshotStore {
    fn load(&self, selector: &PeriodSelector) -> Result<FactorSnapshot, DataError> {
        let path = self.resolve(selector)?;
        let label = label_of(&path).unwrap_or_default();
        let rows = load_factor_file(&path)?;
        let total = rows.len();
        let snapshot = FactorSnapshot::from_rows(path.clone(), label, rows).ok_or_else(|| {
            DataError::ValidationError(format!("{} has no dated rows", path.display()))
        })?;
        info!(
            "loaded factor snapshot {} (T-date {}, {} of {} rows)",
            path.display(),
            snapshot.t_date,
            snapshot.len(),
            total
        );
        Ok(snapshot)
    }
}

/// `factor_2026-02.parquet` → `2026-02`.
fn label_of(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    name.strip_prefix(PREFIX)?
        .strip_suffix(EXTENSION)
        .map(str::to_string)
}

/// Read every row of a factor file. Rows without a symbol or date are skipped.
pub fn load_factor_file(path: &Path) -> Result<Vec<FactorRecord>, DataError> {
    let df = read_parquet(path)?;
    if df.height() == 0 {
        return Err(DataError::ValidationError(format!(
            "empty factor file {}",
            path.display()
        )));
    }
    require_columns(&df, &SNAPSHOT_COLUMNS)?;

    let symbols = string_column(&df, "symbol")?;
    let dates = date_column(&df, "trade_date")?;
    let factors = f64_column(&df, "factor")?;
    let closes = f64_column(&df, "close")?;

    let rows = symbols
        .into_iter()
        .zip(dates)
        .zip(factors.into_iter().zip(closes))
        .filter_map(|((symbol, date), (factor, close))| {
            Some(FactorRecord {
                symbol: normalize_symbol(&symbol?),
                trade_date: date?,
                factor,
                close,
            })
        })
        .collect();
    Ok(rows)
}

fn records_to_dataframe(records: &[FactorRecord]) -> Result<DataFrame, DataError> {
    let symbols: Vec<&str> = records.iter().map(|r| r.symbol.as_str()).collect();
    let dates: Vec<NaiveDate> = records.iter().map(|r| r.trade_date).collect();
    let factors: Vec<Option<f64>> = records.iter().map(|r| r.factor).collect();
    let closes: Vec<Option<f64>> = records.iter().map(|r| r.close).collect();

    DataFrame::new(vec![
        Column::new("symbol".into(), symbols),
        date_series("trade_date", &dates)?,
        Column::new("factor".into(), factors),
        Column::new("close".into(), closes),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}
