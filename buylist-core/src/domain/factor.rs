//! Factor rows and the single-date snapshot built from them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One row of a factor file: a symbol's score and close on a trade date.
///
/// `factor` and `close` are `None` when the source value was null or NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorRecord {
    pub symbol: String,
    pub trade_date: NaiveDate,
    pub factor: Option<f64>,
    pub close: Option<f64>,
}

impl FactorRecord {
    pub fn new(symbol: impl Into<String>, trade_date: NaiveDate, factor: f64, close: f64) -> Self {
        Self {
            symbol: symbol.into(),
            trade_date,
            factor: Some(factor),
            close: Some(close),
        }
    }
}

/// The rows of a factor file for its most recent trade date (the T-date).
///
/// Row order is the file's row order and serves as the join order for
/// deterministic tie-breaking during ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorSnapshot {
    /// File the snapshot was read from.
    pub source: PathBuf,
    /// Period label parsed from the file name (`factor_{label}.parquet`).
    pub label: String,
    pub t_date: NaiveDate,
    pub records: Vec<FactorRecord>,
}

impl FactorSnapshot {
    /// Build a snapshot from raw rows, keeping only the rows of the latest date.
    ///
    /// Returns `None` when `rows` is empty.
    pub fn from_rows(source: PathBuf, label: String, rows: Vec<FactorRecord>) -> Option<Self> {
        let t_date = rows.iter().map(|r| r.trade_date).max()?;
        let records = rows.into_iter().filter(|r| r.trade_date == t_date).collect();
        Some(Self {
            source,
            label,
            t_date,
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// BLAKE3 over the T-date rows, for provenance in cycle reports.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.t_date.to_string().as_bytes());
        for r in &self.records {
            hasher.update(r.symbol.as_bytes());
            hasher.update(&r.factor.unwrap_or(f64::NAN).to_le_bytes());
            hasher.update(&r.close.unwrap_or(f64::NAN).to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}
