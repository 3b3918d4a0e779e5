//! Data source traits and structured error types.
//!
//! The cycle consumes three external collaborators: a security master, an
//! execution-day resolver and a latest-price source. Traits keep the file-backed
//! implementations swappable and let tests supply in-memory markets.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

use crate::domain::{ExecutionQuote, FactorSnapshot, SecurityMeta};

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no factor snapshot found in {}", .dir.display())]
    SnapshotUnavailable { dir: PathBuf },

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("csv error: {0}")]
    CsvError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data error: {0}")]
    Other(String),
}

/// Which factor file a cycle should use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeriodSelector {
    /// The lexicographically-last file.
    Latest,
    /// A specific period label, falling back to the latest file when absent.
    Target(String),
}

/// Source of factor snapshots.
pub trait FactorSource {
    fn load(&self, selector: &PeriodSelector) -> Result<FactorSnapshot, DataError>;
}

/// Static reference data (`stock_basic`).
pub trait SecurityMaster {
    /// Metadata for the requested symbols. Unknown symbols are absent from the map.
    fn lookup(&self, symbols: &[String]) -> Result<HashMap<String, SecurityMeta>, DataError>;
}

/// Forward quotes for the session(s) after a date.
///
/// Implementations may return several rows per symbol; callers reduce them
/// with [`crate::execution::dedup_quotes`].
pub trait ExecutionDayResolver {
    fn forward_quotes(
        &self,
        after: NaiveDate,
        symbols: &[String],
    ) -> Result<Vec<ExecutionQuote>, DataError>;
}

/// Latest known price per symbol, used to mark prior holdings to market.
pub trait PriceSource {
    /// Symbols without a usable price are absent from the map.
    fn latest_prices(&self, symbols: &[String]) -> Result<HashMap<String, f64>, DataError>;
}
