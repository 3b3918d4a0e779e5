//! Holdings repository: the state carried from one cycle to the next.
//!
//! The written artifact of a cycle is the next cycle's rollover input. Storage
//! sits behind [`HoldingsRepository`] so the algorithm never touches files.

pub mod csv_store;
pub mod memory;

pub use csv_store::{holdings_to_csv, parse_holdings_csv, CsvHoldingsStore, HOLDINGS_COLUMNS};
pub use memory::MemoryHoldingsStore;

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::HoldingSet;

/// Errors from a holdings repository.
#[derive(Debug, Error)]
pub enum HoldingsError {
    #[error("holdings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("holdings csv error: {0}")]
    Csv(String),

    #[error("refusing to save invalid holdings: {0}")]
    Invalid(String),
}

/// Load and save the holdings artifact.
pub trait HoldingsRepository {
    /// The current artifact, or `None` on a first run.
    fn load(&self) -> Result<Option<HoldingSet>, HoldingsError>;

    /// Replace the artifact, archiving the previous one first.
    ///
    /// Returns the archive location when a previous artifact existed.
    fn save(&mut self, set: &HoldingSet) -> Result<Option<PathBuf>, HoldingsError>;
}
