//! In-memory holdings repository for tests and dry runs.

use std::path::PathBuf;

use super::{HoldingsError, HoldingsRepository};
use crate::domain::{HoldingSet, BOARD_LOT};

/// Keeps the current set and every replaced set in memory.
#[derive(Debug, Clone)]
pub struct MemoryHoldingsStore {
    pub current: Option<HoldingSet>,
    pub archive: Vec<HoldingSet>,
    lot: u64,
}

impl Default for MemoryHoldingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHoldingsStore {
    pub fn new() -> Self {
        Self {
            current: None,
            archive: Vec::new(),
            lot: BOARD_LOT,
        }
    }

    /// Start from an existing artifact.
    pub fn with_current(set: HoldingSet) -> Self {
        Self {
            current: Some(set),
            ..Self::new()
        }
    }
}

impl HoldingsRepository for MemoryHoldingsStore {
    fn load(&self) -> Result<Option<HoldingSet>, HoldingsError> {
        Ok(self.current.clone())
    }

    fn save(&mut self, set: &HoldingSet) -> Result<Option<PathBuf>, HoldingsError> {
        set.validate(self.lot).map_err(HoldingsError::Invalid)?;
        if let Some(previous) = self.current.replace(set.clone()) {
            self.archive.push(previous);
        }
        Ok(None)
    }
}
