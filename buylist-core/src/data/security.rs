//! CSV-backed security master (`stock_basic` export).
//!
//! Columns: `symbol,name,list_date`. `list_date` may be `YYYY-MM-DD`,
//! `YYYYMMDD` or empty (unknown).

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::parquet::parse_date_prefix;
use super::provider::{DataError, SecurityMaster};
use crate::domain::{normalize_symbol, SecurityMeta};

#[derive(Debug, Deserialize)]
struct SecurityRow {
    symbol: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    list_date: String,
}

/// Security master loaded fully into memory.
#[derive(Debug, Clone, Default)]
pub struct CsvSecurityMaster {
    by_symbol: HashMap<String, SecurityMeta>,
}

impl CsvSecurityMaster {
    /// Load the master file.
    pub fn open(path: &Path) -> Result<Self, DataError> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| DataError::CsvError(format!("open {}: {e}", path.display())))?;

        let mut by_symbol = HashMap::new();
        for row in reader.deserialize::<SecurityRow>() {
            let row = row.map_err(|e| DataError::CsvError(format!("{}: {e}", path.display())))?;
            let symbol = normalize_symbol(&row.symbol);
            if symbol.is_empty() {
                continue;
            }
            by_symbol.insert(
                symbol.clone(),
                SecurityMeta {
                    symbol,
                    name: row.name.trim().to_string(),
                    list_date: parse_date_prefix(&row.list_date),
                },
            );
        }
        log::debug!("security master {}: {} symbols", path.display(), by_symbol.len());
        Ok(Self { by_symbol })
    }

    pub fn from_entries(entries: impl IntoIterator<Item = SecurityMeta>) -> Self {
        Self {
            by_symbol: entries
                .into_iter()
                .map(|m| (m.symbol.clone(), m))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

impl SecurityMaster for CsvSecurityMaster {
    fn lookup(&self, symbols: &[String]) -> Result<HashMap<String, SecurityMeta>, DataError> {
        Ok(symbols
            .iter()
            .filter_map(|s| self.by_symbol.get(s).map(|m| (s.clone(), m.clone())))
            .collect())
    }
}
