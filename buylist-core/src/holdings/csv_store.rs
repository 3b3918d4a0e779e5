//! CSV holdings artifact.
//!
//! Header: `symbol,name,cost_price,volume,buy_date,factor,target_weight`.
//! Written as UTF-8 with a byte-order mark so spreadsheet tools pick the right
//! encoding for security names. Writes are atomic (write to .tmp, rename) and
//! the previous file is copied to `{history_dir}/holdings_{timestamp}.csv`
//! first.

use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{HoldingsError, HoldingsRepository};
use crate::data::parquet::parse_date_prefix;
use crate::domain::{normalize_symbol, Holding, HoldingSet, BOARD_LOT};

pub const HOLDINGS_COLUMNS: [&str; 7] = [
    "symbol",
    "name",
    "cost_price",
    "volume",
    "buy_date",
    "factor",
    "target_weight",
];

const BOM: &str = "\u{feff}";

/// Holdings file plus its archive directory.
#[derive(Debug, Clone)]
pub struct CsvHoldingsStore {
    path: PathBuf,
    history_dir: PathBuf,
    lot: u64,
}

impl CsvHoldingsStore {
    pub fn new(path: impl Into<PathBuf>, history_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            history_dir: history_dir.into(),
            lot: BOARD_LOT,
        }
    }

    pub fn with_lot(mut self, lot: u64) -> Self {
        self.lot = lot;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn history_dir(&self) -> &Path {
        &self.history_dir
    }

    /// Copy the current file into the history directory.
    fn archive_current(&self) -> Result<Option<PathBuf>, HoldingsError> {
        if !self.path.is_file() {
            return Ok(None);
        }
        fs::create_dir_all(&self.history_dir)?;
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let mut target = self.history_dir.join(format!("holdings_{stamp}.csv"));
        let mut n = 1;
        while target.exists() {
            target = self.history_dir.join(format!("holdings_{stamp}_{n}.csv"));
            n += 1;
        }
        fs::copy(&self.path, &target)?;
        log::info!("archived {} to {}", self.path.display(), target.display());
        Ok(Some(target))
    }
}

impl HoldingsRepository for CsvHoldingsStore {
    fn load(&self) -> Result<Option<HoldingSet>, HoldingsError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        parse_holdings_csv(&content).map(Some)
    }

    fn save(&mut self, set: &HoldingSet) -> Result<Option<PathBuf>, HoldingsError> {
        set.validate(self.lot).map_err(HoldingsError::Invalid)?;
        let body = holdings_to_csv(set)?;

        let archived = self.archive_current()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp_path = self.path.with_extension("csv.tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(BOM.as_bytes())?;
            file.write_all(body.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            HoldingsError::Io(e)
        })?;
        Ok(archived)
    }
}

/// Render a holding set as CSV (without BOM).
///
/// Floats use the shortest round-trip representation, so the same set always
/// renders to the same bytes.
pub fn holdings_to_csv(set: &HoldingSet) -> Result<String, HoldingsError> {
    let csv_err = |e: csv::Error| HoldingsError::Csv(e.to_string());
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(HOLDINGS_COLUMNS).map_err(csv_err)?;
    for h in set.iter() {
        let record = [
            h.symbol.clone(),
            h.name.clone(),
            h.cost_price.to_string(),
            h.volume.to_string(),
            h.buy_date.format("%Y-%m-%d").to_string(),
            h.factor.to_string(),
            h.target_weight.to_string(),
        ];
        wtr.write_record(&record).map_err(csv_err)?;
    }
    let data = wtr
        .into_inner()
        .map_err(|e| HoldingsError::Csv(format!("failed to flush CSV writer: {e}")))?;
    String::from_utf8(data).map_err(|e| HoldingsError::Csv(format!("CSV output is not UTF-8: {e}")))
}

#[derive(Debug, Deserialize)]
struct HoldingRow {
    symbol: String,
    #[serde(default)]
    name: String,
    cost_price: f64,
    // older files carry pandas floats such as `1600.0`
    volume: f64,
    buy_date: String,
    factor: f64,
    target_weight: f64,
}

/// Parse a holdings CSV, with or without a byte-order mark.
pub fn parse_holdings_csv(content: &str) -> Result<HoldingSet, HoldingsError> {
    let content = content.strip_prefix(BOM).unwrap_or(content);
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let mut holdings = Vec::new();
    for (i, row) in reader.deserialize::<HoldingRow>().enumerate() {
        let row = row.map_err(|e| HoldingsError::Csv(format!("row {}: {e}", i + 1)))?;
        let buy_date: NaiveDate = parse_date_prefix(&row.buy_date).ok_or_else(|| {
            HoldingsError::Csv(format!("row {}: bad buy_date '{}'", i + 1, row.buy_date))
        })?;
        if !(row.volume.is_finite() && row.volume >= 0.0) {
            return Err(HoldingsError::Csv(format!(
                "row {}: bad volume {}",
                i + 1,
                row.volume
            )));
        }
        holdings.push(Holding {
            symbol: normalize_symbol(&row.symbol),
            name: row.name,
            cost_price: row.cost_price,
            volume: row.volume.round() as u64,
            buy_date,
            factor: row.factor,
            target_weight: row.target_weight,
        });
    }
    Ok(HoldingSet::new(holdings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HoldingSet {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        HoldingSet::new(vec![
            Holding {
                symbol: "000001".into(),
                name: "平安银行".into(),
                cost_price: 10.5,
                volume: 4700,
                buy_date: date,
                factor: 1.25,
                target_weight: 0.5,
            },
            Holding {
                symbol: "600519".into(),
                name: "贵州茅台".into(),
                cost_price: 1500.0,
                volume: 100,
                buy_date: date,
                factor: 0.75,
                target_weight: 0.5,
            },
        ])
    }

    #[test]
    fn render_is_deterministic() {
        let a = holdings_to_csv(&sample()).unwrap();
        let b = holdings_to_csv(&sample()).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("symbol,name,cost_price,volume,buy_date,factor,target_weight\n"));
        assert!(a.contains("000001,平安银行,10.5,4700,2026-03-02,1.25,0.5"));
    }

    #[test]
    fn parses_files_written_by_older_tooling() {
        let content = "\u{feff}symbol,name,cost_price,volume,buy_date,factor,target_weight\n\
                       1,平安银行,10.5,4700.0,2026-03-02 00:00:00,1.25,0.5\n";
        let set = parse_holdings_csv(content).unwrap();
        assert_eq!(set.len(), 1);
        let h = &set.holdings[0];
        assert_eq!(h.symbol, "000001");
        assert_eq!(h.volume, 4700);
        assert_eq!(h.buy_date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    }

    #[test]
    fn load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvHoldingsStore::new(dir.path().join("h.csv"), dir.path().join("hist"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvHoldingsStore::new(dir.path().join("h.csv"), dir.path().join("hist"));

        let archived = store.save(&sample()).unwrap();
        assert!(archived.is_none());
        assert!(!dir.path().join("h.csv.tmp").exists());

        let bytes = fs::read(dir.path().join("h.csv")).unwrap();
        assert!(bytes.starts_with(BOM.as_bytes()));
        assert_eq!(store.load().unwrap(), Some(sample()));
    }

    #[test]
    fn second_save_archives_first_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvHoldingsStore::new(dir.path().join("h.csv"), dir.path().join("hist"));
        store.save(&sample()).unwrap();
        let first = fs::read(dir.path().join("h.csv")).unwrap();

        let mut next = sample();
        next.holdings.truncate(1);
        next.holdings[0].target_weight = 1.0;
        let archived = store.save(&next).unwrap().expect("archive path");

        assert_eq!(fs::read(&archived).unwrap(), first);
        assert!(archived
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("holdings_")));
        assert_eq!(store.load().unwrap().unwrap().len(), 1);
    }

    #[test]
    fn repeated_saves_never_overwrite_archives() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvHoldingsStore::new(dir.path().join("h.csv"), dir.path().join("hist"));
        for _ in 0..3 {
            store.save(&sample()).unwrap();
        }
        let archives = fs::read_dir(dir.path().join("hist")).unwrap().count();
        assert_eq!(archives, 2);
    }

    #[test]
    fn invalid_set_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvHoldingsStore::new(dir.path().join("h.csv"), dir.path().join("hist"));
        store.save(&sample()).unwrap();
        let before = fs::read(dir.path().join("h.csv")).unwrap();

        let err = store.save(&HoldingSet::default()).unwrap_err();
        assert!(matches!(err, HoldingsError::Invalid(_)));
        assert_eq!(fs::read(dir.path().join("h.csv")).unwrap(), before);
        assert!(!dir.path().join("hist").exists());
    }
}
