//! TOML cycle configuration.
//!
//! Every constant of a cycle lives here: where the inputs and the holdings
//! artifact are, which snapshot to use, and the selection, sizing and filter
//! thresholds. All fields have defaults, so an empty file is a valid config.
//!
//! ```toml
//! [paths]
//! factor_dir = "data/factors"
//! security_master = "data/stock_basic.csv"
//! price_history = "data/stock_history.parquet"
//! holdings_file = "holdings.csv"
//! history_dir = "history"
//!
//! [cycle]
//! mode = "rolling"          # or "target"
//! target_period = "2026-02" # used in target mode
//! top_fraction = 0.03
//! min_positions = 10
//! initial_capital = 1000000.0
//! friction_rate = 0.003
//!
//! [filters]
//! min_listing_days = 60
//! stale_after_days = 10
//! limit_margin = 0.005
//! board_lot = 100
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use buylist_core::data::PeriodSelector;
use buylist_core::filter::FilterParams;
use buylist_core::sizing::SizingParams;

/// Errors from loading or validating a config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete cycle configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CycleConfig {
    pub paths: PathsConfig,
    pub cycle: CycleSection,
    pub filters: FiltersConfig,
}

/// Input and output locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Directory of `factor_{PERIOD}.parquet` files.
    pub factor_dir: PathBuf,
    /// CSV with `symbol,name,list_date`.
    pub security_master: PathBuf,
    /// Parquet with `symbol,trade_date,open,close,volume`.
    pub price_history: PathBuf,
    pub holdings_file: PathBuf,
    /// Archive directory for replaced holdings files.
    pub history_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            factor_dir: PathBuf::from("data/factors"),
            security_master: PathBuf::from("data/stock_basic.csv"),
            price_history: PathBuf::from("data/stock_history.parquet"),
            holdings_file: PathBuf::from("holdings.csv"),
            history_dir: PathBuf::from("history"),
        }
    }
}

/// Rolling or fixed-period operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleMode {
    /// Latest snapshot, capital rolled over from the prior holdings.
    #[default]
    Rolling,
    /// Snapshot for `target_period`, always the initial capital.
    Target,
}

/// Selection and capital parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CycleSection {
    pub mode: CycleMode,
    /// Period label such as `2026-02`. Required in target mode.
    pub target_period: Option<String>,
    pub top_fraction: f64,
    pub min_positions: usize,
    pub initial_capital: f64,
    /// Round-trip cost deducted from the liquidation value on rollover.
    pub friction_rate: f64,
}

impl Default for CycleSection {
    fn default() -> Self {
        Self {
            mode: CycleMode::Rolling,
            target_period: None,
            top_fraction: 0.03,
            min_positions: 10,
            initial_capital: 1_000_000.0,
            friction_rate: 0.003,
        }
    }
}

/// Candidate filter thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FiltersConfig {
    pub min_listing_days: i64,
    /// Warn when the factor date is older than this many calendar days.
    pub stale_after_days: i64,
    pub limit_margin: f64,
    pub board_lot: u64,
}

impl Default for FiltersConfig {
    fn default() -> Self {
        Self {
            min_listing_days: 60,
            stale_after_days: 10,
            limit_margin: 0.005,
            board_lot: 100,
        }
    }
}

impl CycleConfig {
    /// Load a config file. Relative paths are resolved against the file's
    /// directory.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.paths.rebase(base);
        }
        Ok(config)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check ranges and cross-field requirements.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.cycle;
        let f = &self.filters;
        if !(c.top_fraction > 0.0 && c.top_fraction <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "cycle.top_fraction must be in (0, 1], got {}",
                c.top_fraction
            )));
        }
        if c.min_positions == 0 {
            return Err(ConfigError::Invalid("cycle.min_positions must be at least 1".into()));
        }
        if !(c.initial_capital.is_finite() && c.initial_capital > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "cycle.initial_capital must be positive, got {}",
                c.initial_capital
            )));
        }
        if !(0.0..1.0).contains(&c.friction_rate) {
            return Err(ConfigError::Invalid(format!(
                "cycle.friction_rate must be in [0, 1), got {}",
                c.friction_rate
            )));
        }
        if c.mode == CycleMode::Target
            && c.target_period.as_deref().map_or(true, |p| p.trim().is_empty())
        {
            return Err(ConfigError::Invalid(
                "cycle.target_period is required in target mode".into(),
            ));
        }
        if f.min_listing_days < 0 || f.stale_after_days < 0 {
            return Err(ConfigError::Invalid(
                "filters day counts must not be negative".into(),
            ));
        }
        if !(0.0..1.0).contains(&f.limit_margin) {
            return Err(ConfigError::Invalid(format!(
                "filters.limit_margin must be in [0, 1), got {}",
                f.limit_margin
            )));
        }
        if f.board_lot == 0 {
            return Err(ConfigError::Invalid("filters.board_lot must be positive".into()));
        }
        Ok(())
    }

    /// Whether capital is carried over from the prior holdings.
    pub fn is_rolling(&self) -> bool {
        self.cycle.mode == CycleMode::Rolling
    }

    pub fn period_selector(&self) -> PeriodSelector {
        match (&self.cycle.mode, &self.cycle.target_period) {
            (CycleMode::Target, Some(period)) => PeriodSelector::Target(period.clone()),
            _ => PeriodSelector::Latest,
        }
    }

    pub fn filter_params(&self, as_of: NaiveDate) -> FilterParams {
        FilterParams {
            as_of,
            min_listing_days: self.filters.min_listing_days,
            limit_margin: self.filters.limit_margin,
        }
    }

    pub fn sizing_params(&self) -> SizingParams {
        SizingParams {
            top_fraction: self.cycle.top_fraction,
            min_positions: self.cycle.min_positions,
            board_lot: self.filters.board_lot,
        }
    }

    /// Content hash of the resolved config, recorded in cycle reports.
    pub fn config_hash(&self) -> String {
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }
}

impl PathsConfig {
    fn rebase(&mut self, base: &Path) {
        for p in [
            &mut self.factor_dir,
            &mut self.security_master,
            &mut self.price_history,
            &mut self.holdings_file,
            &mut self.history_dir,
        ] {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        }
    }
}
