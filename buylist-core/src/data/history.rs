//! Daily price history (`stock_history` export) backed by a Parquet file.
//!
//! Columns: `symbol, trade_date, open, close, volume`. Serves as both the
//! execution-day resolver (first session after a date) and the latest-price
//! source for marking prior holdings to market.

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::parquet::{
    date_column, date_series, f64_column, read_parquet, require_columns, string_column,
    write_parquet_atomic,
};
use super::provider::{DataError, ExecutionDayResolver, PriceSource};
use crate::domain::{normalize_symbol, ExecutionQuote};

pub const HISTORY_COLUMNS: [&str; 5] = ["symbol", "trade_date", "open", "close", "volume"];

/// One daily session of one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub symbol: String,
    pub trade_date: NaiveDate,
    pub open: Option<f64>,
    pub close: Option<f64>,
    pub volume: u64,
}

/// Price history indexed by symbol, each series sorted by date.
#[derive(Debug, Clone, Default)]
pub struct PriceHistory {
    series: HashMap<String, Vec<DailyBar>>,
}

impl PriceHistory {
    /// Load a history file.
    pub fn open(path: &Path) -> Result<Self, DataError> {
        let df = read_parquet(path)?;
        require_columns(&df, &HISTORY_COLUMNS)?;

        let symbols = string_column(&df, "symbol")?;
        let dates = date_column(&df, "trade_date")?;
        let opens = f64_column(&df, "open")?;
        let closes = f64_column(&df, "close")?;
        let volumes = f64_column(&df, "volume")?;

        let mut bars = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let (Some(symbol), Some(trade_date)) = (&symbols[i], dates[i]) else {
                continue;
            };
            bars.push(DailyBar {
                symbol: normalize_symbol(symbol),
                trade_date,
                open: opens[i],
                close: closes[i],
                volume: volumes[i].map_or(0, |v| v.max(0.0) as u64),
            });
        }
        let history = Self::from_bars(bars);
        log::debug!(
            "price history {}: {} symbols",
            path.display(),
            history.series.len()
        );
        Ok(history)
    }

    pub fn from_bars(bars: impl IntoIterator<Item = DailyBar>) -> Self {
        let mut series: HashMap<String, Vec<DailyBar>> = HashMap::new();
        for bar in bars {
            series.entry(bar.symbol.clone()).or_default().push(bar);
        }
        for bars in series.values_mut() {
            bars.sort_by_key(|b| b.trade_date);
        }
        Self { series }
    }

    /// Write bars to a history file (atomic).
    pub fn write(path: &Path, bars: &[DailyBar]) -> Result<(), DataError> {
        let symbols: Vec<&str> = bars.iter().map(|b| b.symbol.as_str()).collect();
        let dates: Vec<NaiveDate> = bars.iter().map(|b| b.trade_date).collect();
        let opens: Vec<Option<f64>> = bars.iter().map(|b| b.open).collect();
        let closes: Vec<Option<f64>> = bars.iter().map(|b| b.close).collect();
        let volumes: Vec<u64> = bars.iter().map(|b| b.volume).collect();

        let mut df = DataFrame::new(vec![
            Column::new("symbol".into(), symbols),
            date_series("trade_date", &dates)?,
            Column::new("open".into(), opens),
            Column::new("close".into(), closes),
            Column::new("volume".into(), volumes),
        ])
        .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))?;
        write_parquet_atomic(&mut df, path)
    }

    pub fn symbol_count(&self) -> usize {
        self.series.len()
    }

    /// All bars of a symbol, oldest first.
    pub fn bars(&self, symbol: &str) -> &[DailyBar] {
        self.series.get(symbol).map_or(&[], |v| v.as_slice())
    }
}

impl ExecutionDayResolver for PriceHistory {
    fn forward_quotes(
        &self,
        after: NaiveDate,
        symbols: &[String],
    ) -> Result<Vec<ExecutionQuote>, DataError> {
        let mut quotes = Vec::new();
        for symbol in symbols {
            let bars = self.bars(symbol);
            let idx = bars.partition_point(|b| b.trade_date <= after);
            if let Some(bar) = bars.get(idx) {
                quotes.push(ExecutionQuote {
                    symbol: symbol.clone(),
                    next_open: bar.open.unwrap_or(f64::NAN),
                    next_date: bar.trade_date,
                    next_volume: bar.volume,
                });
            }
        }
        Ok(quotes)
    }
}

impl PriceSource for PriceHistory {
    fn latest_prices(&self, symbols: &[String]) -> Result<HashMap<String, f64>, DataError> {
        Ok(symbols
            .iter()
            .filter_map(|s| {
                self.bars(s)
                    .iter()
                    .rev()
                    .find_map(|b| b.close.filter(|c| *c > 0.0))
                    .map(|close| (s.clone(), close))
            })
            .collect())
    }
}
