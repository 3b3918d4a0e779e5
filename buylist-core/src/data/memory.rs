//! In-memory market for embedding and tests.

use chrono::NaiveDate;
use std::collections::HashMap;

use super::provider::{
    DataError, ExecutionDayResolver, FactorSource, PeriodSelector, PriceSource, SecurityMaster,
};
use crate::domain::{ExecutionQuote, FactorSnapshot, SecurityMeta};

/// Every collaborator of a cycle, held in memory.
///
/// Quotes are returned exactly as inserted (duplicates included), which makes
/// this useful for exercising quote deduplication.
#[derive(Debug, Clone, Default)]
pub struct MemoryMarket {
    pub snapshot: Option<FactorSnapshot>,
    pub securities: HashMap<String, SecurityMeta>,
    pub quotes: Vec<ExecutionQuote>,
    pub prices: HashMap<String, f64>,
    /// When set, `latest_prices` fails with this message.
    pub price_failure: Option<String>,
}

impl MemoryMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snapshot(mut self, snapshot: FactorSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn add_security(&mut self, meta: SecurityMeta) {
        self.securities.insert(meta.symbol.clone(), meta);
    }

    pub fn add_quote(&mut self, quote: ExecutionQuote) {
        self.quotes.push(quote);
    }

    pub fn set_price(&mut self, symbol: impl Into<String>, price: f64) {
        self.prices.insert(symbol.into(), price);
    }
}

impl FactorSource for MemoryMarket {
    fn load(&self, _selector: &PeriodSelector) -> Result<FactorSnapshot, DataError> {
        self.snapshot
            .clone()
            .ok_or_else(|| DataError::SnapshotUnavailable {
                dir: "<memory>".into(),
            })
    }
}

impl SecurityMaster for MemoryMarket {
    fn lookup(&self, symbols: &[String]) -> Result<HashMap<String, SecurityMeta>, DataError> {
        Ok(symbols
            .iter()
            .filter_map(|s| self.securities.get(s).map(|m| (s.clone(), m.clone())))
            .collect())
    }
}

impl ExecutionDayResolver for MemoryMarket {
    fn forward_quotes(
        &self,
        after: NaiveDate,
        symbols: &[String],
    ) -> Result<Vec<ExecutionQuote>, DataError> {
        Ok(self
            .quotes
            .iter()
            .filter(|q| q.next_date > after && symbols.contains(&q.symbol))
            .cloned()
            .collect())
    }
}

impl PriceSource for MemoryMarket {
    fn latest_prices(&self, symbols: &[String]) -> Result<HashMap<String, f64>, DataError> {
        if let Some(reason) = &self.price_failure {
            return Err(DataError::Other(reason.clone()));
        }
        Ok(symbols
            .iter()
            .filter_map(|s| self.prices.get(s).map(|p| (s.clone(), *p)))
            .collect())
    }
}
