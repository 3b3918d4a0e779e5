//! Candidate filter and limit-move detector.
//!
//! Runs in two phases so the forward-quote lookup only covers names that can
//! still qualify:
//!
//! 1. [`prescreen`]: join factor rows with the security master, then drop
//!    recently listed names and rows without a usable signal.
//! 2. [`screen_execution`]: join with forward quotes, then drop suspended
//!    names and names opening at (or within the margin of) the limit-up price.
//!
//! Symbols missing from a join are excluded without being counted.

use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::domain::{Candidate, ExecutionQuote, FactorRecord, SecurityMeta};
use crate::execution::dominant_date;
use crate::limits::{is_limit_locked, limit_ratio};

/// Filter thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Reference date for listing age.
    pub as_of: NaiveDate,
    /// Names listed fewer calendar days ago are excluded.
    pub min_listing_days: i64,
    /// Subtracted from the limit ratio before comparing the opening move.
    pub limit_margin: f64,
}

impl FilterParams {
    pub fn new(as_of: NaiveDate) -> Self {
        Self {
            as_of,
            min_listing_days: 60,
            limit_margin: 0.005,
        }
    }
}

/// Per-reason rejection counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionCounts {
    pub listing_age: usize,
    pub missing_signal: usize,
    pub suspended: usize,
    pub limit_up: usize,
}

impl RejectionCounts {
    pub fn total(&self) -> usize {
        self.listing_age + self.missing_signal + self.suspended + self.limit_up
    }
}

/// A name that passed the listing-age and signal checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Screened {
    pub symbol: String,
    pub name: String,
    pub factor: f64,
    pub pre_close: f64,
}

/// Result of the full filter.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome {
    /// Survivors in join order.
    pub candidates: Vec<Candidate>,
    pub counts: RejectionCounts,
    /// Names that passed the prescreen.
    pub screened: usize,
    /// Prescreened names that also had a forward quote.
    pub joined: usize,
    /// Dominant next trading date of the batch.
    pub market_date: Option<NaiveDate>,
}

/// Phase 1: listing age and missing signal.
pub fn prescreen(
    records: &[FactorRecord],
    securities: &HashMap<String, SecurityMeta>,
    params: &FilterParams,
    counts: &mut RejectionCounts,
) -> Vec<Screened> {
    let mut out = Vec::with_capacity(records.len());
    for record in records {
        let Some(meta) = securities.get(&record.symbol) else {
            debug!("{}: not in security master", record.symbol);
            continue;
        };

        match meta.listing_age_days(params.as_of) {
            Some(age) if age >= params.min_listing_days => {}
            _ => {
                counts.listing_age += 1;
                continue;
            }
        }

        let (Some(factor), Some(close)) = (record.factor, record.close) else {
            counts.missing_signal += 1;
            continue;
        };
        if !factor.is_finite() || !close.is_finite() || close <= 0.0 {
            counts.missing_signal += 1;
            continue;
        }

        out.push(Screened {
            symbol: record.symbol.clone(),
            name: meta.name.clone(),
            factor,
            pre_close: close,
        });
    }
    out
}

/// Phase 2: tradability on the dominant next session and the limit-move check.
pub fn screen_execution(
    screened: &[Screened],
    quotes: &BTreeMap<String, ExecutionQuote>,
    params: &FilterParams,
    counts: &mut RejectionCounts,
) -> FilterOutcome {
    let joined: Vec<(&Screened, &ExecutionQuote)> = screened
        .iter()
        .filter_map(|s| match quotes.get(&s.symbol) {
            Some(q) => Some((s, q)),
            None => {
                debug!("{}: no forward quote", s.symbol);
                None
            }
        })
        .collect();

    let market_date = dominant_date(joined.iter().map(|(_, q)| *q));

    let mut candidates = Vec::with_capacity(joined.len());
    for (s, q) in &joined {
        let tradable = Some(q.next_date) == market_date
            && q.next_volume > 0
            && q.next_open.is_finite()
            && q.next_open > 0.0;
        if !tradable {
            counts.suspended += 1;
            continue;
        }

        let pct_chg = (q.next_open - s.pre_close) / s.pre_close;
        let ratio = limit_ratio(&s.symbol, &s.name);
        if is_limit_locked(pct_chg, ratio, params.limit_margin) {
            debug!(
                "{}: opens {:+.2}% against a {:.0}% limit",
                s.symbol,
                pct_chg * 100.0,
                ratio * 100.0
            );
            counts.limit_up += 1;
            continue;
        }

        candidates.push(Candidate {
            symbol: s.symbol.clone(),
            name: s.name.clone(),
            factor: s.factor,
            pre_close: s.pre_close,
            cost_price: q.next_open,
            buy_date: q.next_date,
        });
    }

    FilterOutcome {
        candidates,
        counts: *counts,
        screened: screened.len(),
        joined: joined.len(),
        market_date,
    }
}

/// Both phases over already-resolved quotes.
pub fn filter_candidates(
    records: &[FactorRecord],
    securities: &HashMap<String, SecurityMeta>,
    quotes: &BTreeMap<String, ExecutionQuote>,
    params: &FilterParams,
) -> FilterOutcome {
    let mut counts = RejectionCounts::default();
    let screened = prescreen(records, securities, params, &mut counts);
    screen_execution(&screened, quotes, params, &mut counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t_date() -> NaiveDate {
        d(2026, 2, 27)
    }

    fn next() -> NaiveDate {
        d(2026, 3, 2)
    }

    fn params() -> FilterParams {
        FilterParams::new(next())
    }

    fn meta(symbol: &str, name: &str, listed: Option<NaiveDate>) -> SecurityMeta {
        SecurityMeta {
            symbol: symbol.into(),
            name: name.into(),
            list_date: listed,
        }
    }

    fn quote(symbol: &str, open: f64, date: NaiveDate, volume: u64) -> ExecutionQuote {
        ExecutionQuote {
            symbol: symbol.into(),
            next_open: open,
            next_date: date,
            next_volume: volume,
        }
    }

    struct Fixture {
        records: Vec<FactorRecord>,
        securities: HashMap<String, SecurityMeta>,
        quotes: BTreeMap<String, ExecutionQuote>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                records: Vec::new(),
                securities: HashMap::new(),
                quotes: BTreeMap::new(),
            }
        }

        fn add(&mut self, symbol: &str, name: &str, factor: f64, close: f64, open: f64) {
            self.records
                .push(FactorRecord::new(symbol, t_date(), factor, close));
            self.securities
                .insert(symbol.into(), meta(symbol, name, Some(d(2010, 1, 1))));
            self.quotes
                .insert(symbol.into(), quote(symbol, open, next(), 10_000));
        }

        fn run(&self) -> FilterOutcome {
            filter_candidates(&self.records, &self.securities, &self.quotes, &params())
        }
    }

    #[test]
    fn clean_name_survives_with_next_open_as_cost() {
        let mut fx = Fixture::new();
        fx.add("600000", "浦发银行", 1.0, 10.0, 10.1);
        let out = fx.run();

        assert_eq!(out.candidates.len(), 1);
        let c = &out.candidates[0];
        assert_eq!(c.cost_price, 10.1);
        assert_eq!(c.pre_close, 10.0);
        assert_eq!(c.buy_date, next());
        assert_eq!(out.market_date, Some(next()));
        assert_eq!(out.counts.total(), 0);
    }

    #[test]
    fn recently_listed_and_unknown_listing_are_excluded() {
        let mut fx = Fixture::new();
        fx.add("600001", "新股一", 1.0, 10.0, 10.0);
        fx.add("600002", "新股二", 1.0, 10.0, 10.0);
        fx.add("600003", "老股", 1.0, 10.0, 10.0);
        // listed 59 days before as_of
        fx.securities.get_mut("600001").unwrap().list_date =
            Some(next() - chrono::Duration::days(59));
        fx.securities.get_mut("600002").unwrap().list_date = None;
        // exactly 60 days is old enough
        fx.securities.get_mut("600003").unwrap().list_date =
            Some(next() - chrono::Duration::days(60));

        let out = fx.run();
        assert_eq!(out.counts.listing_age, 2);
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].symbol, "600003");
    }

    #[test]
    fn missing_factor_or_close_is_excluded() {
        let mut fx = Fixture::new();
        fx.add("600001", "甲", 1.0, 10.0, 10.0);
        fx.add("600002", "乙", 1.0, 10.0, 10.0);
        fx.records[0].factor = None;
        fx.records[1].close = Some(f64::NAN);

        let out = fx.run();
        assert_eq!(out.counts.missing_signal, 2);
        assert!(out.candidates.is_empty());
    }

    #[test]
    fn zero_volume_and_off_date_are_suspended() {
        let mut fx = Fixture::new();
        fx.add("600001", "甲", 1.0, 10.0, 10.0);
        fx.add("600002", "乙", 1.0, 10.0, 10.0);
        fx.add("600003", "丙", 1.0, 10.0, 10.0);
        fx.add("600004", "丁", 1.0, 10.0, 10.0);
        fx.quotes.get_mut("600001").unwrap().next_volume = 0;
        // quote skipped ahead past the dominant session
        fx.quotes.get_mut("600002").unwrap().next_date = d(2026, 3, 9);

        let out = fx.run();
        assert_eq!(out.counts.suspended, 2);
        assert_eq!(out.candidates.len(), 2);
        assert_eq!(out.market_date, Some(next()));
    }

    #[test]
    fn limit_filter_depends_on_tier() {
        let mut fx = Fixture::new();
        // pct_chg = 0.046 on both
        fx.add("600001", "ST甲", 1.0, 10.0, 10.46);
        fx.add("600002", "乙", 1.0, 10.0, 10.46);

        let out = fx.run();
        assert_eq!(out.counts.limit_up, 1);
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].symbol, "600002");
    }

    #[test]
    fn growth_board_tolerates_larger_gap() {
        let mut fx = Fixture::new();
        fx.add("300750", "宁德时代", 1.0, 100.0, 112.0);
        fx.add("600519", "贵州茅台", 1.0, 100.0, 112.0);
        fx.add("300751", "迈为股份", 1.0, 100.0, 119.6);

        let out = fx.run();
        assert_eq!(out.counts.limit_up, 2);
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].symbol, "300750");
    }

    #[test]
    fn unjoined_symbols_are_silently_dropped() {
        let mut fx = Fixture::new();
        fx.add("600001", "甲", 1.0, 10.0, 10.0);
        fx.add("600002", "乙", 1.0, 10.0, 10.0);
        fx.add("600003", "丙", 1.0, 10.0, 10.0);
        fx.securities.remove("600001");
        fx.quotes.remove("600002");

        let out = fx.run();
        assert_eq!(out.counts.total(), 0);
        assert_eq!(out.screened, 2);
        assert_eq!(out.joined, 1);
        assert_eq!(out.candidates.len(), 1);
    }

    #[test]
    fn candidates_keep_join_order() {
        let mut fx = Fixture::new();
        fx.add("600003", "丙", 3.0, 10.0, 10.0);
        fx.add("600001", "甲", 1.0, 10.0, 10.0);
        fx.add("600002", "乙", 2.0, 10.0, 10.0);

        let symbols: Vec<String> = fx.run().candidates.into_iter().map(|c| c.symbol).collect();
        assert_eq!(symbols, vec!["600003", "600001", "600002"]);
    }
}
