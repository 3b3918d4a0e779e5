//! Execution-day resolution.
//!
//! Reduces raw forward quotes to one per symbol and finds the session most of
//! the batch trades on next. A name whose first forward quote lands on a later
//! session was suspended on the dominant day.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::data::{DataError, ExecutionDayResolver};
use crate::domain::ExecutionQuote;

/// Keep one quote per symbol: the earliest `next_date`; on equal dates the
/// first one seen wins.
pub fn dedup_quotes(quotes: Vec<ExecutionQuote>) -> BTreeMap<String, ExecutionQuote> {
    let mut best: BTreeMap<String, ExecutionQuote> = BTreeMap::new();
    for quote in quotes {
        match best.get(&quote.symbol) {
            Some(existing) if existing.next_date <= quote.next_date => {}
            _ => {
                best.insert(quote.symbol.clone(), quote);
            }
        }
    }
    best
}

/// Ask the resolver for the sessions after `after` and deduplicate.
///
/// An empty map is returned as-is; the caller decides whether that is fatal.
pub fn resolve_next_quotes(
    resolver: &dyn ExecutionDayResolver,
    after: NaiveDate,
    symbols: &[String],
) -> Result<BTreeMap<String, ExecutionQuote>, DataError> {
    if symbols.is_empty() {
        return Ok(BTreeMap::new());
    }
    let raw = resolver.forward_quotes(after, symbols)?;
    let raw_len = raw.len();
    let quotes = dedup_quotes(raw);
    if raw_len > quotes.len() {
        log::debug!(
            "collapsed {raw_len} forward quotes to {} symbols",
            quotes.len()
        );
    }
    Ok(quotes)
}

/// The most common `next_date` of a batch. Ties go to the earliest date.
pub fn dominant_date<'a>(quotes: impl IntoIterator<Item = &'a ExecutionQuote>) -> Option<NaiveDate> {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for q in quotes {
        *counts.entry(q.next_date).or_default() += 1;
    }
    let mut dominant: Option<(NaiveDate, usize)> = None;
    for (date, count) in counts {
        if dominant.map_or(true, |(_, best)| count > best) {
            dominant = Some((date, count));
        }
    }
    dominant.map(|(date, _)| date)
}
