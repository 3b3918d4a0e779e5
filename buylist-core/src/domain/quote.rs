use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// First session after the factor's T-date for one symbol.
///
/// `next_open` is the earliest realistic fill price for a post-close signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionQuote {
    pub symbol: String,
    pub next_open: f64,
    pub next_date: NaiveDate,
    pub next_volume: u64,
}
