use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A security that survived every filter and can be bought at `cost_price`.
///
/// `pre_close` is the factor-date close and is taken to be the previous close
/// of the execution session. No independent check is made.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub symbol: String,
    pub name: String,
    pub factor: f64,
    pub pre_close: f64,
    pub cost_price: f64,
    pub buy_date: NaiveDate,
}
