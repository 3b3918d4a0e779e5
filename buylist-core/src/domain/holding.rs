//! Final holdings rows and the set persisted between cycles.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Tolerance for the weight-sum invariant.
pub const WEIGHT_EPSILON: f64 = 1e-9;

/// One position of the buy list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub name: String,
    pub cost_price: f64,
    pub volume: u64,
    pub buy_date: NaiveDate,
    pub factor: f64,
    pub target_weight: f64,
}

impl Holding {
    pub fn cost_value(&self) -> f64 {
        self.cost_price * self.volume as f64
    }
}

/// The complete holdings artifact of one cycle, in rank order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldingSet {
    pub holdings: Vec<Holding>,
}

impl HoldingSet {
    pub fn new(holdings: Vec<Holding>) -> Self {
        Self { holdings }
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Holding> {
        self.holdings.iter()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.holdings.iter().map(|h| h.symbol.clone()).collect()
    }

    /// Capital committed at cost prices.
    pub fn total_cost(&self) -> f64 {
        self.holdings.iter().map(Holding::cost_value).sum()
    }

    pub fn weight_sum(&self) -> f64 {
        self.holdings.iter().map(|h| h.target_weight).sum()
    }

    /// Check the artifact invariants before it is persisted.
    ///
    /// - at least one row
    /// - every volume is a positive multiple of `lot`
    /// - every weight lies in (0, 1] and the weights sum to 1
    pub fn validate(&self, lot: u64) -> Result<(), String> {
        if self.holdings.is_empty() {
            return Err("holding set is empty".into());
        }
        for h in &self.holdings {
            if h.volume == 0 || h.volume % lot != 0 {
                return Err(format!(
                    "{}: volume {} is not a positive multiple of {lot}",
                    h.symbol, h.volume
                ));
            }
            if !(h.target_weight > 0.0 && h.target_weight <= 1.0) {
                return Err(format!(
                    "{}: target_weight {} outside (0, 1]",
                    h.symbol, h.target_weight
                ));
            }
            if !(h.cost_price.is_finite() && h.cost_price > 0.0) {
                return Err(format!("{}: invalid cost_price {}", h.symbol, h.cost_price));
            }
        }
        let sum = self.weight_sum();
        if (sum - 1.0).abs() > WEIGHT_EPSILON {
            return Err(format!("target weights sum to {sum}, expected 1.0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(symbol: &str, volume: u64, weight: f64) -> Holding {
        Holding {
            symbol: symbol.into(),
            name: symbol.into(),
            cost_price: 10.0,
            volume,
            buy_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            factor: 1.0,
            target_weight: weight,
        }
    }

    #[test]
    fn valid_set_passes() {
        let set = HoldingSet::new(vec![holding("A", 100, 0.5), holding("B", 2300, 0.5)]);
        assert!(set.validate(100).is_ok());
        assert_eq!(set.total_cost(), 24_000.0);
    }

    #[test]
    fn rejects_odd_lot() {
        let set = HoldingSet::new(vec![holding("A", 150, 1.0)]);
        assert!(set.validate(100).is_err());
    }

    #[test]
    fn rejects_zero_volume() {
        let set = HoldingSet::new(vec![holding("A", 0, 1.0)]);
        assert!(set.validate(100).is_err());
    }

    #[test]
    fn rejects_weights_not_summing_to_one() {
        let set = HoldingSet::new(vec![holding("A", 100, 0.5), holding("B", 100, 0.4)]);
        let err = set.validate(100).unwrap_err();
        assert!(err.contains("sum"), "unexpected error: {err}");
    }

    #[test]
    fn rejects_empty_set() {
        assert!(HoldingSet::default().validate(100).is_err());
    }
}
