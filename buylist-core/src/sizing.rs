//! Ranker and position sizer.
//!
//! Candidates are ranked by factor (descending, stable), the top slice is
//! equal-weighted and each weight is converted into a board-lot share count
//! at the execution price. Lot rounding leaves some cash undeployed; it is
//! not redistributed.

use serde::{Deserialize, Serialize};

use crate::domain::{Candidate, Holding, HoldingSet, BOARD_LOT};

/// Selection and rounding parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizingParams {
    /// Fraction of the ranked candidates to hold.
    pub top_fraction: f64,
    /// Floor on the number of names selected.
    pub min_positions: usize,
    pub board_lot: u64,
}

impl Default for SizingParams {
    fn default() -> Self {
        Self {
            top_fraction: 0.03,
            min_positions: 10,
            board_lot: BOARD_LOT,
        }
    }
}

/// Result of ranking and sizing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SizingOutcome {
    pub holdings: HoldingSet,
    /// Rows selected before zero-volume rows were dropped.
    pub selected: usize,
    pub dropped_zero_volume: usize,
    /// Capital committed at cost prices.
    pub deployed: f64,
    pub cash_left: f64,
}

/// Number of names to hold out of `count` ranked candidates.
///
/// `max(min_positions, min(floor(count × top_fraction), count))`. The result may
/// exceed `count` when few candidates remain; callers take `min` with `count`.
pub fn top_n(count: usize, top_fraction: f64, min_positions: usize) -> usize {
    let by_fraction = (count as f64 * top_fraction).floor() as usize;
    by_fraction.min(count).max(min_positions)
}

/// Stable sort by factor, highest first. Equal factors keep their input order.
pub fn rank(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.factor.total_cmp(&a.factor));
    candidates
}

/// Whole board lots affordable with `capital × weight` at `price`.
pub fn lot_volume(capital: f64, weight: f64, price: f64, lot: u64) -> u64 {
    if !(price.is_finite() && price > 0.0) || capital <= 0.0 || lot == 0 {
        return 0;
    }
    let lots = (capital * weight / price / lot as f64).floor();
    if lots <= 0.0 {
        0
    } else {
        lots as u64 * lot
    }
}

/// Rank, select and size.
///
/// Weights used for share counts are `1 / selected`. Rows whose budget buys
/// less than one lot are dropped; the recorded `target_weight` of the remaining
/// rows is then `1 / survivors` so the persisted weights sum to one. Share
/// counts are not recomputed.
pub fn size_positions(candidates: Vec<Candidate>, capital: f64, params: &SizingParams) -> SizingOutcome {
    let ranked = rank(candidates);
    let n = top_n(ranked.len(), params.top_fraction, params.min_positions).min(ranked.len());
    if n == 0 {
        return SizingOutcome {
            cash_left: capital,
            ..SizingOutcome::default()
        };
    }

    let weight = 1.0 / n as f64;
    let mut holdings: Vec<Holding> = ranked
        .into_iter()
        .take(n)
        .filter_map(|c| {
            let volume = lot_volume(capital, weight, c.cost_price, params.board_lot);
            if volume == 0 {
                log::debug!("{}: budget buys less than one lot at {}", c.symbol, c.cost_price);
                return None;
            }
            Some(Holding {
                symbol: c.symbol,
                name: c.name,
                cost_price: c.cost_price,
                volume,
                buy_date: c.buy_date,
                factor: c.factor,
                target_weight: weight,
            })
        })
        .collect();

    let dropped = n - holdings.len();
    if dropped > 0 && !holdings.is_empty() {
        let renormalized = 1.0 / holdings.len() as f64;
        for h in &mut holdings {
            h.target_weight = renormalized;
        }
    }

    let holdings = HoldingSet::new(holdings);
    let deployed = holdings.total_cost();
    SizingOutcome {
        holdings,
        selected: n,
        dropped_zero_volume: dropped,
        deployed,
        cash_left: capital - deployed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn candidate(symbol: &str, factor: f64, price: f64) -> Candidate {
        Candidate {
            symbol: symbol.into(),
            name: symbol.into(),
            factor,
            pre_close: price,
            cost_price: price,
            buy_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
        }
    }

    #[test]
    fn top_n_floor_applies() {
        assert_eq!(top_n(200, 0.03, 10), 10);
        assert_eq!(top_n(1000, 0.03, 10), 30);
        assert_eq!(top_n(5, 0.03, 10), 10);
        assert_eq!(top_n(0, 0.03, 10), 10);
    }

    #[test]
    fn lot_volume_rounds_down_to_whole_lots() {
        assert_eq!(lot_volume(11_964.0, 0.5, 37.0, 100), 100);
        assert_eq!(lot_volume(119_640.0, 0.5, 37.0, 100), 1600);
        assert_eq!(lot_volume(1_000.0, 0.5, 37.0, 100), 0);
        assert_eq!(lot_volume(1_000.0, 1.0, 0.0, 100), 0);
    }

    #[test]
    fn ranking_is_stable_on_ties() {
        let ranked = rank(vec![
            candidate("A", 1.0, 10.0),
            candidate("B", 2.0, 10.0),
            candidate("C", 1.0, 10.0),
            candidate("D", 2.0, 10.0),
        ]);
        let order: Vec<&str> = ranked.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(order, vec!["B", "D", "A", "C"]);
    }

    #[test]
    fn two_hundred_candidates_select_ten() {
        let candidates: Vec<Candidate> = (0..200)
            .map(|i| candidate(&format!("{i:06}"), i as f64, 10.0))
            .collect();
        let out = size_positions(candidates, 1_000_000.0, &SizingParams::default());

        assert_eq!(out.selected, 10);
        assert_eq!(out.holdings.len(), 10);
        assert_eq!(out.holdings.holdings[0].symbol, "000199");
        for h in out.holdings.iter() {
            assert_eq!(h.target_weight, 0.1);
            assert_eq!(h.volume, 10_000);
        }
        assert!((out.holdings.weight_sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fewer_candidates_than_floor_takes_all() {
        let candidates = vec![candidate("A", 2.0, 10.0), candidate("B", 1.0, 20.0)];
        let out = size_positions(candidates, 100_000.0, &SizingParams::default());
        assert_eq!(out.selected, 2);
        assert_eq!(out.holdings.holdings[0].volume, 5_000);
        assert_eq!(out.holdings.holdings[1].volume, 2_500);
        assert_eq!(out.deployed, 100_000.0);
        assert_eq!(out.cash_left, 0.0);
    }

    #[test]
    fn zero_volume_rows_are_dropped_and_weights_renormalized() {
        let candidates = vec![
            candidate("CHEAP", 4.0, 5.0),
            candidate("PRICEY", 3.0, 2_000.0),
            candidate("MID", 2.0, 10.0),
            candidate("LOW", 1.0, 20.0),
        ];
        // budget per name = 30_000; PRICEY needs 200_000 for a lot
        let out = size_positions(candidates, 120_000.0, &SizingParams::default());

        assert_eq!(out.selected, 4);
        assert_eq!(out.dropped_zero_volume, 1);
        assert_eq!(out.holdings.len(), 3);
        assert_eq!(out.holdings.holdings[0].volume, 6_000);
        assert_eq!(out.holdings.holdings[1].volume, 3_000);
        assert_eq!(out.holdings.holdings[2].volume, 1_500);
        assert!(out.holdings.iter().all(|h| h.target_weight == 1.0 / 3.0));
        assert!(out.holdings.validate(100).is_ok());
        assert_eq!(out.deployed, 90_000.0);
    }

    #[test]
    fn nothing_affordable_yields_empty_set() {
        let out = size_positions(vec![candidate("A", 1.0, 500.0)], 1_000.0, &SizingParams::default());
        assert!(out.holdings.is_empty());
        assert_eq!(out.dropped_zero_volume, 1);
        assert_eq!(out.cash_left, 1_000.0);
    }

    #[test]
    fn empty_input() {
        let out = size_positions(Vec::new(), 1_000.0, &SizingParams::default());
        assert_eq!(out.selected, 0);
        assert!(out.holdings.is_empty());
    }
}
