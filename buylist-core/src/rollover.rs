//! Capital rollover between cycles.
//!
//! The previous holdings artifact is marked to market and its liquidation
//! value, less an assumed round-trip friction, becomes the next cycle's
//! capital. Without a prior artifact the configured initial capital is used
//! as-is.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::data::{DataError, PriceSource};
use crate::domain::HoldingSet;

/// Capital available to a cycle and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloverState {
    pub capital: f64,
    pub is_rollover: bool,
    /// Mark-to-market value of the prior holdings (rollover only).
    pub liquidation_value: Option<f64>,
    /// Held symbols priced from the price source.
    pub priced: usize,
    /// Held symbols valued at their stored cost price because no price was found.
    pub fallbacks: Vec<String>,
}

impl RolloverState {
    pub fn cold_start(initial_capital: f64) -> Self {
        Self {
            capital: initial_capital,
            is_rollover: false,
            liquidation_value: None,
            priced: 0,
            fallbacks: Vec::new(),
        }
    }
}

/// Derive this cycle's capital.
///
/// A missing or empty prior set is a cold start. A per-symbol missing price
/// falls back to that holding's cost price (suspended names have no fresh
/// quote); a failure of the price source itself is returned as an error.
pub fn compute_rollover(
    prior: Option<&HoldingSet>,
    prices: &dyn PriceSource,
    initial_capital: f64,
    friction_rate: f64,
) -> Result<RolloverState, DataError> {
    let prior = match prior {
        Some(set) if !set.is_empty() => set,
        _ => {
            info!("no prior holdings, cold start with {initial_capital:.2}");
            return Ok(RolloverState::cold_start(initial_capital));
        }
    };

    let latest = prices.latest_prices(&prior.symbols())?;

    let mut liquidation_value = 0.0;
    let mut priced = 0;
    let mut fallbacks = Vec::new();
    for h in prior.iter() {
        let price = match latest.get(&h.symbol) {
            Some(p) => {
                priced += 1;
                *p
            }
            None => {
                warn!(
                    "{}: no fresh price, valuing at cost {}",
                    h.symbol, h.cost_price
                );
                fallbacks.push(h.symbol.clone());
                h.cost_price
            }
        };
        liquidation_value += price * h.volume as f64;
    }

    let capital = liquidation_value * (1.0 - friction_rate);
    info!(
        "prior holdings liquidate at {liquidation_value:.2}, {capital:.2} after {:.2}% friction",
        friction_rate * 100.0
    );
    Ok(RolloverState {
        capital,
        is_rollover: true,
        liquidation_value: Some(liquidation_value),
        priced,
        fallbacks,
    })
}
