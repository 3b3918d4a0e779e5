//! Daily price-limit tiers.
//!
//! The limit ratio is chosen by the first matching rule of [`LIMIT_RULES`]:
//! a special-treatment marker in the name wins over any board prefix.

use serde::Serialize;

/// What a rule matches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LimitMatch {
    /// Name contains the marker.
    NameContains(&'static str),
    /// Symbol starts with any of the prefixes.
    SymbolPrefix(&'static [&'static str]),
}

/// One row of the limit table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LimitRule {
    pub tier: &'static str,
    pub matcher: LimitMatch,
    pub ratio: f64,
}

impl LimitRule {
    pub fn matches(&self, symbol: &str, name: &str) -> bool {
        match self.matcher {
            LimitMatch::NameContains(marker) => name.contains(marker),
            LimitMatch::SymbolPrefix(prefixes) => prefixes.iter().any(|p| symbol.starts_with(p)),
        }
    }
}

/// Ratio used when no rule matches (main board).
pub const MAIN_BOARD_RATIO: f64 = 0.10;

/// Ordered rule table. Earlier rules take precedence.
pub const LIMIT_RULES: [LimitRule; 3] = [
    LimitRule {
        tier: "special_treatment",
        matcher: LimitMatch::NameContains("ST"),
        ratio: 0.05,
    },
    LimitRule {
        tier: "growth_board",
        matcher: LimitMatch::SymbolPrefix(&["688", "689", "300", "301"]),
        ratio: 0.20,
    },
    LimitRule {
        tier: "alternative_board",
        matcher: LimitMatch::SymbolPrefix(&["8", "4", "92"]),
        ratio: 0.30,
    },
];

/// Tier name of the rule that applies, or `"main_board"`.
pub fn limit_tier(symbol: &str, name: &str) -> &'static str {
    LIMIT_RULES
        .iter()
        .find(|r| r.matches(symbol, name))
        .map_or("main_board", |r| r.tier)
}

/// Maximum single-session move for a security.
pub fn limit_ratio(symbol: &str, name: &str) -> f64 {
    LIMIT_RULES
        .iter()
        .find(|r| r.matches(symbol, name))
        .map_or(MAIN_BOARD_RATIO, |r| r.ratio)
}

/// Whether an open at `pct_chg` above the previous close is too close to the
/// ceiling to be filled.
pub fn is_limit_locked(pct_chg: f64, ratio: f64, margin: f64) -> bool {
    pct_chg > ratio - margin
}
