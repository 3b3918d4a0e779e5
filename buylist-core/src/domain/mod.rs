//! Domain types for the buy-list cycle

pub mod candidate;
pub mod factor;
pub mod holding;
pub mod quote;
pub mod security;

pub use candidate::Candidate;
pub use factor::{FactorRecord, FactorSnapshot};
pub use holding::{Holding, HoldingSet};
pub use quote::ExecutionQuote;
pub use security::{normalize_symbol, SecurityMeta};

/// Minimum tradable share increment on the exchange.
pub const BOARD_LOT: u64 = 100;
