//! Buy-list core: domain types, data stores, filters, sizing, rollover and the
//! holdings repository.
//!
//! Everything here is synchronous and free of configuration files. The runner
//! crate wires these pieces into a cycle:
//! - Factor snapshots and the stores they are read from
//! - Execution-day resolution (first session after the factor date)
//! - Listing-age, signal, tradability and limit-move filters
//! - Ranking and board-lot sizing
//! - Capital rollover from the prior holdings
//! - Holdings persistence with archiving

pub mod data;
pub mod domain;
pub mod execution;
pub mod filter;
pub mod holdings;
pub mod limits;
pub mod rollover;
pub mod sizing;
