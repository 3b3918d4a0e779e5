//! Data sources: factor snapshots, security master, price history

pub mod history;
pub mod memory;
pub(crate) mod parquet;
pub mod provider;
pub mod security;
pub mod snapshot;

pub use history::{DailyBar, PriceHistory};
pub use memory::MemoryMarket;
pub use provider::{
    DataError, ExecutionDayResolver, FactorSource, PeriodSelector, PriceSource, SecurityMaster,
};
pub use security::CsvSecurityMaster;
pub use snapshot::FactorSnapshotStore;
