//! Buy-list runner: configuration, cycle orchestration, locking and reports.
//!
//! This crate builds on `buylist-core` to provide:
//! - TOML cycle configuration with validated defaults
//! - The cycle state machine from prior holdings to a written buy list
//! - A lock around the holdings artifact
//! - Cycle reports with JSON export

pub mod config;
pub mod cycle;
pub mod lock;
pub mod report;

pub use config::{ConfigError, CycleConfig, CycleMode};
pub use cycle::{
    load_current_holdings, run_cycle, run_from_config, CycleError, CycleFailure, CycleInputs,
    CycleOptions, CycleStage,
};
pub use lock::CycleLock;
pub use report::{
    export_json, format_holdings_table, import_json, save_report_json, CandidateCounts,
    CycleReport, SCHEMA_VERSION,
};
