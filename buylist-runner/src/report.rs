//! Cycle report: what a cycle read, what it rejected and what it wrote.
//!
//! The report is printed as a console summary by the CLI and can be saved as
//! JSON. Persisted reports carry a `schema_version`; unknown versions are
//! rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use buylist_core::domain::HoldingSet;
use buylist_core::filter::RejectionCounts;
use buylist_core::rollover::RolloverState;

use crate::config::CycleMode;

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// Candidate counts at each step of a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCounts {
    /// Rows of the snapshot at its T-date.
    pub snapshot_rows: usize,
    /// Rows with security metadata.
    pub with_metadata: usize,
    /// Passed the listing-age and signal checks.
    pub screened: usize,
    /// Screened names with a forward quote.
    pub quoted: usize,
    /// Passed every filter.
    pub eligible: usize,
    /// Taken from the top of the ranking.
    pub selected: usize,
    pub dropped_zero_volume: usize,
    pub written: usize,
}

/// Everything a completed cycle reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub mode: CycleMode,
    pub snapshot_file: PathBuf,
    pub snapshot_label: String,
    pub snapshot_hash: String,
    pub t_date: NaiveDate,
    pub as_of: NaiveDate,
    /// Dominant next session of the candidate batch.
    pub execution_date: Option<NaiveDate>,
    pub rollover: RolloverState,
    pub counts: CandidateCounts,
    pub rejections: RejectionCounts,
    pub deployed: f64,
    pub cash_left: f64,
    /// BLAKE3 of the rendered holdings CSV.
    pub holdings_hash: String,
    pub config_hash: String,
    /// Where the previous artifact was archived, if one existed.
    pub archived: Option<PathBuf>,
    pub warnings: Vec<String>,
    pub dry_run: bool,
    pub holdings: HoldingSet,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl CycleReport {
    /// Share of the cycle's capital committed at cost prices.
    pub fn deployment_ratio(&self) -> f64 {
        if self.rollover.capital > 0.0 {
            self.deployed / self.rollover.capital
        } else {
            0.0
        }
    }
}

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a report to pretty JSON.
pub fn export_json(report: &CycleReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize CycleReport to JSON")
}

/// Deserialize a report, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<CycleReport> {
    let report: CycleReport =
        serde_json::from_str(json).context("failed to deserialize CycleReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

/// Write a report as JSON, creating parent directories.
pub fn save_report_json(report: &CycleReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let json = export_json(report)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Text ───────────────────────────────────────────────────────────

/// Fixed-width holdings table for terminals.
pub fn format_holdings_table(set: &HoldingSet) -> String {
    let mut out = String::with_capacity(64 * (set.len() + 2));
    out.push_str(&format!(
        "{:<8} {:<12} {:>10} {:>10} {:>12} {:>10} {:>8}\n",
        "Symbol", "Name", "Cost", "Volume", "Value", "Factor", "Weight"
    ));
    out.push_str(&"-".repeat(76));
    out.push('\n');
    for h in set.iter() {
        out.push_str(&format!(
            "{:<8} {:<12} {:>10.2} {:>10} {:>12.2} {:>10.4} {:>7.2}%\n",
            h.symbol,
            h.name,
            h.cost_price,
            h.volume,
            h.cost_value(),
            h.factor,
            h.target_weight * 100.0
        ));
    }
    out
}
