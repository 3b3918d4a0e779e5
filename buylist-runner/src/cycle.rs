//! One buy-list cycle.
//!
//! Stages run strictly in order:
//!
//! ```text
//! Init → LoadPriorHoldings → Rollover | ColdStart → LoadFactors
//!      → ResolveExecution → Filter → RankAndSize → WriteHoldings → Done
//! ```
//!
//! Any failure stops the cycle with a [`CycleFailure`] naming the stage, and
//! nothing is written. The holdings artifact is only touched by the final
//! `WriteHoldings` stage.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use buylist_core::data::{
    CsvSecurityMaster, DataError, ExecutionDayResolver, FactorSnapshotStore, FactorSource,
    PriceHistory, PriceSource, SecurityMaster,
};
use buylist_core::execution::resolve_next_quotes;
use buylist_core::filter::{prescreen, screen_execution, RejectionCounts};
use buylist_core::holdings::{holdings_to_csv, CsvHoldingsStore, HoldingsError, HoldingsRepository};
use buylist_core::rollover::compute_rollover;
use buylist_core::sizing::size_positions;

use crate::config::CycleConfig;
use crate::lock::CycleLock;
use crate::report::{CandidateCounts, CycleReport, SCHEMA_VERSION};

/// Position in the cycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStage {
    Init,
    LoadPriorHoldings,
    Rollover,
    ColdStart,
    LoadFactors,
    ResolveExecution,
    Filter,
    RankAndSize,
    WriteHoldings,
    Done,
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::LoadPriorHoldings => "load_prior_holdings",
            Self::Rollover => "rollover",
            Self::ColdStart => "cold_start",
            Self::LoadFactors => "load_factors",
            Self::ResolveExecution => "resolve_execution",
            Self::Filter => "filter",
            Self::RankAndSize => "rank_and_size",
            Self::WriteHoldings => "write_holdings",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Reasons a cycle aborts.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("factor snapshot unavailable: {0}")]
    DataUnavailable(#[source] DataError),

    #[error("no forward quotes after {t_date} for {requested} screened symbols")]
    NoForwardQuotes { t_date: NaiveDate, requested: usize },

    #[error("no candidates left after filtering ({} rejected)", .counts.total())]
    EmptyAfterFiltering { counts: RejectionCounts },

    #[error("capital {capital:.2} buys no board lot of the {selected} selected names")]
    NoAffordablePositions { capital: f64, selected: usize },

    #[error("another cycle holds {}", .path.display())]
    Locked { path: PathBuf },

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Holdings(#[from] HoldingsError),
}

/// A cycle error together with the stage it happened in.
#[derive(Debug, Error)]
#[error("cycle failed at {stage}: {source}")]
pub struct CycleFailure {
    pub stage: CycleStage,
    pub source: CycleError,
}

impl CycleFailure {
    pub fn new(stage: CycleStage, source: impl Into<CycleError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

/// The external collaborators of a cycle.
#[derive(Clone, Copy)]
pub struct CycleInputs<'a> {
    pub factors: &'a dyn FactorSource,
    pub securities: &'a dyn SecurityMaster,
    pub resolver: &'a dyn ExecutionDayResolver,
    pub prices: &'a dyn PriceSource,
}

impl<'a> CycleInputs<'a> {
    /// All four collaborators served by one value, such as a `MemoryMarket`.
    pub fn uniform<M>(market: &'a M) -> Self
    where
        M: FactorSource + SecurityMaster + ExecutionDayResolver + PriceSource,
    {
        Self {
            factors: market,
            securities: market,
            resolver: market,
            prices: market,
        }
    }
}

/// Per-run switches that are not part of the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOptions {
    /// Reference date for listing age and staleness checks.
    pub as_of: NaiveDate,
    /// Compute everything but leave the holdings artifact alone.
    pub dry_run: bool,
}

impl CycleOptions {
    pub fn today() -> Self {
        Self {
            as_of: chrono::Local::now().date_naive(),
            dry_run: false,
        }
    }
}

/// Run one cycle against already-opened inputs.
pub fn run_cycle(
    config: &CycleConfig,
    inputs: &CycleInputs<'_>,
    repo: &mut dyn HoldingsRepository,
    opts: &CycleOptions,
) -> Result<CycleReport, CycleFailure> {
    use CycleStage::*;

    let mut warnings = Vec::new();

    // ── Prior holdings and capital ──
    let prior = if config.is_rolling() {
        repo.load().map_err(|e| CycleFailure::new(LoadPriorHoldings, e))?
    } else {
        None
    };
    let rollover_stage = if prior.as_ref().is_some_and(|p| !p.is_empty()) {
        Rollover
    } else {
        ColdStart
    };
    info!("stage {rollover_stage}");
    let rollover = compute_rollover(
        prior.as_ref(),
        inputs.prices,
        config.cycle.initial_capital,
        config.cycle.friction_rate,
    )
    .map_err(|e| CycleFailure::new(rollover_stage, e))?;
    for symbol in &rollover.fallbacks {
        warnings.push(format!("{symbol}: no fresh price, valued at cost"));
    }

    // ── Factor snapshot ──
    let snapshot = inputs
        .factors
        .load(&config.period_selector())
        .map_err(|e| CycleFailure::new(LoadFactors, CycleError::DataUnavailable(e)))?;
    let age = (opts.as_of - snapshot.t_date).num_days();
    if age > config.filters.stale_after_days {
        let msg = format!(
            "factor date {} is {age} days before {}",
            snapshot.t_date, opts.as_of
        );
        warn!("{msg}");
        warnings.push(msg);
    }

    let symbols: Vec<String> = snapshot.records.iter().map(|r| r.symbol.clone()).collect();
    let securities = inputs
        .securities
        .lookup(&symbols)
        .map_err(|e| CycleFailure::new(LoadFactors, e))?;

    let params = config.filter_params(opts.as_of);
    let mut rejections = RejectionCounts::default();
    let screened = prescreen(&snapshot.records, &securities, &params, &mut rejections);
    let mut counts = CandidateCounts {
        snapshot_rows: snapshot.len(),
        with_metadata: snapshot
            .records
            .iter()
            .filter(|r| securities.contains_key(&r.symbol))
            .count(),
        screened: screened.len(),
        ..CandidateCounts::default()
    };
    if screened.is_empty() {
        return Err(CycleFailure::new(
            Filter,
            CycleError::EmptyAfterFiltering { counts: rejections },
        ));
    }

    // ── Execution day ──
    info!("stage {}: {} symbols", ResolveExecution, screened.len());
    let wanted: Vec<String> = screened.iter().map(|s| s.symbol.clone()).collect();
    let quotes = resolve_next_quotes(inputs.resolver, snapshot.t_date, &wanted)
        .map_err(|e| CycleFailure::new(ResolveExecution, e))?;
    if quotes.is_empty() {
        return Err(CycleFailure::new(
            ResolveExecution,
            CycleError::NoForwardQuotes {
                t_date: snapshot.t_date,
                requested: wanted.len(),
            },
        ));
    }

    // ── Filter ──
    let outcome = screen_execution(&screened, &quotes, &params, &mut rejections);
    counts.quoted = outcome.joined;
    counts.eligible = outcome.candidates.len();
    info!(
        "stage {}: {} eligible, rejected {} (listing {}, signal {}, suspended {}, limit {})",
        Filter,
        outcome.candidates.len(),
        rejections.total(),
        rejections.listing_age,
        rejections.missing_signal,
        rejections.suspended,
        rejections.limit_up
    );
    if let Some(exec) = outcome.market_date {
        let gap = (exec - snapshot.t_date).num_days();
        if gap > config.filters.stale_after_days {
            let msg = format!(
                "execution date {exec} is {gap} days after factor date {}",
                snapshot.t_date
            );
            warn!("{msg}");
            warnings.push(msg);
        }
    }
    if outcome.candidates.is_empty() {
        return Err(CycleFailure::new(
            Filter,
            CycleError::EmptyAfterFiltering { counts: rejections },
        ));
    }

    // ── Rank and size ──
    let sized = size_positions(outcome.candidates, rollover.capital, &config.sizing_params());
    counts.selected = sized.selected;
    counts.dropped_zero_volume = sized.dropped_zero_volume;
    counts.written = sized.holdings.len();
    if sized.holdings.is_empty() {
        return Err(CycleFailure::new(
            RankAndSize,
            CycleError::NoAffordablePositions {
                capital: rollover.capital,
                selected: sized.selected,
            },
        ));
    }
    if sized.dropped_zero_volume > 0 {
        warn!(
            "{} of {} selected names could not afford one lot",
            sized.dropped_zero_volume, sized.selected
        );
    }
    info!(
        "stage {}: {} positions, {:.2} deployed of {:.2}",
        RankAndSize,
        sized.holdings.len(),
        sized.deployed,
        rollover.capital
    );

    // ── Write ──
    let rendered =
        holdings_to_csv(&sized.holdings).map_err(|e| CycleFailure::new(WriteHoldings, e))?;
    let holdings_hash = blake3::hash(rendered.as_bytes()).to_hex().to_string();
    let archived = if opts.dry_run {
        info!("dry run, holdings not written");
        None
    } else {
        repo.save(&sized.holdings)
            .map_err(|e| CycleFailure::new(WriteHoldings, e))?
    };

    info!("stage {}", Done);
    Ok(CycleReport {
        schema_version: SCHEMA_VERSION,
        mode: config.cycle.mode,
        snapshot_file: snapshot.source.clone(),
        snapshot_label: snapshot.label.clone(),
        snapshot_hash: snapshot.content_hash(),
        t_date: snapshot.t_date,
        as_of: opts.as_of,
        execution_date: outcome.market_date,
        rollover,
        counts,
        rejections,
        deployed: sized.deployed,
        cash_left: sized.cash_left,
        holdings_hash,
        config_hash: config.config_hash(),
        archived,
        warnings,
        dry_run: opts.dry_run,
        holdings: sized.holdings,
    })
}

/// Open the file-backed stores named by `config` and run a cycle.
///
/// The holdings lock is held for the whole cycle unless this is a dry run.
pub fn run_from_config(
    config: &CycleConfig,
    opts: &CycleOptions,
) -> Result<CycleReport, CycleFailure> {
    use CycleStage::Init;

    let paths = &config.paths;
    let _lock = if opts.dry_run {
        None
    } else {
        Some(acquire_lock(&paths.holdings_file)?)
    };

    info!("stage {}", Init);
    let factors = FactorSnapshotStore::new(&paths.factor_dir);
    let securities =
        CsvSecurityMaster::open(&paths.security_master).map_err(|e| CycleFailure::new(Init, e))?;
    let history =
        PriceHistory::open(&paths.price_history).map_err(|e| CycleFailure::new(Init, e))?;
    let mut repo = CsvHoldingsStore::new(&paths.holdings_file, &paths.history_dir)
        .with_lot(config.filters.board_lot);

    let inputs = CycleInputs {
        factors: &factors,
        securities: &securities,
        resolver: &history,
        prices: &history,
    };
    run_cycle(config, &inputs, &mut repo, opts)
}

/// The holdings artifact `config` points at, if any.
pub fn load_current_holdings(
    config: &CycleConfig,
) -> Result<Option<buylist_core::domain::HoldingSet>, HoldingsError> {
    CsvHoldingsStore::new(&config.paths.holdings_file, &config.paths.history_dir).load()
}

fn acquire_lock(holdings_file: &Path) -> Result<CycleLock, CycleFailure> {
    CycleLock::acquire(holdings_file).map_err(|e| {
        let source = if e.kind() == io::ErrorKind::AlreadyExists {
            CycleError::Locked {
                path: CycleLock::path_for(holdings_file),
            }
        } else {
            CycleError::Holdings(HoldingsError::Io(e))
        };
        CycleFailure::new(CycleStage::Init, source)
    })
}
