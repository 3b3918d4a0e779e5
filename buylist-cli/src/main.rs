//! Buy-list CLI: generate the next holdings file, show the current one, and
//! check configs.
//!
//! Commands:
//! - `generate`: run one cycle and write the holdings artifact
//! - `show`: print the current holdings artifact
//! - `check-config`: validate a config file and print it fully resolved

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use buylist_runner::{
    format_holdings_table, load_current_holdings, run_from_config, save_report_json, CycleConfig,
    CycleMode, CycleOptions, CycleReport,
};

#[derive(Parser)]
#[command(
    name = "buylist",
    about = "Rolling factor buy-list generator",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one cycle: roll over capital, filter, rank, size and write holdings.
    Generate {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Use the factor file of this period (e.g. 2026-02) at initial capital.
        #[arg(long, conflicts_with = "rolling")]
        period: Option<String>,

        /// Force rolling mode even if the config selects a target period.
        #[arg(long, default_value_t = false)]
        rolling: bool,

        /// Fraction of ranked candidates to hold.
        #[arg(long)]
        top_fraction: Option<f64>,

        /// Capital for a cold start or a target-period run.
        #[arg(long)]
        initial_capital: Option<f64>,

        /// Round-trip cost deducted on rollover.
        #[arg(long)]
        friction_rate: Option<f64>,

        /// Reference date (YYYY-MM-DD) for listing age and staleness. Defaults to today.
        #[arg(long)]
        as_of: Option<String>,

        /// Compute and print the buy list without writing it.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Also write the cycle report as JSON.
        #[arg(long)]
        report_json: Option<PathBuf>,
    },
    /// Print the current holdings artifact.
    Show {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Validate a config file and print the resolved values.
    CheckConfig {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
}

/// Flags that override config values for one run.
struct Overrides {
    period: Option<String>,
    rolling: bool,
    top_fraction: Option<f64>,
    initial_capital: Option<f64>,
    friction_rate: Option<f64>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            config,
            period,
            rolling,
            top_fraction,
            initial_capital,
            friction_rate,
            as_of,
            dry_run,
            report_json,
        } => run_generate(
            config.as_deref(),
            Overrides {
                period,
                rolling,
                top_fraction,
                initial_capital,
                friction_rate,
            },
            as_of.as_deref(),
            dry_run,
            report_json.as_deref(),
        ),
        Commands::Show { config } => run_show(config.as_deref()),
        Commands::CheckConfig { config } => run_check_config(&config),
    }
}

fn load_config(path: Option<&Path>) -> Result<CycleConfig> {
    match path {
        Some(p) => CycleConfig::from_file(p)
            .with_context(|| format!("failed to load config {}", p.display())),
        None => Ok(CycleConfig::default()),
    }
}

fn apply_overrides(config: &mut CycleConfig, o: Overrides) -> Result<()> {
    if let Some(period) = o.period {
        config.cycle.mode = CycleMode::Target;
        config.cycle.target_period = Some(period);
    }
    if o.rolling {
        config.cycle.mode = CycleMode::Rolling;
    }
    if let Some(v) = o.top_fraction {
        config.cycle.top_fraction = v;
    }
    if let Some(v) = o.initial_capital {
        config.cycle.initial_capital = v;
    }
    if let Some(v) = o.friction_rate {
        config.cycle.friction_rate = v;
    }
    config.validate()?;
    Ok(())
}

fn run_generate(
    config_path: Option<&Path>,
    overrides: Overrides,
    as_of: Option<&str>,
    dry_run: bool,
    report_json: Option<&Path>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    apply_overrides(&mut config, overrides)?;

    let as_of = as_of
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("--as-of must be YYYY-MM-DD")?
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    let opts = CycleOptions { as_of, dry_run };

    let report = match run_from_config(&config, &opts) {
        Ok(report) => report,
        Err(failure) => {
            log::error!("{failure}");
            return Err(failure.into());
        }
    };

    print_summary(&report, &config);

    if let Some(path) = report_json {
        save_report_json(&report, path)?;
        println!("Report saved to: {}", path.display());
    }
    Ok(())
}

fn run_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let path = &config.paths.holdings_file;
    let Some(set) = load_current_holdings(&config)
        .with_context(|| format!("failed to read {}", path.display()))?
    else {
        println!("No holdings file at {}", path.display());
        return Ok(());
    };

    println!("Holdings: {}", path.display());
    println!("Positions: {}", set.len());
    println!("Cost basis: {:.2}", set.total_cost());
    println!();
    print!("{}", format_holdings_table(&set));
    Ok(())
}

fn run_check_config(path: &Path) -> Result<()> {
    let config = load_config(Some(path))?;
    println!("Config OK: {}", path.display());
    println!("Hash: {}", config.config_hash());
    println!();
    print!("{}", config.to_toml()?);
    Ok(())
}

fn print_summary(report: &CycleReport, config: &CycleConfig) {
    let c = &report.counts;
    let r = &report.rejections;
    println!();
    println!("=== Buy List ===");
    println!(
        "Snapshot:       {} (T-date {})",
        report.snapshot_file.display(),
        report.t_date
    );
    match report.execution_date {
        Some(date) => println!("Execution date: {date}"),
        None => println!("Execution date: -"),
    }
    println!("As of:          {}", report.as_of);
    if report.rollover.is_rollover {
        println!(
            "Capital:        {:.2} (rollover of {:.2} at {:.2}% friction)",
            report.rollover.capital,
            report.rollover.liquidation_value.unwrap_or_default(),
            config.cycle.friction_rate * 100.0
        );
    } else {
        println!("Capital:        {:.2} (cold start)", report.rollover.capital);
    }
    println!();
    println!("--- Candidates ---");
    println!("Snapshot rows:  {}", c.snapshot_rows);
    println!("With metadata:  {}", c.with_metadata);
    println!("Listing age:    -{}", r.listing_age);
    println!("Missing signal: -{}", r.missing_signal);
    println!("Quoted:         {}", c.quoted);
    println!("Suspended:      -{}", r.suspended);
    println!("Limit-up:       -{}", r.limit_up);
    println!("Eligible:       {}", c.eligible);
    println!("Selected:       {}", c.selected);
    if c.dropped_zero_volume > 0 {
        println!("Below one lot:  -{}", c.dropped_zero_volume);
    }
    println!();
    println!("--- Holdings ---");
    println!("Positions:      {}", c.written);
    println!(
        "Deployed:       {:.2} ({:.1}%)",
        report.deployed,
        report.deployment_ratio() * 100.0
    );
    println!("Cash left:      {:.2}", report.cash_left);
    if report.dry_run {
        println!("Written:        no (dry run)");
    } else {
        println!("Written:        {}", config.paths.holdings_file.display());
    }
    if let Some(path) = &report.archived {
        println!("Archived:       {}", path.display());
    }
    for warn in &report.warnings {
        println!("WARNING: {warn}");
    }
    println!();
    print!("{}", format_holdings_table(&report.holdings));
}
