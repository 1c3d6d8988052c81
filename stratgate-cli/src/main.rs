//! StratGate CLI — validate, inspect, approve, and disable strategies.
//!
//! Commands:
//! - `validate` — run a full validation cycle from a CSV price file (or a
//!   seeded synthetic series) and write the markdown report
//! - `status` — show persisted lifecycle records
//! - `approve` — manual RESEARCH → WFA_PASSED move after human review
//! - `disable` — operator kill-switch for a strategy

mod data;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use stratgate_core::{synthetic_daily_series, BuyAndHoldEvaluator};
use stratgate_runner::{
    run_validation_cycle, CycleContext, JsonStatusStore, LifecycleStateMachine,
    ModelRiskAnalyzer, StatusStore, ValidationConfig,
};

#[derive(Parser)]
#[command(
    name = "stratgate",
    about = "StratGate CLI — strategy validation and lifecycle governance"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a validation cycle for one strategy and emit a report.
    Validate {
        /// Strategy name (status-store key).
        name: String,

        /// CSV price file with date/close columns.
        #[arg(long)]
        prices: Option<PathBuf>,

        /// Use a seeded synthetic series instead of a price file.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Seed for the synthetic series.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Synthetic series start date (YYYY-MM-DD).
        #[arg(long, default_value = "2018-01-02")]
        start: String,

        /// Synthetic series length in weekday bars.
        #[arg(long, default_value_t = 1560)]
        bars: usize,

        /// Path to a TOML validation config. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Status-store directory.
        #[arg(long, default_value = "status")]
        store_dir: PathBuf,

        /// Output directory for the markdown report.
        #[arg(long, default_value = "reports")]
        output_dir: PathBuf,
    },
    /// Show persisted lifecycle records.
    Status {
        /// Show one strategy instead of all.
        name: Option<String>,

        /// Status-store directory.
        #[arg(long, default_value = "status")]
        store_dir: PathBuf,
    },
    /// Record that a strategy passed walk-forward review (RESEARCH → WFA_PASSED).
    Approve {
        name: String,

        /// Status-store directory.
        #[arg(long, default_value = "status")]
        store_dir: PathBuf,
    },
    /// Force a strategy into DISABLED.
    Disable {
        name: String,

        /// Reason recorded on the status record.
        #[arg(long)]
        reason: String,

        /// Status-store directory.
        #[arg(long, default_value = "status")]
        store_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Validate {
            name,
            prices,
            synthetic,
            seed,
            start,
            bars,
            config,
            store_dir,
            output_dir,
        } => validate(
            &name, prices, synthetic, seed, &start, bars, config, store_dir, output_dir,
        ),
        Commands::Status { name, store_dir } => status(name.as_deref(), store_dir),
        Commands::Approve { name, store_dir } => approve(&name, store_dir),
        Commands::Disable {
            name,
            reason,
            store_dir,
        } => disable(&name, &reason, store_dir),
    }
}

#[allow(clippy::too_many_arguments)]
fn validate(
    name: &str,
    prices: Option<PathBuf>,
    synthetic: bool,
    seed: u64,
    start: &str,
    bars: usize,
    config_path: Option<PathBuf>,
    store_dir: PathBuf,
    output_dir: PathBuf,
) -> Result<()> {
    let series = match (&prices, synthetic) {
        (Some(path), false) => data::load_csv_series(path)?,
        (None, true) => {
            let start_date = parse_date(start)?;
            synthetic_daily_series(seed, start_date, bars, 0.0004, 0.01)
        }
        (Some(_), true) => bail!("--prices and --synthetic are mutually exclusive"),
        (None, false) => bail!("supply --prices <file> or --synthetic"),
    };

    let config = match config_path {
        Some(path) => ValidationConfig::from_toml_path(&path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ValidationConfig::default(),
    };

    let machine = LifecycleStateMachine::new(
        JsonStatusStore::new(store_dir),
        config.lifecycle.clone(),
    );
    let analyzer = ModelRiskAnalyzer::with_default_detectors(&config.risk);

    let outcome = run_validation_cycle(
        name,
        &series,
        &BuyAndHoldEvaluator,
        &analyzer,
        &machine,
        &config,
        &CycleContext::default(),
    )?;

    let report_path = outcome.report().save(&output_dir)?;

    // Full outcome as JSON next to the markdown report.
    let json_path = output_dir.join(format!("{name}_outcome.json"));
    std::fs::write(&json_path, serde_json::to_string_pretty(&outcome)?)?;

    println!("Strategy:      {name}");
    println!("Windows:       {}", outcome.wfa.aggregate.window_count);
    println!(
        "Mean OOS Sharpe: {:.2}  (overfit index {})",
        outcome.wfa.aggregate.mean_oos_sharpe,
        if outcome.wfa.aggregate.overfit_index.is_finite() {
            format!("{:.2}", outcome.wfa.aggregate.overfit_index)
        } else {
            "inf".to_string()
        }
    );
    println!("Risk rating:   {}", outcome.risk.rating);
    println!(
        "Lifecycle:     {} -> {} ({})",
        outcome.decision.from, outcome.decision.to, outcome.decision.reason
    );
    println!("Report:        {}", report_path.display());
    Ok(())
}

fn status(name: Option<&str>, store_dir: PathBuf) -> Result<()> {
    let store = JsonStatusStore::new(store_dir);
    let statuses = match name {
        Some(n) => match store.load(n)? {
            Some(s) => vec![s],
            None => bail!("no status record for '{n}'"),
        },
        None => store.list()?,
    };

    if statuses.is_empty() {
        println!("No strategies recorded.");
        return Ok(());
    }

    println!(
        "{:<24} {:<14} {:>6}  {:<8}  LAST TRANSITION",
        "STRATEGY", "STATE", "DAYS", "RATING"
    );
    for s in statuses {
        println!(
            "{:<24} {:<14} {:>6}  {:<8}  {}",
            s.strategy_name,
            s.state.to_string(),
            s.days_in_state,
            s.metadata
                .last_risk_rating
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".into()),
            s.metadata.last_transition_reason.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

fn approve(name: &str, store_dir: PathBuf) -> Result<()> {
    let machine = LifecycleStateMachine::new(
        JsonStatusStore::new(store_dir),
        stratgate_runner::LifecycleConfig::default(),
    );
    let decision = machine.mark_wfa_passed(name)?;
    println!(
        "{name}: {} -> {} ({})",
        decision.from, decision.to, decision.reason
    );
    Ok(())
}

fn disable(name: &str, reason: &str, store_dir: PathBuf) -> Result<()> {
    let machine = LifecycleStateMachine::new(
        JsonStatusStore::new(store_dir),
        stratgate_runner::LifecycleConfig::default(),
    );
    let decision = machine.disable(name, reason)?;
    println!(
        "{name}: {} -> {} ({})",
        decision.from, decision.to, decision.reason
    );
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("bad date '{s}'"))
}
