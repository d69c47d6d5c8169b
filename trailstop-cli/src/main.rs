//! Trailstop CLI: signal, backtest and ledger commands.
//!
//! Commands:
//! - `run`: full pipeline, prints the trade summary and summary statistics
//! - `signals`: print the signal table as CSV-like rows
//! - `config`: print the default TOML configuration

use anyhow::{bail, Context, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use trailstop_runner::data_loader::parse_timestamp;
use trailstop_runner::{
    build_signals, load_universe, run_pipeline, synthetic_universe, LoadedData, PipelineConfig,
    PipelineResult,
};

#[derive(Parser)]
#[command(
    name = "trailstop",
    about = "Trailstop: multi-asset trailing-stop backtest with a daily ledger"
)]
struct Cli {
    /// Log at debug level (overrides RUST_LOG).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct DataArgs {
    /// Path to a TOML pipeline config. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding one `<asset>.csv` per asset.
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Use deterministic synthetic minute bars instead of CSV files.
    #[arg(long, default_value_t = false)]
    synthetic: bool,

    /// Number of synthetic minute bars per asset.
    #[arg(long, default_value_t = 7 * 1440)]
    minutes: usize,

    /// First synthetic timestamp (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS).
    #[arg(long, default_value = "2024-01-01")]
    start: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run signals, backtest and ledger; print the summaries.
    Run {
        #[command(flatten)]
        data: DataArgs,

        /// Write the full result as JSON to this path.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the signal table without running the backtest.
    Signals {
        #[command(flatten)]
        data: DataArgs,
    },
    /// Print the default configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run { data, output } => run_cmd(&data, output.as_deref()),
        Commands::Signals { data } => signals_cmd(&data),
        Commands::Config => {
            print!("{}", PipelineConfig::default().to_toml()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn load_data(args: &DataArgs, config: &PipelineConfig) -> Result<LoadedData> {
    let assets = &config.universe.assets;
    if args.synthetic {
        let start: NaiveDateTime = match parse_timestamp(&args.start) {
            Some(ts) => ts,
            None => bail!("invalid --start '{}'", args.start),
        };
        return Ok(synthetic_universe(assets, start, args.minutes));
    }
    load_universe(&args.data_dir, assets)
        .with_context(|| format!("loading bars from {}", args.data_dir.display()))
}

fn run_cmd(args: &DataArgs, output: Option<&Path>) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let data = load_data(args, &config)?;

    let result = run_pipeline(&config, &data.prices).context("pipeline run failed")?;
    print_summary(&result, &data);

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        println!("Result saved to: {}", path.display());
    }
    Ok(())
}

fn signals_cmd(args: &DataArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let data = load_data(args, &config)?;
    let resolved = config.resolve()?;

    let signals = build_signals(&resolved, &data.prices)?;
    println!("timestamp,asset,open,high,low,close,close_prev,ma_passes,allocation_pct");
    for s in &signals {
        println!(
            "{},{},{},{},{},{},{},{},{}",
            s.timestamp, s.asset, s.open, s.high, s.low, s.close, s.close_prev, s.ma_passes,
            s.allocation_pct
        );
    }
    Ok(())
}

fn print_summary(result: &PipelineResult, data: &LoadedData) {
    let outcome = &result.outcome;
    let summary = &result.summary;

    println!();
    println!("=== Backtest Result ===");
    println!("Run id:         {}", result.run_id);
    println!("Dataset:        {}", data.dataset_hash);
    println!("Bars:           {}", result.bar_count);
    println!("Signals:        {}", result.signal_count);
    println!("Trades:         {}", outcome.trades.len());
    println!("Gated groups:   {}", outcome.skipped_groups);
    println!("Limit discards: {}", outcome.discarded_limit_signals);
    println!("Untradable:     {}", outcome.untradable_signals);
    println!("Final cash:     {:.2}", outcome.final_cash);
    if !outcome.stranded.is_empty() {
        println!(
            "Stranded:       {} entries, {:.2} cash debited",
            outcome.stranded.len(),
            outcome.stranded_capital()
        );
    }

    println!();
    println!("--- Trades ---");
    println!("Counted:        {}", summary.total_trades);
    println!("Win Rate:       {:.1}%", summary.win_rate * 100.0);
    println!("Total Return:   {:.2}%", summary.total_return * 100.0);
    println!("Avg Return:     {:.3}%", summary.avg_return * 100.0);
    println!(
        "Best / Worst:   {:.3}% / {:.3}%",
        summary.max_return * 100.0,
        summary.min_return * 100.0
    );
    println!("Total PnL:      {:.2}", summary.total_pnl);
    println!("Avg PnL:        {:.2}", summary.avg_pnl);
    println!("Max Drawdown:   {:.2}%", summary.max_drawdown_pct);

    if let Some(stats) = &result.stats {
        println!();
        println!("--- {} Statistics ---", stats.period.label());
        println!("Ann. Mean:      {:.2}%", stats.annualized_mean * 100.0);
        println!("Ann. Vol:       {:.2}%", stats.annualized_volatility * 100.0);
        println!("Sharpe:         {:.3}", stats.sharpe);
        println!("CAGR:           {:.2}%", stats.cagr * 100.0);
        println!("MAR:            {:.3}", stats.mar_ratio);
        println!(
            "Drawdown:       {:.2}% ({} -> {})",
            stats.max_drawdown * 100.0,
            stats.peak_date,
            stats.trough_date
        );
        match (stats.recovery_date, stats.days_to_recover) {
            (Some(date), Some(days)) => println!("Recovered:      {date} ({days} days)"),
            _ => println!("Recovered:      not yet"),
        }
    }

    if data.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}
