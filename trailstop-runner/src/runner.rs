//! Pipeline runner: indicator feed, signals, backtest and ledger in order.
//!
//! Two entry points:
//! - `build_signals()`: feed and signal stage only. Used by the CLI's
//!   `signals` command.
//! - `run_pipeline()`: every stage plus the trade summary and summary
//!   statistics. Pure in its inputs, so reruns produce identical digests.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use trailstop_core::{
    generate_signals, reconstruct_daily, run_backtest, BacktestOutcome, ConfigError, DailyRow,
    IndicatorFeed, PriceTable, Signal,
};

use crate::config::{PipelineConfig, ResolvedConfig, RunId};
use crate::data_loader::LoadError;
use crate::metrics::TradeSummary;
use crate::summary_stats::SummaryStats;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("cannot render TOML: {0}")]
    TomlWrite(#[from] toml::ser::Error),
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Current schema version for serialized results.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub signal_count: usize,
    pub bar_count: usize,
    pub outcome: BacktestOutcome,
    pub daily: Vec<DailyRow>,
    pub summary: TradeSummary,
    /// Over daily portfolio returns, excluding the first row.
    pub stats: Option<SummaryStats>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl PipelineResult {
    /// BLAKE3 digest of the serialized trade log and daily table.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&serde_json::to_vec(&self.outcome.trades).unwrap_or_default());
        hasher.update(&serde_json::to_vec(&self.daily).unwrap_or_default());
        hasher.finalize().to_hex().to_string()
    }
}

/// Compute the indicator feed and the signal table.
pub fn build_signals(config: &ResolvedConfig, prices: &PriceTable) -> Result<Vec<Signal>, RunError> {
    let feed = IndicatorFeed::compute(prices, &config.indicators)?;
    Ok(generate_signals(
        &config.universe,
        prices,
        &feed,
        &config.signals,
    )?)
}

/// Run every stage over pre-loaded prices. No I/O.
pub fn run_pipeline(config: &PipelineConfig, prices: &PriceTable) -> Result<PipelineResult, RunError> {
    let resolved = config.resolve()?;
    let run_id = config.run_id();
    tracing::info!(run_id = %run_id, assets = resolved.universe.len(), bars = prices.len(), "pipeline started");

    let signals = build_signals(&resolved, prices)?;
    let outcome = run_backtest(&resolved.universe, prices, &signals, &resolved.backtest)?;
    let daily = reconstruct_daily(
        &resolved.universe,
        prices,
        &outcome.trades,
        resolved.backtest.initial_capital,
    )?;

    let summary = TradeSummary::compute(&outcome.trades, &daily);
    let returns: Vec<_> = daily
        .iter()
        .skip(1)
        .map(|row| (row.date, row.return_dec))
        .collect();
    let stats = SummaryStats::compute(&returns, resolved.period, resolved.use_calendar_days);

    Ok(PipelineResult {
        schema_version: SCHEMA_VERSION,
        run_id,
        signal_count: signals.len(),
        bar_count: prices.len(),
        outcome,
        daily,
        summary,
        stats,
    })
}
