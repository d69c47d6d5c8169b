//! Trailstop Runner: pipeline orchestration on top of `trailstop-core`.
//!
//! - TOML pipeline configuration with defaults and a content-addressed run id
//! - CSV bar loading per asset, plus a deterministic synthetic mode
//! - End-to-end run: feed, signals, backtest, daily ledger
//! - Trade summary and period summary statistics

pub mod config;
pub mod data_loader;
pub mod metrics;
pub mod runner;
pub mod summary_stats;

pub use config::{PipelineConfig, ResolvedConfig, RunId};
pub use data_loader::{
    load_csv_bars, load_universe, synthetic_universe, LoadError, LoadedData,
};
pub use metrics::TradeSummary;
pub use runner::{build_signals, run_pipeline, PipelineResult, RunError};
pub use summary_stats::SummaryStats;
