//! Trailstop Core: signal generation, trailing-stop backtest, daily ledger.
//!
//! Three synchronous stages over immutable inputs:
//! - Signal generator: RSI, moving-average and Bollinger filters over an
//!   indicator feed, producing a deduplicated time-ordered signal table
//! - Backtest execution engine: sequential entries and trailing-stop exits
//!   under one shared cash pool and a global timestamp gate
//! - Ledger reconstruction: replays the trade log into daily cash, holdings,
//!   equity, returns and drawdowns
//!
//! Supporting modules hold the aligned price table, the indicator feed that
//! produces the signal inputs, configuration records and the error taxonomy.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod indicators;
pub mod ledger;
pub mod signals;

pub use config::{
    BacktestConfig, BollingerRule, EntryOrder, FeeSchedule, IndicatorParams, ReturnPeriod,
    SignalConfig,
};
pub use domain::{AssetDay, Bar, DailyRow, ExitKind, PriceTable, Signal, StrandedEntry, Trade};
pub use engine::{run_backtest, BacktestOutcome};
pub use error::ConfigError;
pub use indicators::IndicatorFeed;
pub use ledger::reconstruct_daily;
pub use signals::generate_signals;
