//! Backtest execution engine.
//!
//! Consumes the signal table and the price table, simulates sequential
//! entries and trailing-stop exits against one shared cash pool, and emits
//! an append-only trade log. Single-threaded by construction: the global
//! gate orders every trade lifecycle.

pub mod backtest;
pub mod exit;
pub mod position;
pub mod state;

pub use backtest::run_backtest;
pub use exit::{check_breach, find_exit, ExitFill};
pub use position::Position;
pub use state::{BacktestOutcome, EngineState};
