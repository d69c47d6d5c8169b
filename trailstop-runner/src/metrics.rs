//! Trade summary: pure aggregation over the trade log and daily ledger.

use serde::{Deserialize, Serialize};
use trailstop_core::{DailyRow, Trade};

/// Trades at or below this quantity never held a real position.
pub const MIN_TRADED_QUANTITY: f64 = 0.01;

/// Aggregate statistics over the trades that actually held a position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeSummary {
    pub total_trades: usize,
    pub win_rate: f64,
    /// Last portfolio cumulative return of the daily ledger.
    pub total_return: f64,
    pub avg_return: f64,
    pub max_return: f64,
    pub min_return: f64,
    pub total_pnl: f64,
    pub avg_pnl: f64,
    pub max_pnl: f64,
    pub min_pnl: f64,
    /// Worst portfolio drawdown, in percent (e.g. -12.5).
    pub max_drawdown_pct: f64,
}

impl TradeSummary {
    pub fn compute(trades: &[Trade], daily: &[DailyRow]) -> Self {
        let traded: Vec<&Trade> = trades
            .iter()
            .filter(|t| t.quantity > MIN_TRADED_QUANTITY)
            .collect();

        let total_return = daily.last().map(|r| r.cum_return).unwrap_or(0.0);
        let max_drawdown_pct = daily
            .iter()
            .map(|r| r.drawdown)
            .reduce(f64::min)
            .unwrap_or(0.0)
            * 100.0;

        if traded.is_empty() {
            return Self {
                total_return,
                max_drawdown_pct,
                ..Self::default()
            };
        }

        let returns: Vec<f64> = traded.iter().map(|t| t.return_dec).collect();
        let pnls: Vec<f64> = traded.iter().map(|t| t.pnl).collect();
        let winners = traded.iter().filter(|t| t.is_winner()).count();

        Self {
            total_trades: traded.len(),
            win_rate: winners as f64 / traded.len() as f64,
            total_return,
            avg_return: mean(&returns),
            max_return: max(&returns),
            min_return: min(&returns),
            total_pnl: pnls.iter().sum(),
            avg_pnl: mean(&pnls),
            max_pnl: max(&pnls),
            min_pnl: min(&pnls),
            max_drawdown_pct,
        }
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1). Zero for fewer than two values.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::max).unwrap_or(0.0)
}

fn min(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::min).unwrap_or(0.0)
}
