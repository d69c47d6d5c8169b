//! Engine mutable state and run result types.

use crate::domain::{StrandedEntry, Trade};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// State that evolves signal group by signal group.
///
/// `cash` is the single shared pool across all assets. `next_timestamp` is
/// the global gate: a signal group at or before it is skipped entirely.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub cash: f64,
    pub next_timestamp: Option<NaiveDateTime>,
    pub cumulative_pnl: f64,
    pub trades: Vec<Trade>,
    pub stranded: Vec<StrandedEntry>,
    pub skipped_groups: usize,
    pub discarded_limit_signals: usize,
    pub untradable_signals: usize,
}

impl EngineState {
    pub fn new(initial_capital: f64, first_timestamp: Option<NaiveDateTime>) -> Self {
        Self {
            cash: initial_capital,
            next_timestamp: first_timestamp,
            cumulative_pnl: 0.0,
            trades: Vec::new(),
            stranded: Vec::new(),
            skipped_groups: 0,
            discarded_limit_signals: 0,
            untradable_signals: 0,
        }
    }

    /// True if a signal group at `ts` falls inside the gated interval.
    pub fn is_gated(&self, ts: NaiveDateTime) -> bool {
        self.next_timestamp.is_some_and(|gate| ts <= gate)
    }

    pub fn into_outcome(self) -> BacktestOutcome {
        BacktestOutcome {
            trades: self.trades,
            final_cash: self.cash,
            stranded: self.stranded,
            skipped_groups: self.skipped_groups,
            discarded_limit_signals: self.discarded_limit_signals,
            untradable_signals: self.untradable_signals,
        }
    }
}

/// Result of a backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutcome {
    /// Append-only trade log, in the order signals were processed.
    pub trades: Vec<Trade>,
    /// Cash after the last processed signal, including stranded debits.
    pub final_cash: f64,
    /// Entries debited without a resolved exit (legacy settlement only).
    pub stranded: Vec<StrandedEntry>,
    /// Signal groups skipped by the global gate.
    pub skipped_groups: usize,
    /// Limit signals whose previous close fell outside the signal bar.
    pub discarded_limit_signals: usize,
    /// Signals skipped for an undefined entry price or an empty capital slice.
    pub untradable_signals: usize,
}

impl BacktestOutcome {
    pub fn total_pnl(&self) -> f64 {
        self.trades.last().map(|t| t.cumulative_pnl).unwrap_or(0.0)
    }

    /// Cash still tied up in stranded entries.
    pub fn stranded_capital(&self) -> f64 {
        self.stranded.iter().map(|s| s.capital_used).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, minute, 0)
            .unwrap()
    }

    #[test]
    fn gate_is_inclusive() {
        let state = EngineState::new(1_000.0, Some(at(5)));
        assert!(state.is_gated(at(4)));
        assert!(state.is_gated(at(5)));
        assert!(!state.is_gated(at(6)));
    }

    #[test]
    fn no_gate_without_history() {
        let state = EngineState::new(1_000.0, None);
        assert!(!state.is_gated(at(0)));
    }

    #[test]
    fn empty_outcome_totals() {
        let outcome = EngineState::new(1_000.0, None).into_outcome();
        assert_eq!(outcome.total_pnl(), 0.0);
        assert_eq!(outcome.final_cash, 1_000.0);
        assert_eq!(outcome.stranded_capital(), 0.0);
    }
}
