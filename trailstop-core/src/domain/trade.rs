//! Trade: a completed round trip, and the entries that never completed one.

use crate::config::EntryOrder;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitKind {
    /// The bar opened at or below the stop: filled at the open.
    Gap,
    /// The bar traded down through the stop: filled at the stop level.
    TrailingStop,
    /// Never stopped out; settled at the last available close.
    /// Only produced with strict settlement.
    EndOfData,
}

impl ExitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitKind::Gap => "exit at open (gap)",
            ExitKind::TrailingStop => "trailing stop",
            ExitKind::EndOfData => "end of data",
        }
    }
}

impl fmt::Display for ExitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed round trip. Immutable once appended to the trade log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub asset: String,

    // ── Entry ──
    pub entry_time: NaiveDateTime,
    pub entry_type: EntryOrder,
    pub entry_price: f64,

    // ── Exit ──
    pub exit_time: NaiveDateTime,
    pub exit_type: ExitKind,
    pub exit_price: f64,

    // ── Size ──
    pub quantity: f64,
    pub allocation_pct: f64,

    // ── PnL ──
    pub pnl: f64,
    /// PnL as a fraction of the capital slice committed at entry.
    #[serde(rename = "return")]
    pub return_dec: f64,
    pub entry_fee: f64,
    pub exit_fee: f64,
    /// Shared cash balance right after this exit settled.
    pub cash: f64,

    // ── Running columns over the trade log ──
    pub cumulative_pnl: f64,
    pub equity: f64,
    pub cumulative_return: f64,
}

impl Trade {
    /// Notional paid for the position, excluding the entry fee.
    pub fn entry_value(&self) -> f64 {
        self.entry_price * self.quantity
    }

    /// Notional received for the position, before the exit fee.
    pub fn exit_value(&self) -> f64 {
        self.exit_price * self.quantity
    }

    pub fn is_winner(&self) -> bool {
        self.return_dec > 0.0
    }
}

/// An entry that was debited but never resolved into a trade.
///
/// Only produced under legacy settlement: the debited cash stays debited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrandedEntry {
    pub asset: String,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub quantity: f64,
    pub allocation_pct: f64,
    /// Total cash debited at entry (value + fee).
    pub capital_used: f64,
    pub entry_fee: f64,
    /// True if the entry timestamp lay beyond the price history.
    pub beyond_history: bool,
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

    fn sample_trade() -> Trade {
        Trade {
            asset: "BTC-USD".into(),
            entry_time: at(1),
            entry_type: EntryOrder::Market,
            entry_price: 100.0,
            exit_time: at(5),
            exit_type: ExitKind::TrailingStop,
            exit_price: 95.0,
            quantity: 10.0,
            allocation_pct: 1.0,
            pnl: -50.0,
            return_dec: -0.05,
            entry_fee: 0.0,
            exit_fee: 0.0,
            cash: 9_950.0,
            cumulative_pnl: -50.0,
            equity: 9_950.0,
            cumulative_return: -0.005,
        }
    }

    #[test]
    fn values() {
        let trade = sample_trade();
        assert_eq!(trade.entry_value(), 1_000.0);
        assert_eq!(trade.exit_value(), 950.0);
        assert!(!trade.is_winner());
    }

    #[test]
    fn serializes_return_column_name() {
        let json = serde_json::to_string(&sample_trade()).unwrap();
        assert!(json.contains("\"return\":-0.05"));
        assert!(json.contains("\"exit_type\":\"trailing_stop\""));
        let back: Trade = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample_trade());
    }

    #[test]
    fn exit_kind_labels() {
        assert_eq!(ExitKind::Gap.to_string(), "exit at open (gap)");
        assert_eq!(ExitKind::TrailingStop.to_string(), "trailing stop");
    }
}
