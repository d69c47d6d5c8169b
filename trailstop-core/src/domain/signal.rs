//! Signal: a candidate entry for one asset at one timestamp.

use super::bar::Bar;
use crate::config::BollingerRule;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One row of the signal table.
///
/// At most one signal exists per (timestamp, asset). Price fields are those
/// of the signal bar; `close_prev` is the previous bar's close.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub timestamp: NaiveDateTime,
    pub asset: String,

    // ── Signal bar ──
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub close_prev: f64,

    // ── Sizing ──
    /// Number of moving-average windows the signal bar's close cleared.
    pub ma_passes: usize,
    /// Fraction of the per-asset capital slice to deploy, in (0, 1].
    pub allocation_pct: f64,

    // ── Bollinger diagnostics (None when the band filter is disabled) ──
    pub bb_rule: Option<BollingerRule>,
    pub bb_mid_prev: Option<f64>,
    pub bb_upper_prev: Option<f64>,
    pub bb_lower_prev: Option<f64>,
    /// Negative means below the mid band; around -k at the lower band.
    pub bb_z_prev: Option<f64>,
}

impl Signal {
    /// The signal bar's OHLC.
    pub fn bar(&self) -> Bar {
        Bar::new(self.timestamp, self.open, self.high, self.low, self.close)
    }
}
