//! Open position with a trailing stop.
//!
//! The peak only ratchets up: it is the running maximum of the entry price
//! and every bar high seen since entry. The stop always sits a fixed
//! fraction below the peak, so it can only tighten.

use crate::domain::Bar;

/// Engine-internal position. Exists between a consumed entry signal and
/// its resolved exit.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub peak_price: f64,
    pub stop_price: f64,
    trailing_stop_pct: f64,
}

impl Position {
    pub fn open(entry_price: f64, trailing_stop_pct: f64) -> Self {
        Self {
            peak_price: entry_price,
            stop_price: entry_price * (1.0 - trailing_stop_pct),
            trailing_stop_pct,
        }
    }

    /// Fold a bar's high into the peak and recompute the stop.
    ///
    /// Void bars leave the position untouched.
    pub fn mark(&mut self, bar: &Bar) {
        if bar.high.is_nan() {
            return;
        }
        if bar.high > self.peak_price {
            self.peak_price = bar.high;
        }
        self.stop_price = self.peak_price * (1.0 - self.trailing_stop_pct);
    }
}
