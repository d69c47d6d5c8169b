//! Trailing-stop exit resolution with gap handling.
//!
//! Two breach conditions per bar, after folding the bar's high into the peak:
//! - gap breach: `low <= stop && open <= stop` → filled at the open
//! - regular breach: `low <= stop` → filled at the stop level
//!
//! The earliest breaching bar wins. When that bar is also a gap breach the
//! gap fill takes precedence, so a bar that opens through the stop never
//! fills at the (better) stop level.

use super::position::Position;
use crate::domain::{Bar, ExitKind};

/// A resolved exit: the bar index on the price axis, the fill price, and why.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitFill {
    pub index: usize,
    pub price: f64,
    pub kind: ExitKind,
}

/// Check a single bar against the position's current stop.
pub fn check_breach(position: &Position, bar: &Bar) -> Option<(f64, ExitKind)> {
    let stop = position.stop_price;
    let breached = bar.low <= stop;
    if !breached {
        return None;
    }
    if bar.open <= stop {
        Some((bar.open, ExitKind::Gap))
    } else {
        Some((stop, ExitKind::TrailingStop))
    }
}

/// Walk `bars[start..]` and return the first exit, if any.
///
/// The entry bar itself is included in the search. Void bars neither move
/// the peak nor trigger an exit. `None` means the stop was never breached
/// through the end of the available bars.
pub fn find_exit(bars: &[Bar], start: usize, position: &mut Position) -> Option<ExitFill> {
    for (offset, bar) in bars.iter().enumerate().skip(start) {
        if bar.is_void() {
            continue;
        }
        position.mark(bar);
        if let Some((price, kind)) = check_breach(position, bar) {
            return Some(ExitFill {
                index: offset,
                price,
                kind,
            });
        }
    }
    None
}

/// Index and close of the last non-void bar at or after `start`.
pub fn last_valid_close(bars: &[Bar], start: usize) -> Option<(usize, f64)> {
    bars.iter()
        .enumerate()
        .skip(start)
        .rev()
        .find(|(_, b)| !b.is_void())
        .map(|(i, b)| (i, b.close))
}
