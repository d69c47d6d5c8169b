//! Simple Moving Average over a bar window, with a minimum of one observation.
//!
//! The mean is taken over the defined (non-NaN) closes inside the trailing
//! window, so the average expands until the window fills and a gap bar
//! simply contributes nothing. A window with no defined closes yields NaN.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Sma {
    window: usize,
    name: String,
}

impl Sma {
    pub fn new(window: usize) -> Self {
        assert!(window >= 1, "SMA window must be >= 1");
        Self {
            window,
            name: format!("sma_{window}"),
        }
    }

    /// A moving average spanning `days` days of `bars_per_day` bars each.
    pub fn days(days: u32, bars_per_day: usize) -> Self {
        let mut sma = Self::new(days as usize * bars_per_day);
        sma.name = format!("ma_{days}d");
        sma
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];
        let mut sum = 0.0;
        let mut count = 0usize;

        for i in 0..n {
            let entering = bars[i].close;
            if !entering.is_nan() {
                sum += entering;
                count += 1;
            }
            if i >= self.window {
                let leaving = bars[i - self.window].close;
                if !leaving.is_nan() {
                    sum -= leaving;
                    count -= 1;
                }
            }
            if count > 0 {
                result[i] = sum / count as f64;
            }
        }

        result
    }
}
