//! Period summary statistics over a dated return series.
//!
//! Annualizes with the period's frequency, builds a 1000-based wealth index
//! and locates the worst drawdown with its peak, trough and recovery dates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use trailstop_core::ReturnPeriod;

use crate::metrics::{mean, std_dev};

const WEALTH_BASE: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub period: ReturnPeriod,
    pub periods_per_year: f64,
    pub annualized_mean: f64,
    pub annualized_volatility: f64,
    /// Annualized mean over annualized volatility; 0 when volatility is 0.
    pub sharpe: f64,
    pub cagr: f64,
    pub max_return: f64,
    pub max_return_date: NaiveDate,
    pub min_return: f64,
    pub min_return_date: NaiveDate,
    pub max_drawdown: f64,
    pub peak_date: NaiveDate,
    pub trough_date: NaiveDate,
    /// First date at or after the trough whose wealth regains the peak.
    pub recovery_date: Option<NaiveDate>,
    pub days_to_recover: Option<i64>,
    /// CAGR over the magnitude of the max drawdown; 0 without a drawdown.
    pub mar_ratio: f64,
}

impl SummaryStats {
    /// `None` for an empty series.
    pub fn compute(
        returns: &[(NaiveDate, f64)],
        period: ReturnPeriod,
        use_calendar_days: bool,
    ) -> Option<Self> {
        let (first_date, _) = *returns.first()?;
        let periods = period.periods_per_year(use_calendar_days);
        let values: Vec<f64> = returns.iter().map(|(_, r)| *r).collect();

        let annualized_mean = mean(&values) * periods;
        let annualized_volatility = std_dev(&values) * periods.sqrt();
        let sharpe = if annualized_volatility > 1e-15 {
            annualized_mean / annualized_volatility
        } else {
            0.0
        };

        let growth: f64 = values.iter().map(|r| 1.0 + r).product();
        let years = values.len() as f64 / periods;
        let cagr = growth.powf(1.0 / years) - 1.0;

        // first occurrence wins on ties
        let mut max_idx = 0;
        let mut min_idx = 0;
        for (i, v) in values.iter().enumerate() {
            if *v > values[max_idx] {
                max_idx = i;
            }
            if *v < values[min_idx] {
                min_idx = i;
            }
        }

        let wealth: Vec<f64> = values
            .iter()
            .scan(WEALTH_BASE, |w, r| {
                *w *= 1.0 + r;
                Some(*w)
            })
            .collect();

        let mut peak = f64::NEG_INFINITY;
        let mut peak_idx = 0;
        let mut dd_peak_idx = 0;
        let mut max_drawdown = 0.0;
        let mut trough_idx = 0;
        for (i, w) in wealth.iter().enumerate() {
            if *w > peak {
                peak = *w;
                peak_idx = i;
            }
            let dd = (w - peak) / peak;
            if dd < max_drawdown {
                max_drawdown = dd;
                trough_idx = i;
                dd_peak_idx = peak_idx;
            }
        }
        let prior_peak = wealth[dd_peak_idx];

        let recovery_date = wealth
            .iter()
            .zip(returns)
            .skip(trough_idx)
            .find(|(w, _)| **w >= prior_peak)
            .map(|(_, (d, _))| *d);
        let trough_date = returns[trough_idx].0;

        let mar_ratio = if max_drawdown < 0.0 {
            cagr / -max_drawdown
        } else {
            0.0
        };

        Some(Self {
            period,
            periods_per_year: periods,
            annualized_mean,
            annualized_volatility,
            sharpe,
            cagr,
            max_return: values[max_idx],
            max_return_date: returns[max_idx].0,
            min_return: values[min_idx],
            min_return_date: returns[min_idx].0,
            max_drawdown,
            peak_date: if max_drawdown < 0.0 {
                returns[dd_peak_idx].0
            } else {
                first_date
            },
            trough_date,
            recovery_date,
            days_to_recover: recovery_date.map(|d| (d - trough_date).num_days()),
            mar_ratio,
        })
    }
}
