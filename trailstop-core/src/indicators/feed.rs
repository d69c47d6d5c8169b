//! The indicator feed: previous-bar decision columns keyed by asset.
//!
//! Every series in an `AssetIndicators` is aligned with the price table's
//! time axis and already shifted, so index t only reflects bars up to t-1.
//! A feed may also be assembled externally; a missing MA window is simply
//! an absent key in `ma_prev`.

use super::bollinger::BandSeries;
use super::{closes, shift, Indicator, Rsi, Sma};
use crate::config::IndicatorParams;
use crate::domain::PriceTable;
use crate::error::ConfigError;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Decision columns for one asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetIndicators {
    pub close_prev: Vec<f64>,
    pub rsi_prev: Vec<f64>,
    /// Moving average per lookback in days, shifted by one bar.
    pub ma_prev: BTreeMap<u32, Vec<f64>>,
    pub bb_mid_prev: Vec<f64>,
    pub bb_upper_prev: Vec<f64>,
    pub bb_lower_prev: Vec<f64>,
    pub bb_z_prev: Vec<f64>,
}

impl AssetIndicators {
    /// Value of a series at `i`, NaN when the series is short or empty.
    pub fn at(series: &[f64], i: usize) -> f64 {
        series.get(i).copied().unwrap_or(f64::NAN)
    }
}

/// Indicator columns for every asset of a price table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorFeed {
    assets: BTreeMap<String, AssetIndicators>,
}

impl IndicatorFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the feed for every asset in the table.
    ///
    /// Assets are independent, so they are computed in parallel; the result
    /// is keyed by asset and does not depend on scheduling order.
    pub fn compute(prices: &PriceTable, params: &IndicatorParams) -> Result<Self, ConfigError> {
        params.validate()?;

        let assets: Vec<&str> = prices.assets().collect();
        let computed: Vec<(String, AssetIndicators)> = assets
            .par_iter()
            .filter_map(|asset| {
                prices
                    .bars(asset)
                    .map(|bars| (asset.to_string(), compute_asset(bars, params)))
            })
            .collect();

        tracing::debug!(assets = computed.len(), "indicator feed computed");
        Ok(Self {
            assets: computed.into_iter().collect(),
        })
    }

    pub fn insert(&mut self, asset: impl Into<String>, indicators: AssetIndicators) {
        self.assets.insert(asset.into(), indicators);
    }

    pub fn get(&self, asset: &str) -> Option<&AssetIndicators> {
        self.assets.get(asset)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

fn compute_asset(bars: &[crate::domain::Bar], params: &IndicatorParams) -> AssetIndicators {
    let close_prev = shift(&closes(bars), 1);
    let rsi = Rsi::new(params.rsi_period);
    let rsi_prev = shift(&rsi.compute(bars), 1);
    tracing::trace!(indicator = rsi.name(), "indicator computed");

    let ma_prev = params
        .ma_days
        .iter()
        .map(|&days| {
            let sma = Sma::days(days, params.bars_per_day);
            let ma = sma.compute(bars);
            tracing::trace!(indicator = sma.name(), window = sma.window(), "indicator computed");
            (days, shift(&ma, 1))
        })
        .collect();

    let bands = BandSeries::compute(&close_prev, params.bb_window, params.bb_num_std);

    AssetIndicators {
        close_prev,
        rsi_prev,
        ma_prev,
        bb_mid_prev: bands.mid,
        bb_upper_prev: bands.upper,
        bb_lower_prev: bands.lower,
        bb_z_prev: bands.z,
    }
}
