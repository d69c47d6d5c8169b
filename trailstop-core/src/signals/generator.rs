//! Entry signal generation from previous-bar indicator columns.
//!
//! The combined entry predicate is RSI AND moving-average AND Bollinger,
//! each filter evaluating to true when disabled. Undefined (NaN) inputs
//! fail every comparison.

use crate::config::{BollingerRule, SignalConfig};
use crate::domain::{PriceTable, Signal};
use crate::error::ConfigError;
use crate::indicators::{AssetIndicators, IndicatorFeed};
use std::collections::HashSet;

/// Outcome of the moving-average filter at one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
struct MaGate {
    passes: usize,
    allocation_pct: f64,
}

/// Build the signal table for `universe`.
///
/// Assets are visited in universe order. The output is stably sorted by
/// timestamp (ties keep universe order) and de-duplicated on
/// (timestamp, asset), keeping the first row.
pub fn generate_signals(
    universe: &[String],
    prices: &PriceTable,
    feed: &IndicatorFeed,
    config: &SignalConfig,
) -> Result<Vec<Signal>, ConfigError> {
    if universe.is_empty() {
        return Err(ConfigError::EmptyUniverse);
    }
    config.validate()?;

    let mut signals = Vec::new();
    for asset in universe {
        let (Some(bars), Some(ind)) = (prices.bars(asset), feed.get(asset)) else {
            tracing::debug!(asset = %asset, "no bars or indicators; asset skipped");
            continue;
        };

        let ma_windows: Vec<&Vec<f64>> = config
            .ma_days
            .iter()
            .filter_map(|d| ind.ma_prev.get(d))
            .collect();
        if config.use_ma && !config.ma_days.is_empty() && ma_windows.is_empty() {
            tracing::debug!(asset = %asset, "no moving-average columns; asset skipped");
            continue;
        }

        let before = signals.len();
        for (i, bar) in bars.iter().enumerate() {
            if !rsi_passes(config, ind, i) || !bollinger_passes(config, ind, i) {
                continue;
            }
            let Some(gate) = ma_gate(config, bar.close, &ma_windows, i) else {
                continue;
            };
            signals.push(build_signal(asset, bar, ind, i, gate, config));
        }

        if signals.len() == before {
            tracing::debug!(asset = %asset, "no passing rows");
        }
    }

    signals.sort_by_key(|s| s.timestamp);

    let mut seen = HashSet::with_capacity(signals.len());
    signals.retain(|s| seen.insert((s.timestamp, s.asset.clone())));

    tracing::info!(signals = signals.len(), "signals generated");
    Ok(signals)
}

fn rsi_passes(config: &SignalConfig, ind: &AssetIndicators, i: usize) -> bool {
    if !config.use_rsi {
        return true;
    }
    AssetIndicators::at(&ind.rsi_prev, i) < config.rsi_threshold
}

/// Moving-average gate: each window whose prior average lies below the
/// signal bar's close counts as one pass. At least one pass is required.
///
/// Returns `None` when the filter blocks the bar.
fn ma_gate(
    config: &SignalConfig,
    close: f64,
    windows: &[&Vec<f64>],
    i: usize,
) -> Option<MaGate> {
    if !config.use_ma || config.ma_days.is_empty() {
        return Some(MaGate {
            passes: 0,
            allocation_pct: 1.0,
        });
    }

    let passes = windows
        .iter()
        .filter(|ma| close > AssetIndicators::at(ma, i))
        .count();
    if passes == 0 {
        return None;
    }
    Some(MaGate {
        passes,
        allocation_pct: passes as f64 / config.ma_days.len() as f64,
    })
}

fn bollinger_passes(config: &SignalConfig, ind: &AssetIndicators, i: usize) -> bool {
    if !config.use_bbands {
        return true;
    }
    let close_prev = AssetIndicators::at(&ind.close_prev, i);
    let lower_prev = AssetIndicators::at(&ind.bb_lower_prev, i);

    match config.bb_rule {
        BollingerRule::TouchLower => close_prev <= lower_prev,
        BollingerRule::BelowLower => close_prev < lower_prev,
        BollingerRule::CrossUpFromBelow => {
            if i == 0 {
                return false;
            }
            let was_below = AssetIndicators::at(&ind.close_prev, i - 1)
                < AssetIndicators::at(&ind.bb_lower_prev, i - 1);
            was_below && close_prev >= lower_prev
        }
    }
}

fn build_signal(
    asset: &str,
    bar: &crate::domain::Bar,
    ind: &AssetIndicators,
    i: usize,
    gate: MaGate,
    config: &SignalConfig,
) -> Signal {
    let band = |series: &[f64]| config.use_bbands.then(|| AssetIndicators::at(series, i));
    Signal {
        timestamp: bar.timestamp,
        asset: asset.to_string(),
        open: bar.open,
        high: bar.high,
        low: bar.low,
        close: bar.close,
        close_prev: AssetIndicators::at(&ind.close_prev, i),
        ma_passes: gate.passes,
        allocation_pct: gate.allocation_pct,
        bb_rule: config.use_bbands.then_some(config.bb_rule),
        bb_mid_prev: band(&ind.bb_mid_prev),
        bb_upper_prev: band(&ind.bb_upper_prev),
        bb_lower_prev: band(&ind.bb_lower_prev),
        bb_z_prev: band(&ind.bb_z_prev),
    }
}
