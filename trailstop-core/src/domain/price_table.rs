//! Multi-asset price table on a common timeline.
//!
//! Per-asset bar lists are aligned onto the union of all timestamps
//! (outer join). Missing (timestamp, asset) cells get void bars, so a gap is
//! representable rather than an error.

use super::bar::Bar;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Aligned bar data for multiple assets.
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    /// The common time axis, strictly ascending.
    timestamps: Vec<NaiveDateTime>,
    /// Bars per asset, each the same length as `timestamps`.
    bars: BTreeMap<String, Vec<Bar>>,
}

impl PriceTable {
    /// Align per-asset bars to a common timeline.
    ///
    /// Input bars need not be sorted. If an asset carries two bars with the
    /// same timestamp, the first one in input order is kept.
    pub fn align(asset_bars: HashMap<String, Vec<Bar>>) -> Self {
        let mut all_ts = BTreeSet::new();
        for bars in asset_bars.values() {
            for bar in bars {
                all_ts.insert(bar.timestamp);
            }
        }
        let timestamps: Vec<NaiveDateTime> = all_ts.into_iter().collect();

        let mut aligned = BTreeMap::new();
        for (asset, bars) in asset_bars {
            let mut by_ts: HashMap<NaiveDateTime, Bar> = HashMap::with_capacity(bars.len());
            for bar in bars {
                by_ts.entry(bar.timestamp).or_insert(bar);
            }
            let series: Vec<Bar> = timestamps
                .iter()
                .map(|ts| by_ts.get(ts).copied().unwrap_or_else(|| Bar::void(*ts)))
                .collect();
            aligned.insert(asset, series);
        }

        Self {
            timestamps,
            bars: aligned,
        }
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Assets present in the table, in lexical order.
    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.bars.keys().map(String::as_str)
    }

    pub fn contains_asset(&self, asset: &str) -> bool {
        self.bars.contains_key(asset)
    }

    /// Aligned bars for one asset.
    pub fn bars(&self, asset: &str) -> Option<&[Bar]> {
        self.bars.get(asset).map(Vec::as_slice)
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamps.first().copied()
    }

    /// Index of the first timestamp at or after `ts`. Equals `len()` when
    /// `ts` lies beyond the end of the history.
    pub fn index_at_or_after(&self, ts: NaiveDateTime) -> usize {
        self.timestamps.partition_point(|t| *t < ts)
    }

    /// Exact index of `ts`, if it is on the time axis.
    pub fn index_of(&self, ts: NaiveDateTime) -> Option<usize> {
        self.timestamps.binary_search(&ts).ok()
    }

    /// Number of void bars per asset (data quality diagnostics).
    pub fn void_counts(&self) -> BTreeMap<String, usize> {
        self.bars
            .iter()
            .map(|(asset, bars)| (asset.clone(), bars.iter().filter(|b| b.is_void()).count()))
            .collect()
    }
}
