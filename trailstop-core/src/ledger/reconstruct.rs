//! Daily ledger reconstruction.
//!
//! Replays ledger events over the price axis, carries running cash and
//! quantity, and collapses the minute series to the last observation of
//! each calendar day. Days where any tracked close is zero are dropped.

use super::events::{aggregate, expand_events};
use crate::domain::{AssetDay, DailyRow, PriceTable, Trade};
use crate::error::ConfigError;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, BTreeSet};

/// Last observation of one calendar day, before returns are computed.
#[derive(Debug, Clone)]
struct DaySnapshot {
    date: NaiveDate,
    cash: f64,
    qty: Vec<f64>,
    close: Vec<f64>,
}

/// Running return, cumulative return and drawdown of one value series.
#[derive(Debug, Clone)]
struct SeriesTracker {
    prev: Option<f64>,
    growth: f64,
    peak: Option<f64>,
}

impl SeriesTracker {
    fn new() -> Self {
        Self {
            prev: None,
            growth: 1.0,
            peak: None,
        }
    }

    /// Returns `(return, cumulative return, drawdown)` for the next value.
    fn push(&mut self, value: f64) -> (f64, f64, f64) {
        let ret = self
            .prev
            .map(|prev| finite_or_zero(value / prev - 1.0))
            .unwrap_or(0.0);
        self.prev = Some(value);
        self.growth *= 1.0 + ret;

        let peak = self.peak.map_or(value, |p| p.max(value));
        self.peak = Some(peak);
        let drawdown = finite_or_zero((value - peak) / peak);

        (ret, finite_or_zero(self.growth - 1.0), drawdown)
    }
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

/// Reconstruct the daily performance table.
///
/// Every universe asset gets a column, traded or not. A close that is
/// missing at a timestamp counts as zero, which drops the day if it is the
/// day's last observation.
pub fn reconstruct_daily(
    universe: &[String],
    prices: &PriceTable,
    trades: &[Trade],
    initial_capital: f64,
) -> Result<Vec<DailyRow>, ConfigError> {
    if !initial_capital.is_finite() {
        return Err(ConfigError::invalid(
            "initial_capital",
            format!("must be finite, got {initial_capital}"),
        ));
    }
    let assets: Vec<&str> = universe
        .iter()
        .map(String::as_str)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if assets.is_empty() {
        return Err(ConfigError::EmptyUniverse);
    }
    if let Some(missing) = assets.iter().find(|a| !prices.contains_asset(a)) {
        return Err(ConfigError::UnknownAsset(missing.to_string()));
    }
    if let Some(t) = trades.iter().find(|t| !assets.contains(&t.asset.as_str())) {
        return Err(ConfigError::UnknownAsset(t.asset.clone()));
    }

    let buckets = aggregate(&expand_events(trades));
    let axis: BTreeSet<NaiveDateTime> = prices
        .timestamps()
        .iter()
        .copied()
        .chain(buckets.keys().copied())
        .collect();

    let bars: Vec<_> = assets.iter().map(|a| prices.bars(a).unwrap_or(&[])).collect();

    let mut snapshots: Vec<DaySnapshot> = Vec::new();
    let mut cash = initial_capital;
    let mut qty = vec![0.0; assets.len()];
    let mut close = vec![0.0; assets.len()];
    let mut current: Option<NaiveDate> = None;

    for ts in axis {
        let date = ts.date();
        if let Some(day) = current.filter(|d| *d != date) {
            snapshots.push(DaySnapshot {
                date: day,
                cash,
                qty: qty.clone(),
                close: close.clone(),
            });
        }
        current = Some(date);

        if let Some(bucket) = buckets.get(&ts) {
            cash += bucket.cash_delta;
            for (slot, asset) in qty.iter_mut().zip(&assets) {
                if let Some(delta) = bucket.qty_deltas.get(*asset) {
                    *slot += delta;
                }
            }
        }

        let index = prices.index_of(ts);
        for (slot, series) in close.iter_mut().zip(&bars) {
            *slot = index
                .and_then(|i| series.get(i))
                .map(|b| finite_or_zero(b.close))
                .unwrap_or(0.0);
        }
    }
    if let Some(day) = current {
        snapshots.push(DaySnapshot {
            date: day,
            cash,
            qty,
            close,
        });
    }

    let total_days = snapshots.len();
    snapshots.retain(|s| {
        let complete = s.close.iter().all(|c| *c != 0.0);
        if !complete {
            tracing::debug!(date = %s.date, "day dropped: zero close");
        }
        complete
    });

    let mut trackers = vec![SeriesTracker::new(); assets.len()];
    let mut portfolio = SeriesTracker::new();
    let mut rows = Vec::with_capacity(snapshots.len());

    for snap in snapshots {
        let mut asset_days = BTreeMap::new();
        for (i, asset) in assets.iter().enumerate() {
            let (ret, cum, dd) = trackers[i].push(snap.close[i]);
            asset_days.insert(
                asset.to_string(),
                AssetDay {
                    qty: finite_or_zero(snap.qty[i]),
                    close: snap.close[i],
                    position: finite_or_zero(snap.qty[i] * snap.close[i]),
                    return_dec: ret,
                    cum_return: cum,
                    drawdown: dd,
                },
            );
        }

        let mut row = DailyRow {
            date: snap.date,
            cash: finite_or_zero(snap.cash),
            assets: asset_days,
            equity: 0.0,
            return_dec: 0.0,
            cum_return: 0.0,
            drawdown: 0.0,
        };
        row.equity = row.cash + row.positions_value();
        let (ret, cum, dd) = portfolio.push(row.equity);
        row.return_dec = ret;
        row.cum_return = cum;
        row.drawdown = dd;
        rows.push(row);
    }

    tracing::info!(
        days = rows.len(),
        dropped = total_days - rows.len(),
        "daily ledger reconstructed"
    );
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntryOrder;
    use crate::domain::{Bar, ExitKind};
    use std::collections::HashMap;

    fn ts(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn table(series: &[(&str, Vec<(NaiveDateTime, f64)>)]) -> PriceTable {
        let map: HashMap<String, Vec<Bar>> = series
            .iter()
            .map(|(asset, points)| {
                let bars = points
                    .iter()
                    .map(|(t, c)| Bar::new(*t, *c, *c, *c, *c))
                    .collect();
                (asset.to_string(), bars)
            })
            .collect();
        PriceTable::align(map)
    }

    fn trade(asset: &str, entry: NaiveDateTime, exit: NaiveDateTime, qty: f64) -> Trade {
        Trade {
            asset: asset.into(),
            entry_time: entry,
            entry_type: EntryOrder::Market,
            entry_price: 100.0,
            exit_time: exit,
            exit_type: ExitKind::TrailingStop,
            exit_price: 120.0,
            quantity: qty,
            allocation_pct: 1.0,
            pnl: 20.0 * qty,
            return_dec: 0.2,
            entry_fee: 0.0,
            exit_fee: 0.0,
            cash: 0.0,
            cumulative_pnl: 0.0,
            equity: 0.0,
            cumulative_return: 0.0,
        }
    }

    #[test]
    fn tracker_fills_first_row_with_zero() {
        let mut t = SeriesTracker::new();
        assert_eq!(t.push(100.0), (0.0, 0.0, 0.0));
        let (r, c, d) = t.push(110.0);
        assert!((r - 0.1).abs() < 1e-12);
        assert!((c - 0.1).abs() < 1e-12);
        assert_eq!(d, 0.0);
        let (r, c, d) = t.push(99.0);
        assert!((r + 0.1).abs() < 1e-12);
        assert!((c + 0.01).abs() < 1e-12);
        assert!((d + 0.1).abs() < 1e-12);
    }

    #[test]
    fn no_trades_holds_initial_capital() {
        let prices = table(&[("BTC", vec![(ts(1, 10), 100.0), (ts(2, 10), 105.0)])]);
        let rows = reconstruct_daily(&["BTC".into()], &prices, &[], 1_000.0).unwrap();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert_eq!(row.cash, 1_000.0);
            assert_eq!(row.equity, 1_000.0);
            assert_eq!(row.drawdown, 0.0);
        }
        assert!((rows[1].assets["BTC"].return_dec - 0.05).abs() < 1e-12);
    }

    #[test]
    fn last_observation_of_day_wins() {
        let prices = table(&[(
            "BTC",
            vec![
                (ts(1, 9), 100.0),
                (ts(1, 23), 110.0),
                (ts(2, 9), 120.0),
                (ts(3, 9), 130.0),
            ],
        )]);
        let trades = [trade("BTC", ts(1, 9), ts(2, 9), 2.0)];
        let rows = reconstruct_daily(&["BTC".into()], &prices, &trades, 1_000.0).unwrap();

        assert_eq!(rows.len(), 3);
        let day1 = &rows[0];
        assert_eq!(day1.assets["BTC"].qty, 2.0);
        assert_eq!(day1.assets["BTC"].close, 110.0);
        assert_eq!(day1.cash, 800.0);
        assert_eq!(day1.equity, 1_020.0);

        let day2 = &rows[1];
        assert_eq!(day2.assets["BTC"].qty, 0.0);
        assert_eq!(day2.cash, 1_040.0);
        assert_eq!(day2.equity, 1_040.0);
    }

    #[test]
    fn zero_close_day_is_dropped() {
        // ETH has no bar at the end of day 2 so its close resolves to zero
        let prices = table(&[
            (
                "BTC",
                vec![(ts(1, 9), 100.0), (ts(2, 9), 101.0), (ts(2, 12), 102.0), (ts(3, 9), 103.0)],
            ),
            ("ETH", vec![(ts(1, 9), 10.0), (ts(2, 9), 11.0), (ts(3, 9), 12.0)]),
        ]);
        let universe = vec!["BTC".to_string(), "ETH".to_string()];
        let rows = reconstruct_daily(&universe, &prices, &[], 500.0).unwrap();

        let dates: Vec<_> = rows.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
            ]
        );
        // returns are computed against the prior kept day
        assert!((rows[1].assets["ETH"].return_dec - 0.2).abs() < 1e-12);
    }

    #[test]
    fn equity_identity_holds_exactly() {
        let prices = table(&[
            ("BTC", (1..=5).map(|d| (ts(d, 9), 100.0 + d as f64 * 3.3)).collect()),
            ("ETH", (1..=5).map(|d| (ts(d, 9), 10.0 + d as f64 * 0.7)).collect()),
        ]);
        let trades = [
            trade("BTC", ts(1, 9), ts(3, 9), 1.3),
            trade("ETH", ts(3, 9), ts(5, 9), 7.1),
        ];
        let universe = vec!["ETH".to_string(), "BTC".to_string()];
        let rows = reconstruct_daily(&universe, &prices, &trades, 1_000.0).unwrap();
        for row in &rows {
            assert_eq!(row.equity, row.cash + row.positions_value());
        }
    }

    #[test]
    fn untraded_universe_asset_still_reported() {
        let prices = table(&[
            ("BTC", vec![(ts(1, 9), 100.0)]),
            ("ETH", vec![(ts(1, 9), 10.0)]),
        ]);
        let universe = vec!["BTC".to_string(), "ETH".to_string()];
        let rows = reconstruct_daily(&universe, &prices, &[], 1.0).unwrap();
        assert_eq!(rows[0].assets.len(), 2);
        assert_eq!(rows[0].assets["ETH"].qty, 0.0);
    }

    #[test]
    fn trade_outside_universe_is_rejected() {
        let prices = table(&[("BTC", vec![(ts(1, 9), 100.0), (ts(2, 9), 100.0)])]);
        let trades = [trade("DOGE", ts(1, 9), ts(2, 9), 1.0)];
        let err = reconstruct_daily(&["BTC".into()], &prices, &trades, 1.0).unwrap_err();
        assert_eq!(err, ConfigError::UnknownAsset("DOGE".into()));
    }

    #[test]
    fn empty_universe_is_rejected() {
        let prices = PriceTable::default();
        let err = reconstruct_daily(&[], &prices, &[], 1.0).unwrap_err();
        assert_eq!(err, ConfigError::EmptyUniverse);
    }
}
