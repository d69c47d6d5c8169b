//! Property tests for pipeline invariants.
//!
//! Uses proptest to verify:
//! 1. Trade invariants: positive quantity, ordered times, fee signs
//! 2. Cash conservation: final cash = capital + pnl - stranded capital
//! 3. Equity identity: cash + positions == equity on every daily row
//! 4. Idempotence: identical inputs give byte-identical outputs

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use std::collections::HashMap;
use trailstop_core::{
    generate_signals, reconstruct_daily, run_backtest, BacktestConfig, Bar, EntryOrder,
    FeeSchedule, IndicatorFeed, IndicatorParams, PriceTable, Signal, SignalConfig,
};

const ASSETS: [&str; 3] = ["BTC", "ETH", "SOL"];

fn at(minute: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::minutes(minute as i64 * 30)
}

fn walk_bars(steps: &[(f64, f64)]) -> Vec<Bar> {
    let mut close = 100.0;
    steps
        .iter()
        .enumerate()
        .map(|(i, &(ret, spread))| {
            let open = close;
            close = (close * (1.0 + ret)).max(1.0);
            Bar::new(
                at(i),
                open,
                open.max(close) * (1.0 + spread),
                open.min(close) * (1.0 - spread),
                close,
            )
        })
        .collect()
}

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_steps() -> impl Strategy<Value = Vec<(f64, f64)>> {
    prop::collection::vec((-0.04..0.04_f64, 0.0..0.02_f64), 20..120)
}

fn arb_market() -> impl Strategy<Value = Vec<Vec<(f64, f64)>>> {
    prop::collection::vec(arb_steps(), 1..=3)
}

fn arb_entry_points() -> impl Strategy<Value = Vec<(usize, usize, bool)>> {
    prop::collection::vec((0..3usize, 0..120usize, any::<bool>()), 0..30)
}

fn arb_config() -> impl Strategy<Value = BacktestConfig> {
    (0.01..0.2_f64, any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(stop, limit, fees, strict)| BacktestConfig {
            initial_capital: 10_000.0,
            trailing_stop_pct: stop,
            entry_order: if limit {
                EntryOrder::Limit
            } else {
                EntryOrder::Market
            },
            fees: if fees {
                FeeSchedule::default()
            } else {
                FeeSchedule::disabled()
            },
            strict_settlement: strict,
        },
    )
}

struct Market {
    universe: Vec<String>,
    prices: PriceTable,
    signals: Vec<Signal>,
}

fn build_market(walks: &[Vec<(f64, f64)>], entries: &[(usize, usize, bool)]) -> Market {
    let mut map = HashMap::new();
    let mut universe = Vec::new();
    for (asset, steps) in ASSETS.iter().zip(walks) {
        map.insert(asset.to_string(), walk_bars(steps));
        universe.push(asset.to_string());
    }
    let prices = PriceTable::align(map);

    let mut signals = Vec::new();
    for &(a, i, half) in entries {
        let asset = &universe[a % universe.len()];
        let Some(bars) = prices.bars(asset) else {
            continue;
        };
        if i == 0 || i >= bars.len() || bars[i].is_void() {
            continue;
        }
        let bar = bars[i];
        signals.push(Signal {
            timestamp: bar.timestamp,
            asset: asset.clone(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            close_prev: bars[i - 1].close,
            ma_passes: 1,
            allocation_pct: if half { 0.5 } else { 1.0 },
            bb_rule: None,
            bb_mid_prev: None,
            bb_upper_prev: None,
            bb_lower_prev: None,
            bb_z_prev: None,
        });
    }
    Market {
        universe,
        prices,
        signals,
    }
}

// ── 1. Trade invariants ──────────────────────────────────────────────

proptest! {
    #[test]
    fn trades_are_well_formed(
        walks in arb_market(),
        entries in arb_entry_points(),
        config in arb_config(),
    ) {
        let m = build_market(&walks, &entries);
        let outcome = run_backtest(&m.universe, &m.prices, &m.signals, &config).unwrap();

        for t in &outcome.trades {
            prop_assert!(t.quantity > 0.0);
            prop_assert!(t.entry_time <= t.exit_time);
            if config.fees.enabled {
                prop_assert!(t.entry_fee >= 0.0 && t.exit_fee >= 0.0);
            } else {
                prop_assert_eq!(t.entry_fee, 0.0);
                prop_assert_eq!(t.exit_fee, 0.0);
            }
        }
        // trade log is chronological by entry
        prop_assert!(outcome.trades.windows(2).all(|w| w[0].entry_time <= w[1].entry_time));
        if config.strict_settlement {
            prop_assert!(outcome.stranded.is_empty());
        }
    }
}

// ── 2. Cash conservation ─────────────────────────────────────────────

proptest! {
    #[test]
    fn cash_is_conserved(
        walks in arb_market(),
        entries in arb_entry_points(),
        config in arb_config(),
    ) {
        let m = build_market(&walks, &entries);
        let outcome = run_backtest(&m.universe, &m.prices, &m.signals, &config).unwrap();

        let expected = config.initial_capital + outcome.total_pnl() - outcome.stranded_capital();
        prop_assert!((outcome.final_cash - expected).abs() < 1e-6 * config.initial_capital);
        prop_assert!(outcome.final_cash >= -1e-9);
    }
}

// ── 3. Equity identity ───────────────────────────────────────────────

proptest! {
    #[test]
    fn daily_equity_identity_is_exact(
        walks in arb_market(),
        entries in arb_entry_points(),
        config in arb_config(),
    ) {
        let m = build_market(&walks, &entries);
        let outcome = run_backtest(&m.universe, &m.prices, &m.signals, &config).unwrap();
        let rows = reconstruct_daily(&m.universe, &m.prices, &outcome.trades, config.initial_capital)
            .unwrap();

        for row in &rows {
            prop_assert_eq!(row.equity, row.cash + row.positions_value());
            prop_assert!(row.drawdown <= 0.0);
            prop_assert!(row.return_dec.is_finite());
        }
        prop_assert!(rows.windows(2).all(|w| w[0].date < w[1].date));
    }
}

// ── 4. Idempotence ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn pipeline_is_idempotent(walks in arb_market(), rsi_threshold in 30.0..70.0_f64) {
        let m = build_market(&walks, &[]);
        let params = IndicatorParams {
            rsi_period: 5,
            ma_days: vec![1, 2],
            bars_per_day: 8,
            bb_window: 10,
            bb_num_std: 2.0,
        };
        let signal_config = SignalConfig {
            rsi_threshold,
            ma_days: vec![1, 2],
            ..SignalConfig::default()
        };
        let config = BacktestConfig::default();

        let run = || {
            let feed = IndicatorFeed::compute(&m.prices, &params).unwrap();
            let signals = generate_signals(&m.universe, &m.prices, &feed, &signal_config).unwrap();
            let outcome = run_backtest(&m.universe, &m.prices, &signals, &config).unwrap();
            let rows = reconstruct_daily(&m.universe, &m.prices, &outcome.trades, config.initial_capital)
                .unwrap();
            (
                serde_json::to_string(&outcome.trades).unwrap(),
                serde_json::to_string(&rows).unwrap(),
            )
        };

        prop_assert_eq!(run(), run());
    }
}
