//! Integration tests for signal generation over a feed.
//!
//! Tests:
//! 1. Allocation sizing from moving-average passes
//! 2. Signals over a computed feed are ordered, unique and well-sized
//! 3. The MA filter reads the signal bar's close against the prior average
//! 4. Missing columns skip an asset without affecting the rest

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};
use trailstop_core::indicators::AssetIndicators;
use trailstop_core::{
    generate_signals, Bar, BollingerRule, IndicatorFeed, IndicatorParams, PriceTable, SignalConfig,
};

fn at(minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::minutes(minute as i64)
}

fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let open = if i == 0 { c } else { closes[i - 1] };
            Bar::new(at(i as u32), open, open.max(c) + 0.5, open.min(c) - 0.5, c)
        })
        .collect()
}

fn table(series: Vec<(&str, Vec<Bar>)>) -> PriceTable {
    let map: HashMap<String, Vec<Bar>> = series
        .into_iter()
        .map(|(a, b)| (a.to_string(), b))
        .collect();
    PriceTable::align(map)
}

fn ma_only(days: Vec<u32>) -> SignalConfig {
    SignalConfig {
        use_rsi: false,
        rsi_threshold: 30.0,
        use_ma: true,
        ma_days: days,
        use_bbands: false,
        bb_rule: BollingerRule::TouchLower,
    }
}

#[test]
fn one_of_two_ma_windows_gives_half_allocation() {
    let n = 4;
    let prices = table(vec![("BTC", bars_from_closes(&[100.0; 4]))]);

    let mut ma_prev = BTreeMap::new();
    ma_prev.insert(7, vec![95.0; n]); // cleared
    ma_prev.insert(30, vec![105.0; n]); // not cleared
    let mut feed = IndicatorFeed::new();
    feed.insert(
        "BTC",
        AssetIndicators {
            close_prev: vec![100.0; n],
            rsi_prev: vec![50.0; n],
            ma_prev,
            ..Default::default()
        },
    );

    let signals = generate_signals(&["BTC".into()], &prices, &feed, &ma_only(vec![7, 30])).unwrap();

    assert_eq!(signals.len(), n);
    for s in &signals {
        assert_eq!(s.allocation_pct, 0.5);
        assert_eq!(s.ma_passes, 1);
        assert!(s.bb_rule.is_none());
    }
}

#[test]
fn computed_feed_yields_ordered_unique_signals() {
    let rising: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 0.5 + (i % 3) as f64).collect();
    let falling: Vec<f64> = (0..60).map(|i| 200.0 - i as f64 * 0.7).collect();
    let prices = table(vec![
        ("BTC", bars_from_closes(&rising)),
        ("ETH", bars_from_closes(&falling)),
    ]);
    let params = IndicatorParams {
        rsi_period: 5,
        ma_days: vec![2, 5],
        bars_per_day: 4,
        bb_window: 10,
        bb_num_std: 2.0,
    };
    let feed = IndicatorFeed::compute(&prices, &params).unwrap();

    let universe = vec!["BTC".to_string(), "ETH".to_string()];
    let signals = generate_signals(&universe, &prices, &feed, &ma_only(vec![2, 5])).unwrap();

    assert!(!signals.is_empty());
    assert!(signals.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    for s in &signals {
        assert!(s.allocation_pct == 0.5 || s.allocation_pct == 1.0);
        assert!(s.close_prev.is_finite());
    }
    // a steadily falling close never clears its own trailing averages
    assert!(signals.iter().all(|s| s.asset == "BTC"));
}

#[test]
fn ma_filter_compares_signal_bar_close() {
    let prices = table(vec![("BTC", bars_from_closes(&[10.0, 10.0, 10.0, 12.0]))]);
    let params = IndicatorParams {
        rsi_period: 14,
        ma_days: vec![1],
        bars_per_day: 2,
        bb_window: 20,
        bb_num_std: 2.0,
    };
    let feed = IndicatorFeed::compute(&prices, &params).unwrap();
    let btc = feed.get("BTC").unwrap();
    assert_eq!(btc.ma_prev[&1][3], 10.0);
    assert_eq!(btc.close_prev[3], 10.0);

    let signals = generate_signals(&["BTC".into()], &prices, &feed, &ma_only(vec![1])).unwrap();

    let times: Vec<_> = signals.iter().map(|s| s.timestamp).collect();
    assert_eq!(times, vec![at(3)]);
    assert_eq!(signals[0].close, 12.0);
    assert_eq!(signals[0].ma_passes, 1);
    assert_eq!(signals[0].allocation_pct, 1.0);
}

#[test]
fn asset_without_ma_columns_is_skipped() {
    let closes = [100.0, 101.0, 102.0, 103.0];
    let prices = table(vec![
        ("BTC", bars_from_closes(&closes)),
        ("ETH", bars_from_closes(&closes)),
    ]);

    let mut ma_prev = BTreeMap::new();
    ma_prev.insert(7, vec![90.0; 4]);
    let mut feed = IndicatorFeed::new();
    feed.insert(
        "BTC",
        AssetIndicators {
            close_prev: vec![100.0; 4],
            ma_prev,
            ..Default::default()
        },
    );
    feed.insert(
        "ETH",
        AssetIndicators {
            close_prev: vec![100.0; 4],
            ..Default::default()
        },
    );

    let universe = vec!["BTC".to_string(), "ETH".to_string()];
    let signals = generate_signals(&universe, &prices, &feed, &ma_only(vec![7])).unwrap();

    assert_eq!(signals.len(), 4);
    assert!(signals.iter().all(|s| s.asset == "BTC"));
    assert!(signals.iter().all(|s| s.allocation_pct == 1.0));
}

#[test]
fn ties_keep_universe_order() {
    let closes = [100.0; 3];
    let prices = table(vec![
        ("BTC", bars_from_closes(&closes)),
        ("ETH", bars_from_closes(&closes)),
    ]);
    let mut feed = IndicatorFeed::new();
    for asset in ["BTC", "ETH"] {
        feed.insert(
            asset,
            AssetIndicators {
                close_prev: vec![100.0; 3],
                ..Default::default()
            },
        );
    }
    let config = SignalConfig {
        use_rsi: false,
        use_ma: false,
        ..SignalConfig::default()
    };

    let universe = vec!["ETH".to_string(), "BTC".to_string()];
    let signals = generate_signals(&universe, &prices, &feed, &config).unwrap();

    let order: Vec<_> = signals.iter().map(|s| s.asset.as_str()).collect();
    assert_eq!(order, vec!["ETH", "BTC", "ETH", "BTC", "ETH", "BTC"]);
}
