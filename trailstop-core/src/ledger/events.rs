//! Ledger events: the signed cash and quantity deltas behind every trade.

use crate::domain::Trade;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// One side of a trade as a signed delta.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEvent {
    pub timestamp: NaiveDateTime,
    pub asset: String,
    pub cash_delta: f64,
    pub qty_delta: f64,
}

/// Expand each trade into an entry event and an exit event.
///
/// Entry: cash `-(entry_price * qty) - entry_fee`, quantity `+qty`.
/// Exit: cash `exit_price * qty - exit_fee`, quantity `-qty`.
/// The result is stably sorted by timestamp.
pub fn expand_events(trades: &[Trade]) -> Vec<LedgerEvent> {
    let mut events = Vec::with_capacity(trades.len() * 2);
    for trade in trades {
        events.push(LedgerEvent {
            timestamp: trade.entry_time,
            asset: trade.asset.clone(),
            cash_delta: -(trade.entry_price * trade.quantity) - trade.entry_fee,
            qty_delta: trade.quantity,
        });
        events.push(LedgerEvent {
            timestamp: trade.exit_time,
            asset: trade.asset.clone(),
            cash_delta: trade.exit_price * trade.quantity - trade.exit_fee,
            qty_delta: -trade.quantity,
        });
    }
    events.sort_by_key(|e| e.timestamp);
    events
}

/// Events netted per timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventBucket {
    pub cash_delta: f64,
    pub qty_deltas: BTreeMap<String, f64>,
}

/// Group events by timestamp, summing cash and per-asset quantity.
pub fn aggregate(events: &[LedgerEvent]) -> BTreeMap<NaiveDateTime, EventBucket> {
    let mut buckets: BTreeMap<NaiveDateTime, EventBucket> = BTreeMap::new();
    for event in events {
        let bucket = buckets.entry(event.timestamp).or_default();
        bucket.cash_delta += event.cash_delta;
        *bucket.qty_deltas.entry(event.asset.clone()).or_insert(0.0) += event.qty_delta;
    }
    buckets
}
