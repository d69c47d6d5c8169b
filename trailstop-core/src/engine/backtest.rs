//! Trailing-stop backtest over a signal table.
//!
//! Signals are grouped by timestamp and visited in ascending time order on
//! a single global clock. A group at or before `next_timestamp` is skipped
//! entirely, so at most one trade lifecycle is pending across the whole
//! signal stream at any time; the gate moves to each resolved exit.
//!
//! Within a group every signal is processed in order against the shared
//! cash pool. Each entry debits its full capital slice (value + fee); each
//! resolved exit credits value minus fee.

use super::exit::{find_exit, last_valid_close, ExitFill};
use super::position::Position;
use super::state::{BacktestOutcome, EngineState};
use crate::config::{BacktestConfig, EntryOrder};
use crate::domain::{ExitKind, PriceTable, Signal, StrandedEntry, Trade};
use crate::error::ConfigError;
use chrono::NaiveDateTime;

/// Entry leg of a pending trade, before its exit is known.
#[derive(Debug, Clone, Copy)]
struct EntryLeg {
    capital: f64,
    price: f64,
    value: f64,
    fee: f64,
    quantity: f64,
}

impl EntryLeg {
    /// Split a capital slice into position value and entry fee:
    /// `value = capital / (1 + rate)`, `fee = capital - value`.
    fn size(capital: f64, price: f64, fee_rate: f64) -> Self {
        let value = capital / (1.0 + fee_rate);
        let fee = capital - value;
        Self {
            capital,
            price,
            value,
            fee,
            quantity: value / price,
        }
    }
}

/// Run the backtest.
///
/// `universe` sets the capital split: each entry commits
/// `cash / universe.len() * allocation_pct`. Every universe asset and
/// every signal asset must exist in `prices`.
pub fn run_backtest(
    universe: &[String],
    prices: &PriceTable,
    signals: &[Signal],
    config: &BacktestConfig,
) -> Result<BacktestOutcome, ConfigError> {
    config.validate()?;
    if universe.is_empty() {
        return Err(ConfigError::EmptyUniverse);
    }
    if let Some(missing) = universe
        .iter()
        .map(String::as_str)
        .chain(signals.iter().map(|s| s.asset.as_str()))
        .find(|a| !prices.contains_asset(a))
    {
        return Err(ConfigError::UnknownAsset(missing.to_string()));
    }

    let mut ordered: Vec<&Signal> = signals.iter().collect();
    ordered.sort_by_key(|s| s.timestamp);

    let mut state = EngineState::new(config.initial_capital, prices.first_timestamp());
    let n_assets = universe.len() as f64;

    let mut rest = ordered.as_slice();
    while let Some(first) = rest.first() {
        let ts = first.timestamp;
        let len = rest.iter().take_while(|s| s.timestamp == ts).count();
        let (group, tail) = rest.split_at(len);
        rest = tail;

        if state.is_gated(ts) {
            state.skipped_groups += 1;
            tracing::debug!(timestamp = %ts, signals = group.len(), "signal group inside gate; skipped");
            continue;
        }

        for signal in group {
            process_signal(&mut state, prices, signal, config, n_assets);
        }
    }

    let outcome = state.into_outcome();
    tracing::info!(
        trades = outcome.trades.len(),
        stranded = outcome.stranded.len(),
        skipped_groups = outcome.skipped_groups,
        final_cash = outcome.final_cash,
        "backtest complete"
    );
    Ok(outcome)
}

fn process_signal(
    state: &mut EngineState,
    prices: &PriceTable,
    signal: &Signal,
    config: &BacktestConfig,
    n_assets: f64,
) {
    let entry_price = match config.entry_order {
        EntryOrder::Market => signal.open,
        EntryOrder::Limit => {
            if !signal.bar().contains(signal.close_prev) {
                state.discarded_limit_signals += 1;
                tracing::debug!(asset = %signal.asset, timestamp = %signal.timestamp, "limit not reachable; signal discarded");
                return;
            }
            signal.close_prev
        }
    };
    if !(entry_price.is_finite() && entry_price > 0.0) {
        state.untradable_signals += 1;
        tracing::debug!(asset = %signal.asset, timestamp = %signal.timestamp, "no tradable entry price");
        return;
    }

    let capital = state.cash / n_assets * signal.allocation_pct;
    if !(capital.is_finite() && capital > 0.0) {
        state.untradable_signals += 1;
        tracing::debug!(asset = %signal.asset, timestamp = %signal.timestamp, "no cash left to commit");
        return;
    }
    let entry = EntryLeg::size(capital, entry_price, config.fees.entry_rate(config.entry_order));

    let Some(bars) = prices.bars(&signal.asset) else {
        return;
    };
    let start = prices.index_at_or_after(signal.timestamp);
    if start >= bars.len() {
        if config.strict_settlement {
            tracing::debug!(asset = %signal.asset, "entry beyond price history; not debited");
            return;
        }
        debit(state, &entry);
        strand(state, signal, &entry, true);
        return;
    }

    debit(state, &entry);
    let mut position = Position::open(entry.price, config.trailing_stop_pct);

    let fill = match find_exit(bars, start, &mut position) {
        Some(fill) => fill,
        None if config.strict_settlement => match last_valid_close(bars, start) {
            Some((index, price)) => ExitFill {
                index,
                price,
                kind: ExitKind::EndOfData,
            },
            None => {
                state.cash += entry.value;
                state.cash += entry.fee;
                return;
            }
        },
        None => {
            strand(state, signal, &entry, false);
            return;
        }
    };

    let exit_time = prices.timestamps()[fill.index];
    settle(state, signal, &entry, fill, exit_time, config);
}

fn debit(state: &mut EngineState, entry: &EntryLeg) {
    state.cash -= entry.value;
    state.cash -= entry.fee;
}

fn strand(state: &mut EngineState, signal: &Signal, entry: &EntryLeg, beyond_history: bool) {
    tracing::warn!(
        asset = %signal.asset,
        timestamp = %signal.timestamp,
        capital = entry.capital,
        "entry has no exit; cash stays debited"
    );
    state.stranded.push(StrandedEntry {
        asset: signal.asset.clone(),
        entry_time: signal.timestamp,
        entry_price: entry.price,
        quantity: entry.quantity,
        allocation_pct: signal.allocation_pct,
        capital_used: entry.capital,
        entry_fee: entry.fee,
        beyond_history,
    });
}

fn settle(
    state: &mut EngineState,
    signal: &Signal,
    entry: &EntryLeg,
    fill: ExitFill,
    exit_time: NaiveDateTime,
    config: &BacktestConfig,
) {
    let exit_value = entry.quantity * fill.price;
    let exit_fee = exit_value * config.fees.exit_rate();

    state.cash += exit_value;
    state.cash -= exit_fee;

    let pnl = (exit_value - exit_fee) - (entry.value + entry.fee);
    let return_dec = if entry.capital > 0.0 {
        pnl / entry.capital
    } else {
        0.0
    };

    state.cumulative_pnl += pnl;
    let equity = state.cumulative_pnl + config.initial_capital;

    state.trades.push(Trade {
        asset: signal.asset.clone(),
        entry_time: signal.timestamp,
        entry_type: config.entry_order,
        entry_price: entry.price,
        exit_time,
        exit_type: fill.kind,
        exit_price: fill.price,
        quantity: entry.quantity,
        allocation_pct: signal.allocation_pct,
        pnl,
        return_dec,
        entry_fee: entry.fee,
        exit_fee,
        cash: state.cash,
        cumulative_pnl: state.cumulative_pnl,
        equity,
        cumulative_return: equity / config.initial_capital - 1.0,
    });

    state.next_timestamp = Some(exit_time);
}
