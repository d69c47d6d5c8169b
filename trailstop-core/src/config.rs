//! Typed parameter records for the three pipeline stages.
//!
//! String labels (entry order policy, Bollinger rule, return period) parse
//! through `FromStr` and fail with a `ConfigError` at call time.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How an entry signal is filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOrder {
    /// Fill at the signal bar's open. Pays the taker fee.
    Market,
    /// Fill at the previous close when it lies inside the signal bar's range.
    /// Pays the maker fee. Signals failing the range check are discarded.
    Limit,
}

impl EntryOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryOrder::Market => "market",
            EntryOrder::Limit => "limit",
        }
    }
}

impl fmt::Display for EntryOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryOrder {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "market" => Ok(EntryOrder::Market),
            "limit" => Ok(EntryOrder::Limit),
            _ => Err(ConfigError::UnsupportedEntryOrder(s.to_string())),
        }
    }
}

/// Bollinger-band entry rule, evaluated on previous-bar values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BollingerRule {
    /// `close_prev <= lower_prev`
    #[default]
    TouchLower,
    /// `close_prev < lower_prev`
    BelowLower,
    /// `close_prev` was below the lower band one bar earlier and is at/above it now.
    CrossUpFromBelow,
}

impl BollingerRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            BollingerRule::TouchLower => "touch_lower",
            BollingerRule::BelowLower => "below_lower",
            BollingerRule::CrossUpFromBelow => "cross_up_from_below",
        }
    }
}

impl fmt::Display for BollingerRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BollingerRule {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "touch_lower" => Ok(BollingerRule::TouchLower),
            "below_lower" => Ok(BollingerRule::BelowLower),
            "cross_up_from_below" => Ok(BollingerRule::CrossUpFromBelow),
            _ => Err(ConfigError::UnsupportedBollingerRule(s.to_string())),
        }
    }
}

/// Sampling period of a return series, used for annualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnPeriod {
    Monthly,
    Weekly,
    Daily,
}

impl ReturnPeriod {
    /// Number of periods per year.
    pub fn periods_per_year(&self, use_calendar_days: bool) -> f64 {
        match self {
            ReturnPeriod::Monthly => 12.0,
            ReturnPeriod::Weekly => 52.0,
            ReturnPeriod::Daily if use_calendar_days => 365.0,
            ReturnPeriod::Daily => 252.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReturnPeriod::Monthly => "Monthly",
            ReturnPeriod::Weekly => "Weekly",
            ReturnPeriod::Daily => "Daily",
        }
    }
}

impl FromStr for ReturnPeriod {
    type Err = ConfigError;

    /// Case-insensitive after trimming: "monthly", " WEEKLY ", "Daily".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monthly" => Ok(ReturnPeriod::Monthly),
            "weekly" => Ok(ReturnPeriod::Weekly),
            "daily" => Ok(ReturnPeriod::Daily),
            _ => Err(ConfigError::UnsupportedPeriod(s.to_string())),
        }
    }
}

/// Fee rates for the entry and exit legs.
///
/// Market entries and all exits pay the taker rate; limit entries pay the
/// maker rate. When `enabled` is false every fee is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub enabled: bool,
    pub taker: f64,
    pub maker: f64,
}

impl FeeSchedule {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            taker: 0.0,
            maker: 0.0,
        }
    }

    pub fn new(taker: f64, maker: f64) -> Self {
        Self {
            enabled: true,
            taker,
            maker,
        }
    }

    /// Fee rate charged on the entry leg.
    pub fn entry_rate(&self, order: EntryOrder) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        match order {
            EntryOrder::Market => self.taker,
            EntryOrder::Limit => self.maker,
        }
    }

    /// Fee rate charged on the exit leg (always taker).
    pub fn exit_rate(&self) -> f64 {
        if self.enabled {
            self.taker
        } else {
            0.0
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, rate) in [("taker_fee", self.taker), ("maker_fee", self.maker)] {
            if !rate.is_finite() || rate < 0.0 {
                return Err(ConfigError::invalid(name, format!("must be >= 0, got {rate}")));
            }
        }
        Ok(())
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::new(0.006, 0.004)
    }
}

/// Which entry filters are active and how they are parameterized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    pub use_rsi: bool,
    pub rsi_threshold: f64,
    pub use_ma: bool,
    /// Moving-average lookbacks, in days.
    pub ma_days: Vec<u32>,
    pub use_bbands: bool,
    pub bb_rule: BollingerRule,
}

impl SignalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.use_rsi && !(0.0..=100.0).contains(&self.rsi_threshold) {
            return Err(ConfigError::invalid(
                "rsi_threshold",
                format!("must be within [0, 100], got {}", self.rsi_threshold),
            ));
        }
        if self.ma_days.iter().any(|&d| d == 0) {
            return Err(ConfigError::invalid("ma_days", "windows must be > 0"));
        }
        Ok(())
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            use_rsi: true,
            rsi_threshold: 30.0,
            use_ma: true,
            ma_days: vec![7, 30],
            use_bbands: false,
            bb_rule: BollingerRule::TouchLower,
        }
    }
}

/// Backtest engine parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    /// Fraction below the running peak at which the stop sits, e.g. 0.02.
    pub trailing_stop_pct: f64,
    pub entry_order: EntryOrder,
    pub fees: FeeSchedule,
    /// When false (the default) an entry with no resolvable exit keeps its
    /// cash debited forever. When true such positions are settled at the
    /// last available close and entries beyond the history are not debited.
    pub strict_settlement: bool,
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(ConfigError::invalid(
                "initial_capital",
                format!("must be > 0, got {}", self.initial_capital),
            ));
        }
        if !(self.trailing_stop_pct > 0.0 && self.trailing_stop_pct < 1.0) {
            return Err(ConfigError::invalid(
                "trailing_stop_pct",
                format!("must be in (0, 1), got {}", self.trailing_stop_pct),
            ));
        }
        self.fees.validate()
    }
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: 10_000.0,
            trailing_stop_pct: 0.02,
            entry_order: EntryOrder::Market,
            fees: FeeSchedule::default(),
            strict_settlement: false,
        }
    }
}

/// Indicator feed parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub rsi_period: usize,
    /// Moving-average lookbacks, in days.
    pub ma_days: Vec<u32>,
    /// Number of bars making up one day (1440 for minute bars).
    pub bars_per_day: usize,
    pub bb_window: usize,
    pub bb_num_std: f64,
}

impl IndicatorParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rsi_period == 0 {
            return Err(ConfigError::invalid("rsi_period", "must be >= 1"));
        }
        if self.bars_per_day == 0 {
            return Err(ConfigError::invalid("bars_per_day", "must be >= 1"));
        }
        if self.bb_window < 2 {
            return Err(ConfigError::invalid("bb_window", "must be >= 2"));
        }
        if !self.bb_num_std.is_finite() || self.bb_num_std < 0.0 {
            return Err(ConfigError::invalid("bb_num_std", "must be >= 0"));
        }
        if self.ma_days.iter().any(|&d| d == 0) {
            return Err(ConfigError::invalid("ma_days", "windows must be > 0"));
        }
        Ok(())
    }
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            ma_days: vec![7, 30],
            bars_per_day: 1440,
            bb_window: 20,
            bb_num_std: 2.0,
        }
    }
}
