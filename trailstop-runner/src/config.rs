//! Serializable pipeline configuration, loaded from TOML.
//!
//! Labels (entry order, Bollinger rule, return period) are kept as strings
//! on disk and resolved into typed core configuration by `resolve()`, so an
//! unsupported label is a configuration error raised before any work runs.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use trailstop_core::{
    BacktestConfig, BollingerRule, ConfigError, EntryOrder, FeeSchedule, IndicatorParams,
    ReturnPeriod, SignalConfig,
};

use crate::runner::RunError;

/// Unique identifier for a pipeline configuration (content-addressable hash).
pub type RunId = String;

/// Complete pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub universe: UniverseSection,
    pub indicators: IndicatorSection,
    pub signals: SignalSection,
    pub backtest: BacktestSection,
    pub fees: FeeSection,
    pub summary: SummarySection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseSection {
    /// Asset identifiers; also the CSV file stems under the data directory.
    pub assets: Vec<String>,
}

impl Default for UniverseSection {
    fn default() -> Self {
        Self {
            assets: vec!["BTC-USD".into(), "ETH-USD".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSection {
    pub rsi_period: usize,
    pub bars_per_day: usize,
    pub bb_window: usize,
    pub bb_num_std: f64,
}

impl Default for IndicatorSection {
    fn default() -> Self {
        let params = IndicatorParams::default();
        Self {
            rsi_period: params.rsi_period,
            bars_per_day: params.bars_per_day,
            bb_window: params.bb_window,
            bb_num_std: params.bb_num_std,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalSection {
    pub use_rsi: bool,
    pub rsi_threshold: f64,
    pub use_ma: bool,
    /// Moving-average lookbacks in days; drives both the feed and the filter.
    pub ma_days: Vec<u32>,
    pub use_bbands: bool,
    pub bb_rule: String,
}

impl Default for SignalSection {
    fn default() -> Self {
        let signals = SignalConfig::default();
        Self {
            use_rsi: signals.use_rsi,
            rsi_threshold: signals.rsi_threshold,
            use_ma: signals.use_ma,
            ma_days: signals.ma_days,
            use_bbands: signals.use_bbands,
            bb_rule: signals.bb_rule.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub initial_capital: f64,
    pub trailing_stop_pct: f64,
    pub entry_order: String,
    pub strict_settlement: bool,
}

impl Default for BacktestSection {
    fn default() -> Self {
        let backtest = BacktestConfig::default();
        Self {
            initial_capital: backtest.initial_capital,
            trailing_stop_pct: backtest.trailing_stop_pct,
            entry_order: backtest.entry_order.as_str().to_string(),
            strict_settlement: backtest.strict_settlement,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeSection {
    pub enabled: bool,
    pub taker: f64,
    pub maker: f64,
}

impl Default for FeeSection {
    fn default() -> Self {
        let fees = FeeSchedule::default();
        Self {
            enabled: fees.enabled,
            taker: fees.taker,
            maker: fees.maker,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarySection {
    /// "Monthly", "Weekly" or "Daily" (case-insensitive).
    pub period: String,
    pub use_calendar_days: bool,
}

impl Default for SummarySection {
    fn default() -> Self {
        Self {
            period: ReturnPeriod::Daily.label().to_string(),
            use_calendar_days: true,
        }
    }
}

/// Typed configuration for every pipeline stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub universe: Vec<String>,
    pub indicators: IndicatorParams,
    pub signals: SignalConfig,
    pub backtest: BacktestConfig,
    pub period: ReturnPeriod,
    pub use_calendar_days: bool,
}

impl PipelineConfig {
    /// Parse a configuration from a TOML string. Missing keys take defaults.
    pub fn from_toml(content: &str) -> Result<Self, RunError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RunError> {
        let content = std::fs::read_to_string(path).map_err(|source| RunError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, RunError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Convert labels into typed enums and range-check every parameter.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        if self.universe.assets.is_empty() {
            return Err(ConfigError::EmptyUniverse);
        }

        let fees = if self.fees.enabled {
            FeeSchedule::new(self.fees.taker, self.fees.maker)
        } else {
            FeeSchedule::disabled()
        };
        let backtest = BacktestConfig {
            initial_capital: self.backtest.initial_capital,
            trailing_stop_pct: self.backtest.trailing_stop_pct,
            entry_order: EntryOrder::from_str(&self.backtest.entry_order)?,
            fees,
            strict_settlement: self.backtest.strict_settlement,
        };
        // rates are range-checked even when fees are disabled
        FeeSchedule::new(self.fees.taker, self.fees.maker).validate()?;
        backtest.validate()?;

        let signals = SignalConfig {
            use_rsi: self.signals.use_rsi,
            rsi_threshold: self.signals.rsi_threshold,
            use_ma: self.signals.use_ma,
            ma_days: self.signals.ma_days.clone(),
            use_bbands: self.signals.use_bbands,
            bb_rule: BollingerRule::from_str(&self.signals.bb_rule)?,
        };
        signals.validate()?;

        let indicators = IndicatorParams {
            rsi_period: self.indicators.rsi_period,
            ma_days: self.signals.ma_days.clone(),
            bars_per_day: self.indicators.bars_per_day,
            bb_window: self.indicators.bb_window,
            bb_num_std: self.indicators.bb_num_std,
        };
        indicators.validate()?;

        Ok(ResolvedConfig {
            universe: self.universe.assets.clone(),
            indicators,
            signals,
            backtest,
            period: ReturnPeriod::from_str(&self.summary.period)?,
            use_calendar_days: self.summary.use_calendar_days,
        })
    }

    /// Validate without keeping the resolved form.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.resolve().map(|_| ())
    }

    /// Deterministic BLAKE3 id of the canonical JSON form.
    ///
    /// Two runs with identical configs share the same RunId.
    pub fn run_id(&self) -> RunId {
        let canonical = serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"));
        blake3::hash(canonical.as_bytes()).to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve() {
        let resolved = PipelineConfig::default().resolve().unwrap();
        assert_eq!(resolved.backtest, BacktestConfig::default());
        assert_eq!(resolved.signals, SignalConfig::default());
        assert_eq!(resolved.indicators, IndicatorParams::default());
        assert_eq!(resolved.period, ReturnPeriod::Daily);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
            [universe]
            assets = ["SOL-USD"]

            [backtest]
            trailing_stop_pct = 0.05
            entry_order = "limit"
            "#,
        )
        .unwrap();

        assert_eq!(config.universe.assets, vec!["SOL-USD".to_string()]);
        assert_eq!(config.backtest.trailing_stop_pct, 0.05);
        assert_eq!(config.backtest.initial_capital, 10_000.0);
        assert_eq!(config.fees, FeeSection::default());

        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.backtest.entry_order, EntryOrder::Limit);
    }

    #[test]
    fn unsupported_entry_order_is_rejected() {
        let mut config = PipelineConfig::default();
        config.backtest.entry_order = "stop".into();
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::UnsupportedEntryOrder("stop".into())
        );
    }

    #[test]
    fn unsupported_period_is_rejected() {
        let mut config = PipelineConfig::default();
        config.summary.period = "Hourly".into();
        assert!(matches!(
            config.validate().unwrap_err(),
            ConfigError::UnsupportedPeriod(_)
        ));
    }

    #[test]
    fn negative_fee_rejected_even_when_disabled() {
        let mut config = PipelineConfig::default();
        config.fees.enabled = false;
        config.fees.taker = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_round_trip() {
        let config = PipelineConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(PipelineConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn run_id_deterministic_and_sensitive() {
        let a = PipelineConfig::default();
        let mut b = a.clone();
        assert_eq!(a.run_id(), b.run_id());
        assert_eq!(a.run_id().len(), 64);

        b.backtest.trailing_stop_pct = 0.03;
        assert_ne!(a.run_id(), b.run_id());
    }
}
