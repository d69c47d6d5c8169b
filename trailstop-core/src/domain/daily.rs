//! Daily performance rows produced by ledger reconstruction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-asset state at the end of one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetDay {
    /// Quantity held.
    pub qty: f64,
    pub close: f64,
    /// `qty * close`.
    pub position: f64,
    /// Close-to-close return from the prior kept day.
    #[serde(rename = "return")]
    pub return_dec: f64,
    pub cum_return: f64,
    pub drawdown: f64,
}

/// Portfolio state at the end of one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub cash: f64,
    /// Keyed by asset, in the order of the universe's identifiers.
    pub assets: BTreeMap<String, AssetDay>,
    /// `cash + sum(position)`.
    pub equity: f64,
    #[serde(rename = "Return")]
    pub return_dec: f64,
    #[serde(rename = "Cum_Return")]
    pub cum_return: f64,
    #[serde(rename = "Drawdown")]
    pub drawdown: f64,
}

impl DailyRow {
    /// Sum of all position values.
    pub fn positions_value(&self) -> f64 {
        self.assets.values().map(|a| a.position).sum()
    }
}
