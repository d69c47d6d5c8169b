//! Bar loading for the runner.
//!
//! Reads one CSV file of minute bars per asset and aligns them into a
//! `PriceTable`. Synthetic bars are a developer-only mode for demos and
//! benchmarks; results on synthetic data are tagged as such.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use trailstop_core::{Bar, PriceTable};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("'{path}' row {row}: unparseable timestamp '{value}'")]
    Timestamp {
        path: PathBuf,
        row: usize,
        value: String,
    },

    #[error("'{path}' contains no bars")]
    Empty { path: PathBuf },

    #[error("'{path}' row {row}: timestamp {timestamp} is not after the previous row")]
    NonMonotonic {
        path: PathBuf,
        row: usize,
        timestamp: NaiveDateTime,
    },
}

/// Bars for a universe, aligned, with provenance.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub prices: PriceTable,
    /// BLAKE3 over every bar, in asset order.
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

/// Parse `%Y-%m-%d %H:%M:%S`, RFC 3339, or a bare `%Y-%m-%d` date (midnight).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Load one asset's bars from a `timestamp,open,high,low,close` CSV file.
///
/// Timestamps must be strictly increasing. Extra columns are ignored.
pub fn load_csv_bars(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let mut bars: Vec<Bar> = Vec::new();
    for (i, record) in reader.deserialize::<CsvRow>().enumerate() {
        let row_no = i + 1;
        let row = record.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| LoadError::Timestamp {
            path: path.to_path_buf(),
            row: row_no,
            value: row.timestamp.clone(),
        })?;
        if bars.last().is_some_and(|prev| prev.timestamp >= timestamp) {
            return Err(LoadError::NonMonotonic {
                path: path.to_path_buf(),
                row: row_no,
                timestamp,
            });
        }
        let bar = Bar::new(timestamp, row.open, row.high, row.low, row.close);
        if !bar.is_sane() {
            tracing::warn!(path = %path.display(), row = row_no, "bar fails OHLC sanity check");
        }
        bars.push(bar);
    }

    if bars.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    tracing::debug!(path = %path.display(), bars = bars.len(), "bars loaded");
    Ok(bars)
}

/// Load `<dir>/<asset>.csv` for every asset and align them.
pub fn load_universe(dir: &Path, assets: &[String]) -> Result<LoadedData, LoadError> {
    let mut all_bars = HashMap::new();
    for asset in assets {
        let path = dir.join(format!("{asset}.csv"));
        all_bars.insert(asset.clone(), load_csv_bars(&path)?);
    }
    Ok(loaded(PriceTable::align(all_bars), false))
}

/// Synthetic minute bars for every asset, starting at `start`.
pub fn synthetic_universe(assets: &[String], start: NaiveDateTime, minutes: usize) -> LoadedData {
    tracing::warn!("generating synthetic data; results are tagged as synthetic");
    let all_bars = assets
        .iter()
        .map(|a| (a.clone(), synthetic_bars(a, start, minutes)))
        .collect();
    loaded(PriceTable::align(all_bars), true)
}

fn loaded(prices: PriceTable, has_synthetic: bool) -> LoadedData {
    for (asset, voids) in prices.void_counts() {
        if voids > 0 {
            tracing::debug!(asset = %asset, voids, "asset has gaps on the aligned axis");
        }
    }
    LoadedData {
        dataset_hash: compute_dataset_hash(&prices),
        prices,
        has_synthetic,
    }
}

/// Deterministic BLAKE3 hash over all bar data, in sorted asset order.
pub fn compute_dataset_hash(prices: &PriceTable) -> String {
    let mut hasher = blake3::Hasher::new();
    for asset in prices.assets() {
        hasher.update(asset.as_bytes());
        for bar in prices.bars(asset).unwrap_or(&[]) {
            hasher.update(bar.timestamp.to_string().as_bytes());
            hasher.update(&bar.open.to_le_bytes());
            hasher.update(&bar.high.to_le_bytes());
            hasher.update(&bar.low.to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

/// Generate a deterministic random walk of minute bars.
///
/// Seeded from the asset name, so the same asset always yields the same
/// series. Starts at 100.0.
pub fn synthetic_bars(asset: &str, start: NaiveDateTime, minutes: usize) -> Vec<Bar> {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(asset.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut price = 100.0_f64;
    (0..minutes)
        .map(|i| {
            let ret: f64 = rng.gen_range(-0.004..0.004);
            let open = price;
            let close = price * (1.0 + ret);
            let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.002));
            let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.002));
            price = close;
            Bar::new(
                start + chrono::Duration::minutes(i as i64),
                open,
                high,
                low,
                close,
            )
        })
        .collect()
}
